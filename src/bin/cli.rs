//! Dutching CLI - live place odds and dutching stakes from the terminal

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use dutching::core::dutching::{compute_allocation, round_currency, DutchingResult};
use dutching::error::{
    validate_race_no, validate_refresh_interval, validate_stake, validate_timeout,
};
use dutching::refresh::DEFAULT_REFRESH_SECS;
use dutching::{
    FetcherConfig, HorseNo, OddsFetcher, OddsSnapshot, PlaceOdds, RaceNo, RefreshOutcome,
    RefreshSession, Selection,
};

const DEFAULT_STAKE: f64 = 100.0;
const CURRENCY: &str = "HKD";

#[derive(Parser)]
#[command(name = "dutching")]
#[command(author, version, about = "Place odds & dutching calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Odds endpoint (overrides ODDS_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides ODDS_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current place odds for a race
    Odds {
        /// Race number (1-12)
        #[arg(short, long)]
        race: RaceNo,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fetch odds once and dutch a stake across selected horses
    Dutch {
        /// Race number (1-12)
        #[arg(short, long)]
        race: RaceNo,

        /// Total stake
        #[arg(short, long, default_value_t = DEFAULT_STAKE)]
        stake: f64,

        /// Horses to back, e.g. 1,4,7
        #[arg(long, value_delimiter = ',', required = true)]
        horses: Vec<HorseNo>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Keep refreshing odds and the allocation
    Watch {
        /// Race number (1-12)
        #[arg(short, long)]
        race: RaceNo,

        /// Total stake
        #[arg(short, long, default_value_t = DEFAULT_STAKE)]
        stake: f64,

        /// Horses to back, e.g. 1,4,7 (odds only if omitted)
        #[arg(long, value_delimiter = ',')]
        horses: Vec<HorseNo>,

        /// Refresh interval in seconds
        #[arg(long, default_value_t = DEFAULT_REFRESH_SECS)]
        interval: u64,

        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<usize>,
    },

    /// Dutch a stake across odds given on the command line (no network)
    Calc {
        /// Odds as horse=odds pairs, e.g. 1=2.0,2=4.0
        #[arg(long, value_delimiter = ',', value_parser = parse_odds_pair, required = true)]
        odds: Vec<(HorseNo, f64)>,

        /// Total stake
        #[arg(short, long, default_value_t = DEFAULT_STAKE)]
        stake: f64,

        /// Horses to back (all given horses if omitted)
        #[arg(long, value_delimiter = ',')]
        horses: Vec<HorseNo>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let mut config = FetcherConfig::from_env();
    if let Some(url) = cli.api_url.clone() {
        config.base_url = url;
    }
    if let Some(secs) = cli.timeout {
        validate_timeout(secs)?;
        config.timeout_secs = secs;
    }

    if cli.interactive {
        run_interactive(config)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Odds { race, json } => show_odds(config, race, json)?,
            Commands::Dutch {
                race,
                stake,
                horses,
                json,
            } => run_dutch(config, race, stake, horses, json)?,
            Commands::Watch {
                race,
                stake,
                horses,
                interval,
                ticks,
            } => run_watch(config, race, stake, horses, interval, ticks)?,
            Commands::Calc {
                odds,
                stake,
                horses,
                json,
            } => run_calc(odds, stake, horses, json)?,
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

/// Parse "7=3.4" into (7, 3.4)
fn parse_odds_pair(s: &str) -> Result<(HorseNo, f64), String> {
    let (horse, odds) = s
        .split_once('=')
        .ok_or_else(|| format!("expected HORSE=ODDS, got '{}'", s))?;
    let horse: HorseNo = horse
        .trim()
        .parse()
        .map_err(|_| format!("invalid horse number '{}'", horse))?;
    let odds: f64 = odds
        .trim()
        .parse()
        .map_err(|_| format!("invalid odds '{}'", odds))?;
    Ok((horse, odds))
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn show_odds(config: FetcherConfig, race: RaceNo, json: bool) -> Result<()> {
    validate_race_no(race)?;

    let rt = build_runtime()?;
    let fetcher = OddsFetcher::new(config)?;

    let pb = spinner(format!("Fetching place odds for race {}...", race));
    let result = rt.block_on(fetcher.fetch_snapshot(race));
    pb.finish_and_clear();

    let snapshot = match result {
        Ok(s) => s,
        Err(e) => {
            print_fetch_error(&e);
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if snapshot.odds.is_empty() {
        print_no_odds();
    } else {
        print_odds_table(&snapshot);
    }

    Ok(())
}

fn run_dutch(
    config: FetcherConfig,
    race: RaceNo,
    stake: f64,
    horses: Vec<HorseNo>,
    json: bool,
) -> Result<()> {
    validate_race_no(race)?;
    validate_stake(stake)?;

    let rt = build_runtime()?;
    let mut session =
        RefreshSession::new(OddsFetcher::new(config)?, race).with_selection(Selection::new(horses));

    let pb = spinner(format!("Fetching place odds for race {}...", race));
    let outcome = rt.block_on(session.refresh());
    pb.finish_and_clear();

    if json {
        let allocation = session.allocate(stake).transpose()?;
        let profit = allocation
            .as_ref()
            .map(|a| a.expected_profit())
            .transpose()?;
        let output = serde_json::json!({
            "race_no": race,
            "status": outcome_label(&outcome),
            "odds": session.snapshot(),
            "dropped": dropped_horses(&outcome),
            "allocation": allocation,
            "expected_profit": profit,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    render_session(&session, &outcome, stake)
}

fn run_watch(
    config: FetcherConfig,
    race: RaceNo,
    stake: f64,
    horses: Vec<HorseNo>,
    interval: u64,
    ticks: Option<usize>,
) -> Result<()> {
    validate_race_no(race)?;
    validate_stake(stake)?;
    validate_refresh_interval(interval)?;

    let rt = build_runtime()?;
    let mut session =
        RefreshSession::new(OddsFetcher::new(config)?, race).with_selection(Selection::new(horses));

    println!(
        "{} race {} every {}s (Ctrl-C to stop)",
        "Watching".green(),
        race,
        interval
    );

    let mut count = 0usize;
    let mut render_error = None;

    rt.block_on(session.run(Duration::from_secs(interval), |s, outcome| {
        count += 1;
        println!();
        println!("{}", format!("Refresh #{}", count).dimmed());
        if let Err(e) = render_session(s, outcome, stake) {
            render_error = Some(e);
            return ControlFlow::Break(());
        }
        match ticks {
            Some(max) if count >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }))?;

    match render_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run_calc(odds: Vec<(HorseNo, f64)>, stake: f64, horses: Vec<HorseNo>, json: bool) -> Result<()> {
    validate_stake(stake)?;

    let given = odds.len();
    let odds = PlaceOdds::from_pairs(odds);
    if odds.len() < given {
        println!(
            "{}",
            "Some odds were ignored (non-positive, invalid or repeated horse).".yellow()
        );
    }

    let selection = if horses.is_empty() {
        odds.horses().collect()
    } else {
        Selection::new(horses)
    };

    let result = compute_allocation(&selection, &odds, stake)?;

    if json {
        let output = serde_json::json!({
            "allocation": result,
            "expected_profit": result.expected_profit()?,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_allocation(&result)?;
    }

    Ok(())
}

fn run_interactive(config: FetcherConfig) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();
    let rt = build_runtime()?;

    let race: RaceNo = prompt_race(&theme, 1)?;
    let mut stake: f64 = prompt_stake(&theme, DEFAULT_STAKE)?;
    let mut session = RefreshSession::new(OddsFetcher::new(config)?, race);

    let mut outcome = fetch_with_spinner(&rt, &mut session);

    loop {
        println!();
        render_session(&session, &outcome, stake)?;
        outcome.clear_dropped();
        println!();

        let options = [
            "Refresh odds",
            "Select horses",
            "Change stake",
            "Change race",
            "Quit",
        ];
        let choice = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match choice {
            0 => outcome = fetch_with_spinner(&rt, &mut session),
            1 => {
                let Some(snapshot) = session.snapshot() else {
                    println!("{}", "No odds loaded; refresh first.".yellow());
                    continue;
                };
                let rows: Vec<(HorseNo, f64)> = snapshot.odds.iter().collect();
                let labels: Vec<String> = rows
                    .iter()
                    .map(|(h, o)| format!("#{:<3} @ {:.2}", h, o))
                    .collect();
                let defaults: Vec<bool> = rows
                    .iter()
                    .map(|(h, _)| session.selection().contains(*h))
                    .collect();

                let picked = MultiSelect::with_theme(&theme)
                    .with_prompt("Select horses to bet on (space to toggle)")
                    .items(&labels)
                    .defaults(&defaults)
                    .interact()?;

                let selection: Selection = picked.into_iter().map(|i| rows[i].0).collect();
                session.set_selection(selection);
            }
            2 => stake = prompt_stake(&theme, stake)?,
            3 => {
                let race = prompt_race(&theme, session.race_no())?;
                session.set_race(race);
                outcome = fetch_with_spinner(&rt, &mut session);
            }
            _ => {
                println!("Goodbye!");
                break;
            }
        }
    }

    Ok(())
}

fn prompt_race(theme: &ColorfulTheme, default: RaceNo) -> Result<RaceNo> {
    let race = Input::with_theme(theme)
        .with_prompt("Race number (1-12)")
        .default(default)
        .validate_with(|r: &RaceNo| validate_race_no(*r).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(race)
}

fn prompt_stake(theme: &ColorfulTheme, default: f64) -> Result<f64> {
    let stake = Input::with_theme(theme)
        .with_prompt(format!("Total stake ({})", CURRENCY))
        .default(default)
        .validate_with(|s: &f64| validate_stake(*s).map_err(|e| e.to_string()))
        .interact_text()?;
    Ok(stake)
}

fn fetch_with_spinner(rt: &tokio::runtime::Runtime, session: &mut RefreshSession) -> RefreshOutcome {
    let pb = spinner(format!("Fetching place odds for race {}...", session.race_no()));
    let outcome = rt.block_on(session.refresh());
    pb.finish_and_clear();
    outcome
}

/// Print whatever the last refresh left in the session
fn render_session(session: &RefreshSession, outcome: &RefreshOutcome, stake: f64) -> Result<()> {
    match outcome {
        RefreshOutcome::Failed(e) => {
            print_fetch_error(e);
            return Ok(());
        }
        RefreshOutcome::Empty => {
            print_no_odds();
            return Ok(());
        }
        RefreshOutcome::Updated { dropped } => {
            if !dropped.is_empty() {
                println!(
                    "{} no longer priced, removed from selection: {}",
                    "Note:".yellow(),
                    format_horses(dropped)
                );
            }
        }
    }

    if let Some(snapshot) = session.snapshot() {
        print_odds_table(snapshot);
    }

    match session.allocate(stake) {
        Some(result) => print_allocation(&result?)?,
        None => println!("{}", "No horses selected.".dimmed()),
    }

    Ok(())
}

fn print_fetch_error(err: &dutching::FetchError) {
    println!("{}: {}", "Error fetching odds".red(), err);
    print_no_odds();
}

fn print_no_odds() {
    println!("{}", "No Place odds available.".yellow());
}

fn print_odds_table(snapshot: &OddsSnapshot) {
    println!(
        "{} (updated {})",
        format!("Race {} - Place Odds", snapshot.race_no).yellow().bold(),
        snapshot.fetched_at.format("%H:%M:%S UTC")
    );
    println!("{:>8} {:>10}", "Horse No", "Place Odd");
    println!("{}", "-".repeat(20));
    for (horse_no, odds) in snapshot.odds.iter() {
        println!("{:>8} {:>10.2}", horse_no, odds);
    }
    println!();
}

fn print_allocation(result: &DutchingResult) -> Result<()> {
    println!("{}", "Dutching Allocation".yellow().bold());
    println!(
        "{:>6} {:>8} {:>16} {:>22}",
        "Horse",
        "Odds",
        format!("Bet Amount ({})", CURRENCY),
        format!("Potential Return ({})", CURRENCY)
    );
    println!("{}", "-".repeat(55));

    for alloc in &result.allocations {
        println!(
            "{:>6} {:>8.2} {:>16.2} {:>22.2}",
            alloc.horse_no,
            alloc.odds,
            round_currency(alloc.stake),
            round_currency(alloc.potential_return)
        );
    }
    println!();

    let profit = round_currency(result.expected_profit()?);
    let profit_str = format!("{:.2} {}", profit, CURRENCY);
    let profit_colored = if profit >= 0.0 {
        profit_str.green().bold()
    } else {
        profit_str.red().bold()
    };

    println!(
        "Expected Profit (same for all selected horses): {}",
        profit_colored
    );
    println!(
        "Book: {:.1}%  ROI: {:.1}%",
        result.book_percentage(),
        result.roi()? * 100.0
    );

    Ok(())
}

fn outcome_label(outcome: &RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::Updated { .. } => "ok".to_string(),
        RefreshOutcome::Empty => "empty".to_string(),
        RefreshOutcome::Failed(e) => format!("error: {}", e),
    }
}

fn dropped_horses(outcome: &RefreshOutcome) -> Vec<HorseNo> {
    match outcome {
        RefreshOutcome::Updated { dropped } => dropped.clone(),
        _ => Vec::new(),
    }
}

fn format_horses(horses: &[HorseNo]) -> String {
    horses
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_odds_pair() {
        assert_eq!(parse_odds_pair("1=2.0"), Ok((1, 2.0)));
        assert_eq!(parse_odds_pair(" 12 = 3.45 "), Ok((12, 3.45)));
        assert!(parse_odds_pair("1:2.0").is_err());
        assert!(parse_odds_pair("x=2.0").is_err());
        assert!(parse_odds_pair("1=abc").is_err());
    }

    #[test]
    fn test_format_horses() {
        assert_eq!(format_horses(&[1, 4, 7]), "1, 4, 7");
        assert_eq!(format_horses(&[]), "");
    }

    #[test]
    fn test_cli_parses_dutch_command() {
        let cli = Cli::try_parse_from([
            "dutching", "dutch", "--race", "3", "--stake", "250", "--horses", "1,4,7",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Dutch {
                race,
                stake,
                horses,
                json,
            }) => {
                assert_eq!(race, 3);
                assert_eq!(stake, 250.0);
                assert_eq!(horses, vec![1, 4, 7]);
                assert!(!json);
            }
            _ => panic!("expected dutch command"),
        }
    }

    #[test]
    fn test_cli_parses_calc_odds() {
        let cli = Cli::try_parse_from(["dutching", "calc", "--odds", "1=2.0,2=4.0"]).unwrap();

        match cli.command {
            Some(Commands::Calc { odds, stake, .. }) => {
                assert_eq!(odds, vec![(1, 2.0), (2, 4.0)]);
                assert_eq!(stake, DEFAULT_STAKE);
            }
            _ => panic!("expected calc command"),
        }
    }

    #[test]
    fn test_run_calc_rejects_unknown_horse() {
        let err = run_calc(vec![(1, 2.0)], 100.0, vec![2], false).unwrap_err();
        assert!(err.to_string().contains("horse 2"));
    }
}
