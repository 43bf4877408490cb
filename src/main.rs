use std::env;
use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use checkin_kiosk::{
    parse_report_date, Directory, DirectorySource, KioskConfig, KioskSession, KioskState,
    LogNotifier, MovementService, MovementStore, ReportService,
};

fn main() -> Result<()> {
    let config = KioskConfig::from_env();
    init_tracing(&config.log_level);

    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("kiosk") => run_kiosk(&config),
        Some("record") => run_record(&config, &args[2..]),
        Some("report") => run_report(&config, &args[2..]),
        Some("names") => run_names(&config),
        Some("resolve") => run_resolve(&config, &args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("checkin-kiosk {}", checkin_kiosk::VERSION);
    println!();
    println!("Usage:");
    println!("  checkin-kiosk kiosk                      interactive check-in wizard");
    println!("  checkin-kiosk record <entry> <area> <in|out>");
    println!("  checkin-kiosk report [YYYY-MM-DD] [--json]");
    println!("  checkin-kiosk names                      list directory names");
    println!("  checkin-kiosk resolve <entry>            test a card/name lookup");
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_directory(config: &KioskConfig) -> Result<Directory> {
    Directory::load(DirectorySource::CsvFile {
        path: config.roster_csv_path.clone(),
        name_column: config.name_column.clone(),
        card_columns: config.card_columns.clone(),
    })
}

fn open_movements(config: &KioskConfig) -> Result<MovementService> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }
    let store = MovementStore::open(&config.database_path)?;
    Ok(MovementService::new(store))
}

/// One-shot recording: resolve the entry, then record the movement.
fn run_record(config: &KioskConfig, args: &[String]) -> Result<()> {
    let [entry, area, direction] = args else {
        bail!("usage: checkin-kiosk record <entry> <area> <in|out>");
    };

    let directory = open_directory(config)?;
    let Some(name) = directory.resolve(entry) else {
        bail!("'{entry}' could not be matched to a card or name");
    };

    let movements = open_movements(config)?;
    let event = movements.record_event(&name, area, direction, Some(entry.as_str()))?;

    println!(
        "✓ Recorded: {} {} at {} ({})",
        event.name,
        event.direction.as_str(),
        event.area,
        event.recorded_at.format("%H:%M:%S")
    );
    Ok(())
}

fn run_report(config: &KioskConfig, args: &[String]) -> Result<()> {
    let json = args.iter().any(|a| a == "--json");
    let date_arg = args.iter().find(|a| !a.starts_with("--"));

    // Malformed or missing date falls back to today
    let target_date = parse_report_date(date_arg.map(String::as_str))
        .unwrap_or_else(|| Utc::now().date_naive());

    let movements = open_movements(config)?;
    let reports = ReportService::new(movements, config.areas.clone());

    if json {
        let value = reports.summary_as_json(target_date)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Movements for {}", target_date);
    for summary in reports.summarize(target_date)? {
        println!("\n{} ({} events)", summary.area, summary.events.len());
        for event in &summary.events {
            println!(
                "  {}  {:3}  {}",
                event.recorded_at.format("%H:%M:%S"),
                event.direction.as_str(),
                event.name
            );
        }
    }
    Ok(())
}

fn run_names(config: &KioskConfig) -> Result<()> {
    let directory = open_directory(config)?;
    let names = directory.names();
    for name in &names {
        println!("{name}");
    }
    println!("\n✓ {} names, {} cards", names.len(), directory.cards().len());
    Ok(())
}

fn run_resolve(config: &KioskConfig, args: &[String]) -> Result<()> {
    let [entry] = args else {
        bail!("usage: checkin-kiosk resolve <entry>");
    };

    let directory = open_directory(config)?;
    match directory.resolve(entry) {
        Some(name) => println!("✓ {entry} -> {name}"),
        None => println!("✗ {entry} not found"),
    }
    Ok(())
}

/// Interactive wizard over stdin, mirroring the kiosk screens.
fn run_kiosk(config: &KioskConfig) -> Result<()> {
    if config.areas.is_empty() {
        bail!("no areas configured; set CHECKIN_AREAS");
    }

    let directory = open_directory(config)?;
    let movements = open_movements(config)?;
    let notifier = LogNotifier;
    let mut session = KioskSession::new(config.areas.clone());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Check-in kiosk (blank line to quit)");
    loop {
        match session.state().clone() {
            KioskState::AwaitingArea => {
                println!("\nAreas: {}", session.areas().join(", "));
                let Some(area) = prompt(&mut lines, "area> ")? else {
                    break;
                };
                if let Err(err) = session.select_area(&area) {
                    println!("{err}");
                }
            }
            KioskState::AwaitingEntry { area } => {
                let Some(entry) = prompt(&mut lines, &format!("[{area}] card or name> "))? else {
                    break;
                };
                match session.submit_entry(&entry, &directory) {
                    Ok(KioskState::AwaitingConfirmation { name, .. }) => {
                        println!("Matched: {name}");
                    }
                    Ok(_) => {}
                    Err(err) => println!("{err}"),
                }
            }
            KioskState::AwaitingConfirmation { name, .. } => {
                let Some(direction) = prompt(&mut lines, &format!("{name}: in or out> "))? else {
                    break;
                };
                let event = session.confirm(&direction, &movements, &notifier)?;
                println!(
                    "✓ Signed {}: {} at {}",
                    event.direction.as_str().to_lowercase(),
                    event.name,
                    event.area
                );
            }
        }
    }

    println!("\n✓ Session {} closed", session.token());
    Ok(())
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => {
            let line = line?;
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed))
            }
        }
        None => Ok(None),
    }
}
