// Module declarations
mod audit;
mod cli;
mod client;
mod config;
mod csvscan;
mod fix;
mod pacer;
mod progress;
mod server;
mod types;
mod util;

// Re-export everything at the crate root so modules cross-reference through
// `crate::` without caring which file a helper lives in.
#[allow(unused_imports)]
pub(crate) use audit::*;
#[allow(unused_imports)]
pub(crate) use cli::*;
#[allow(unused_imports)]
pub(crate) use client::*;
#[allow(unused_imports)]
pub(crate) use config::*;
#[allow(unused_imports)]
pub(crate) use csvscan::*;
#[allow(unused_imports)]
pub(crate) use fix::*;
#[allow(unused_imports)]
pub(crate) use pacer::*;
#[allow(unused_imports)]
pub(crate) use progress::*;
#[allow(unused_imports)]
pub(crate) use server::*;
#[allow(unused_imports)]
pub(crate) use types::*;
#[allow(unused_imports)]
pub(crate) use util::*;

use clap::Parser;

fn load_config() -> ApiConfig {
    match ApiConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    }
}

fn connect() -> BankClient {
    BankClient::new(load_config())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Missing { property, json } => {
            let mut client = connect();
            let rows = client.query_all(None)?;
            print_missing(&report_missing(&rows, &property), json)
        }

        Command::Find { property, contains, json } => {
            let mut client = connect();
            let filter = Filter::Contains {
                property: property.clone(),
                value: contains.clone(),
            };
            let rows = client.query_all(Some(&filter))?;
            if json {
                let refs: Vec<RowRef> = rows.iter().map(RowRef::of).collect();
                println!("{}", serde_json::to_string_pretty(&refs)?);
            } else {
                for row in &rows {
                    match row.title() {
                        Some(title) => println!("{}  {}", row.id, title),
                        None => println!("{}", row.id),
                    }
                }
                println!(
                    "{} row(s) where '{}' contains '{}'",
                    rows.len(),
                    property,
                    contains
                );
            }
            Ok(())
        }

        Command::Dupes { property, json } => {
            let mut client = connect();
            let rows = client.query_all(None)?;
            print_dupes(&report_dupes(&rows, &property), json)
        }

        Command::Latex { properties, json } => {
            let mut client = connect();
            let properties = if properties.is_empty() {
                ["Statement", "Answer", "Solution"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                properties
            };
            let rows = client.query_all(None)?;
            print_latex(&report_latex(&rows, &properties), json)
        }

        Command::Json { property, json } => {
            let mut client = connect();
            let rows = client.query_all(None)?;
            print_json_report(&report_json(&rows, &property), json)
        }

        Command::Show { id, json } => {
            let mut client = connect();
            let rows = client.query_all(None)?;
            match rows.iter().find(|row| row.id == id) {
                Some(row) => print_row(row, json),
                None => {
                    eprintln!("no row with id {id}");
                    std::process::exit(1);
                }
            }
        }

        Command::Fill { property, value, progress_file, resume, dry_run } => {
            let mut client = connect();
            let mut tracker = ProgressTracker::new(&progress_file);
            let outcome = run_fill(&mut client, &mut tracker, &property, &value, resume, dry_run)?;
            println!(
                "{} patched, {} skipped, {} failed",
                outcome.patched, outcome.skipped, outcome.failed
            );
            Ok(())
        }

        Command::Retag { property, from, to, progress_file, resume, dry_run } => {
            let mut client = connect();
            let mut tracker = ProgressTracker::new(&progress_file);
            let outcome =
                run_retag(&mut client, &mut tracker, &property, &from, &to, resume, dry_run)?;
            println!(
                "{} patched, {} skipped, {} failed",
                outcome.patched, outcome.skipped, outcome.failed
            );
            Ok(())
        }

        Command::Archive { id, where_empty, dry_run } => {
            let mut client = connect();
            match (id, where_empty) {
                (Some(id), None) => archive_one(&mut client, &id, dry_run),
                (None, Some(property)) => {
                    let (archived, failed) = archive_where_empty(&mut client, &property, dry_run)?;
                    println!("{archived} archived, {failed} failed");
                    Ok(())
                }
                _ => {
                    eprintln!("pass exactly one of --id or --where-empty");
                    std::process::exit(2);
                }
            }
        }

        Command::Status { progress_file, json } => {
            let mut tracker = ProgressTracker::new(&progress_file);
            match tracker.load() {
                LoadOutcome::Loaded => {}
                LoadOutcome::NoPriorState => {
                    eprintln!("no checkpoint at {}", progress_file.display());
                    std::process::exit(1);
                }
                LoadOutcome::Failed => std::process::exit(1),
            }
            let status = tracker.status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!(
                    "{} / {} processed ({}%), {} remaining",
                    status.processed, status.total, status.percentage, status.remaining
                );
                if let Some(id) = &status.last_processed_id {
                    println!("last id: {id}");
                }
                if let Some(index) = status.last_processed_index {
                    println!("last index: {index}");
                }
                if let Some(stamp) = &status.timestamp {
                    println!("updated: {stamp}");
                }
                if status.error_count > 0 {
                    println!("{} recorded error(s)", status.error_count);
                }
            }
            Ok(())
        }

        Command::FindCsv { root, name, json } => {
            if !root.exists() {
                eprintln!("Root does not exist: {}", root.display());
                std::process::exit(2);
            }
            let report = scan_csv_files(&root, name.as_deref())?;
            print_csv_report(&report, json)
        }

        Command::Serve { root, bind, port } => {
            if !root.is_dir() {
                eprintln!("Root is not a directory: {}", root.display());
                std::process::exit(2);
            }
            let config = load_config();
            run_server(&config, &root, &bind, port)
        }
    }
}
