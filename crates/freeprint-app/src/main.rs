// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FreePrint — network printer discovery and driver-aware raw printing.
//
// Entry point.  Initialises logging, opens the data directory and runs one
// subcommand.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use freeprint_core::error::Result;
use freeprint_core::{DriverId, PrinterRecord, SelectedOptions};

use services::app_services::AppServices;
use services::data_dir;

/// FreePrint - find network printers and print to them over port 9100
#[derive(Parser, Debug)]
#[command(name = "freeprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory (defaults to $FREEPRINT_DATA_DIR or the XDG data dir)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe the local subnet and listen for mDNS printer adverts
    Discover {
        /// How long to listen
        #[arg(long, default_value = "15")]
        seconds: u64,

        /// Save every printer found
        #[arg(long)]
        save: bool,
    },
    /// List saved printers
    Printers,
    /// Forget a saved printer
    Forget {
        host: String,
    },
    /// Import a PPD file, or every PPD below a directory
    ImportDriver {
        path: PathBuf,
    },
    /// List imported drivers
    Drivers,
    /// Remove one driver, all drivers, or the drivers no printer uses
    RemoveDriver {
        #[arg(required_unless_present_any = ["all", "unused"], conflicts_with_all = ["all", "unused"])]
        id: Option<DriverId>,

        #[arg(long, conflicts_with = "unused")]
        all: bool,

        #[arg(long)]
        unused: bool,
    },
    /// Use a driver for a saved printer
    AssignDriver {
        host: String,
        driver_id: DriverId,
    },
    /// Show the options a driver offers
    Options {
        driver_id: DriverId,
    },
    /// Queue a file for a saved printer
    Enqueue {
        file: PathBuf,
        host: String,

        /// Option selection, e.g. -o PageSize=A4 -o Copies=2
        #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },
    /// List print jobs
    Jobs,
    /// Drop completed and failed jobs
    ClearHistory,
    /// Run the print queue and printer status monitor until Ctrl-C
    Run,
}

fn parse_option(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty option name in `{s}`"));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = match cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => data_dir::data_dir()?,
    };
    let services = AppServices::init(&dir)?;

    match cli.command {
        Commands::Discover { seconds, save } => {
            println!("Discovering printers for {seconds}s...");
            let found = services
                .discover(Duration::from_secs(seconds), |p| println!("  found {}", describe(p)))
                .await?;
            println!("\n{} printer(s):", found.len());
            for printer in found {
                let printer = if save { services.save_printer(printer) } else { printer };
                println!("  {}", describe(&printer));
            }
            if save {
                println!("Saved.");
            }
        }
        Commands::Printers => {
            for printer in services.printers().iter() {
                let driver = printer
                    .driver_ref
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "no driver".into());
                println!("  {}  [{driver}]", describe(printer));
            }
        }
        Commands::Forget { host } => {
            services.forget_printer(&host)?;
            println!("Forgot {host}");
        }
        Commands::ImportDriver { path } => {
            let count = services.import_drivers(&path)?;
            println!("Imported {count} driver(s)");
        }
        Commands::Drivers => {
            for driver in services.drivers().iter() {
                println!("  {}  {}  ({})", driver.id, driver.display_name, driver.original_file_name);
            }
        }
        Commands::RemoveDriver { id, all, unused } => {
            let removed = match id {
                Some(id) => services.remove_driver(id).map(|()| 1)?,
                None if all => services.remove_all_drivers()?,
                None if unused => services.remove_unused_drivers(),
                None => 0,
            };
            println!("Removed {removed} driver(s)");
        }
        Commands::AssignDriver { host, driver_id } => {
            services.assign_driver(&host, driver_id)?;
            println!("{host} now uses driver {driver_id}");
        }
        Commands::Options { driver_id } => {
            for option in services.driver_options(driver_id)? {
                println!("{} ({}), default {}", option.keyword, option.display_name, option.default_choice);
                for choice in &option.choices {
                    println!("    {}  {}", choice.keyword, choice.display_name);
                }
            }
        }
        Commands::Enqueue { file, host, options } => {
            let selected: SelectedOptions = options.into_iter().collect();
            let id = services.enqueue(&file, &host, selected)?;
            println!("Queued job {id}; run `freeprint run` to print it");
        }
        Commands::Jobs => {
            for job in services.jobs().jobs().iter() {
                println!(
                    "  {}  {:<9}  {}  -> {}  ({})",
                    job.id,
                    format!("{:?}", job.status),
                    job.file_name,
                    job.printer_host_address,
                    job.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }
        Commands::ClearHistory => {
            println!("Cleared {} job(s)", services.clear_history());
        }
        Commands::Run => {
            services
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "could not listen for Ctrl-C");
                    }
                })
                .await;
        }
    }
    Ok(())
}

fn describe(printer: &PrinterRecord) -> String {
    format!(
        "{} @ {}:{} ({:?}){}",
        printer.name,
        printer.host_address,
        printer.port,
        printer.transport,
        if printer.online { " online" } else { "" },
    )
}
