//! Urja-Guard daemon entry point
//!
//! Subcommands map onto the two scheduling domains plus a diagnostic probe:
//!
//! ```bash
//! urja-guard acquire                 # one acquisition cycle (systemd timer)
//! urja-guard monitor                 # resident shutdown monitor
//! urja-guard status                  # pretty-print the published record
//! urja-guard -c /etc/urja-guard.toml monitor
//! ```

use clap::{Parser, Subcommand};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use urja_guard::acquisition::AcquisitionCycle;
use urja_guard::config::AppConfig;
use urja_guard::error::Result;
use urja_guard::monitor::{epoch_secs, MonitorLoop, SystemShutdown, WallNotifier};
use urja_guard::status::StatusRecord;

#[derive(Parser)]
#[command(name = "urja-guard", version, about = "Battery protection daemon")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "/etc/urja-guard.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one acquisition cycle and exit
    Acquire,
    /// Run the resident shutdown monitor
    Monitor,
    /// Print the currently published status record
    Status,
    /// Write the default configuration to stdout
    DefaultConfig,
}

fn load_config(path: &str) -> AppConfig {
    match AppConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            // Missing config is normal on first install; anything else is
            // worth a warning before falling back.
            if !std::path::Path::new(path).exists() {
                log::info!("No config at {}, using defaults", path);
            } else {
                log::warn!("Failed to load {}: {}, using defaults", path, e);
            }
            AppConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Peek at the config for the log level before full initialization
    let config = {
        let preliminary = AppConfig::from_file(&cli.config).unwrap_or_default();
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(preliminary.logging.level.clone()),
        )
        .init();
        load_config(&cli.config)
    };

    match cli.command {
        Command::Acquire => {
            log::info!("Urja-Guard acquisition cycle starting");
            let mut cycle = AcquisitionCycle::from_config(&config)?;
            cycle.run_once(epoch_secs())?;
            Ok(())
        }
        Command::Monitor => {
            log::info!("Urja-Guard monitor starting");
            // Raised to true by SIGINT/SIGTERM; an active countdown still
            // runs to completion.
            let stop = Arc::new(AtomicBool::new(false));
            for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
                signal_hook::flag::register(signal, Arc::clone(&stop))?;
            }

            let mut monitor = MonitorLoop::new(
                config.monitor,
                config.thresholds,
                config.paths.status.clone(),
                WallNotifier,
                SystemShutdown,
            );
            monitor.run(stop);
            Ok(())
        }
        Command::Status => {
            let record = StatusRecord::load(&config.paths.status)?;
            let battery = &record.battery;
            println!(
                "Battery: {:.1}% ({:.3}V, raw {:.1}%)",
                battery.percent_user, battery.voltage, battery.percent_raw
            );
            match battery.charging {
                Some(true) => println!("Charging: yes"),
                Some(false) => println!("Charging: no"),
                None => println!("Charging: unknown"),
            }
            if let Some(error) = &battery.error {
                println!("Error: {}", error);
            }
            if let Some(validation) = &battery.validation {
                if validation.bad {
                    println!("Validation: BAD ({})", validation.reasons.join("; "));
                }
            }
            if let Some(reset) = &battery.reset_info {
                println!(
                    "Recovery: attempted={} performed={} ({})",
                    reset.attempted, reset.performed, reset.reason
                );
            }
            println!("Age: {}s", record.age(epoch_secs()));
            Ok(())
        }
        Command::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&AppConfig::default())?);
            Ok(())
        }
    }
}
