//! Vigil daemon for spoken activity summaries.
//!
//! Polls the detection store and, whenever new detections have arrived,
//! prints one summary line to stdout for a text-to-speech front end to read.
//! Each detection is announced once.
//!
//! ## Usage
//!
//! ```bash
//! vigil-daemon              # Run in foreground
//! vigil-daemon --once       # Announce pending detections once and exit
//! ```

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime, Timelike};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use vigil::config::VoiceConfig;
use vigil::{logging, Config, Dashboard, Database};

struct DaemonOptions {
    /// Poll interval override (seconds)
    poll_interval: Option<u64>,
    /// Run once and exit
    once: bool,
    /// Config path override
    config_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let options = parse_args();

    logging::init_daemon();
    info!("Vigil daemon starting...");

    let config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let poll_interval = options
        .poll_interval
        .unwrap_or(config.voice.poll_interval_secs)
        .max(1);

    let db = Database::open(&config.db_path).context("Failed to open database")?;
    db.initialize()?;
    info!("Database opened at {:?}", config.db_path);

    let dashboard = Dashboard::new(config, db)?;

    if options.once {
        info!("Running in single-shot mode");
        announce(&dashboard)?;
    } else {
        info!("Running in daemon mode, polling every {} seconds", poll_interval);
        run_daemon_loop(&dashboard, poll_interval);
    }

    info!("Vigil daemon stopped");
    Ok(())
}

fn parse_args() -> DaemonOptions {
    let args: Vec<String> = std::env::args().collect();
    let mut options = DaemonOptions {
        poll_interval: None,
        once: false,
        config_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" | "-1" => {
                options.once = true;
            }
            "--interval" | "-i" => {
                if i + 1 < args.len() {
                    if let Ok(interval) = args[i + 1].parse() {
                        options.poll_interval = Some(interval);
                    }
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    options
}

fn print_help() {
    println!(
        r#"vigil-daemon - Spoken activity summaries for Vigil

USAGE:
    vigil-daemon [OPTIONS]

OPTIONS:
    --once, -1          Announce pending detections once and exit
    --interval, -i N    Poll interval in seconds (default: voice.poll_interval_secs)
    --config, -c PATH   Path to config file
    --help, -h          Show this help message

ENVIRONMENT:
    VIGIL_CONFIG        Path to config file (overrides default location)
    RUST_LOG            Log level (trace, debug, info, warn, error)

Summaries are only produced between voice.hours_start and voice.hours_end
(local time) when both are set. Overnight ranges such as 22-6 are allowed.
"#
    );
}

fn run_daemon_loop(dashboard: &Dashboard, poll_interval: u64) {
    loop {
        if within_hours(&dashboard.config().voice, Local::now().time()) {
            if let Err(e) = announce(dashboard) {
                error!("Error producing summary: {}", e);
            }
        } else {
            info!("Outside announcement hours, skipping this cycle");
        }

        thread::sleep(Duration::from_secs(poll_interval));
    }
}

fn announce(dashboard: &Dashboard) -> Result<()> {
    let voice = dashboard.voice_intelligence()?;
    if voice.message.is_empty() {
        info!("Nothing new to announce");
    } else {
        info!(message = %voice.message, "Announcing");
        println!("{}", voice.message);
    }
    Ok(())
}

fn within_hours(voice: &VoiceConfig, now: NaiveTime) -> bool {
    let (start, end) = match (voice.hours_start, voice.hours_end) {
        (Some(s), Some(e)) => (s as u32, e as u32),
        _ => return true,
    };
    let hour = now.hour();

    if start <= end {
        hour >= start && hour < end
    } else {
        // overnight, e.g. 22-6
        hour >= start || hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(start: Option<u8>, end: Option<u8>) -> VoiceConfig {
        VoiceConfig {
            hours_start: start,
            hours_end: end,
            ..VoiceConfig::default()
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_no_hours_always_announces() {
        assert!(within_hours(&hours(None, None), at(3, 0)));
        assert!(within_hours(&hours(Some(9), None), at(3, 0)));
    }

    #[test]
    fn test_daytime_range() {
        let voice = hours(Some(9), Some(17));
        assert!(within_hours(&voice, at(9, 0)));
        assert!(within_hours(&voice, at(16, 59)));
        assert!(!within_hours(&voice, at(17, 0)));
        assert!(!within_hours(&voice, at(8, 59)));
    }

    #[test]
    fn test_overnight_range() {
        let voice = hours(Some(22), Some(6));
        assert!(within_hours(&voice, at(23, 30)));
        assert!(within_hours(&voice, at(5, 59)));
        assert!(!within_hours(&voice, at(12, 0)));
    }
}
