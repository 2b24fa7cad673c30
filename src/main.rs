use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;

use vigil::db::NewDetection;
use vigil::{logging, Config, Dashboard, Database, IntelError};

#[derive(Debug, PartialEq)]
enum Command {
    Intelligence,
    Weekly,
    Donut,
    Latest,
    LabelImages(String),
    Voice,
    Record {
        label: String,
        file_name: String,
        captured: Option<DateTime<Utc>>,
        result: String,
    },
}

#[derive(Debug)]
struct Cli {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config_path = None;
    let mut positional: Vec<String> = Vec::new();
    let mut captured = None;
    let mut result = String::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("vigil {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--config requires a path argument");
                };
                config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--captured" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--captured requires an RFC 3339 timestamp");
                };
                let ts = DateTime::parse_from_rfc3339(value)
                    .with_context(|| format!("Invalid --captured timestamp: {}", value))?;
                captured = Some(ts.with_timezone(&Utc));
                i += 1;
            }
            "--result" => {
                let Some(value) = args.get(i + 1) else {
                    bail!("--result requires a value");
                };
                result = value.clone();
                i += 1;
            }
            arg if arg.starts_with('-') => bail!("Unknown argument: {}", arg),
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [cmd] if cmd == "intelligence" => Command::Intelligence,
        [cmd] if cmd == "weekly" => Command::Weekly,
        [cmd] if cmd == "donut" => Command::Donut,
        [cmd] if cmd == "latest" => Command::Latest,
        [cmd] if cmd == "voice" => Command::Voice,
        [cmd, label] if cmd == "label-images" => Command::LabelImages(label.clone()),
        [cmd, label, file_name] if cmd == "record" => Command::Record {
            label: label.clone(),
            file_name: file_name.clone(),
            captured,
            result,
        },
        [] => bail!("No command given, see --help"),
        other => bail!("Unknown command: {}", other.join(" ")),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

fn print_help() {
    println!(
        r#"vigil - activity intelligence for camera detections

USAGE:
    vigil [OPTIONS] <COMMAND>

COMMANDS:
    intelligence                Today's hourly activity and label breakdown
    weekly                      Hourly activity for the seven days before today
    donut                       Today's labels, most frequent first
    latest                      Newest object-detection capture as a data URI
    label-images <LABEL>        Every capture of one label, oldest first
    voice                       Spoken summary of unannounced detections
    record <LABEL> <FILE_NAME>  Store a detection
        --captured TIME         Capture time, RFC 3339 (default: now)
        --result TEXT           Detection result, e.g. a plate number

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    VIGIL_CONFIG        Path to config file (overrides default location)
    VIGIL_LOG           Log level (trace, debug, info, warn, error)
    DATE_TIME_FORMAT    strftime format for capture titles

Config file location: $XDG_CONFIG_HOME/vigil/config.toml

See also: vigil-daemon --help"#
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(dashboard: &Dashboard, command: Command) -> Result<()> {
    match command {
        Command::Intelligence => print_json(&dashboard.daily_intelligence()?),
        Command::Weekly => print_json(&dashboard.weekly_activity()?),
        Command::Donut => print_json(&dashboard.label_donut()?),
        Command::Latest => print_json(&dashboard.latest_image().await?),
        Command::LabelImages(label) => print_json(&dashboard.label_images(&label).await?),
        Command::Voice => print_json(&dashboard.voice_intelligence()?),
        Command::Record {
            label,
            file_name,
            captured,
            result,
        } => {
            let detection = NewDetection {
                label,
                file_name,
                capture_time: captured.unwrap_or_else(Utc::now),
                detection_result: result,
            };
            let id = dashboard.record_detection(&detection)?;
            print_json(&serde_json::json!({ "id": id }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let _ = logging::init(None);

    let config = match cli.config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    db.initialize()?;

    let dashboard = Dashboard::new(config, db)?;
    if let Err(e) = run(&dashboard, cli.command).await {
        let status = e.downcast_ref::<IntelError>().map_or(500, IntelError::status_code);
        error!(status, "{:#}", e);
        eprintln!("Error ({}): {:#}", status, e);
        std::process::exit(1);
    }

    Ok(())
}
