//! `battrack`: command-line client for the battery lifecycle server.
//!
//! Codes can be typed as arguments or piped in from a keyboard-wedge scanner:
//!
//! ```text
//! battrack scan BAT123
//! battrack scan < scanned-codes.txt
//! battrack --actor joana --location "Loja Central" store BAT123 --store-id S01
//! battrack sale BAT123 --customer-name "Carlos Souza" --customer-phone 555-0100 --warranty-months 12
//! battrack warranty BAT123
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use battrack_core::event::{
  Condition, Customer, ManufactureDetails, SaleDetails, StoreReceiptDetails,
};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, Operator};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "battrack", version, about = "Battery lifecycle and warranty client")]
struct Args {
  /// Path to a TOML config file (url, actor, location).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the battrack server (default: http://localhost:8080).
  #[arg(long, env = "BATTRACK_URL")]
  url: Option<String>,

  /// Who is recording events.
  #[arg(long, env = "BATTRACK_ACTOR")]
  actor: Option<String>,

  /// Where events are being recorded.
  #[arg(long, env = "BATTRACK_LOCATION")]
  location: Option<String>,

  /// Print raw JSON responses instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the stage and next step for a code. Reads codes from stdin, one
  /// per line, when CODE is omitted.
  Scan { code: Option<String> },

  /// Register a battery leaving the production line.
  Factory {
    code:     String,
    #[arg(long)]
    model:    String,
    #[arg(long)]
    batch:    Option<String>,
    #[arg(long)]
    comments: Option<String>,
  },

  /// Register a battery received into store inventory.
  Store {
    code:        String,
    #[arg(long)]
    store_id:    String,
    #[arg(long)]
    received_by: Option<String>,
    /// good, damaged or refurbished.
    #[arg(long, default_value = "good")]
    condition:   Condition,
    #[arg(long)]
    comments:    Option<String>,
  },

  /// Register a retail sale and start the warranty window.
  Sale {
    code:              String,
    #[arg(long)]
    customer_name:     String,
    #[arg(long)]
    customer_phone:    String,
    #[arg(long)]
    customer_email:    Option<String>,
    #[arg(long)]
    customer_document: Option<String>,
    #[arg(long)]
    warranty_months:   u32,
    #[arg(long)]
    vehicle_model:     Option<String>,
    #[arg(long)]
    vehicle_plate:     Option<String>,
    /// Sale price in cents.
    #[arg(long)]
    price_cents:       Option<u64>,
    #[arg(long)]
    comments:          Option<String>,
  },

  /// Check the warranty of a sold battery.
  Warranty { code: String },

  /// Show the full history of a battery.
  History { code: String },

  /// List every known battery with its stage.
  List,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  actor:    String,
  #[serde(default)]
  location: String,
}

/// Flag or env value first, then the config file, then `default`.
fn pick(flag: Option<String>, file: &str, default: &str) -> String {
  flag
    .or_else(|| (!file.is_empty()).then(|| file.to_string()))
    .unwrap_or_else(|| default.to_string())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(ApiConfig {
    base_url: pick(args.url, &file_cfg.url, DEFAULT_URL),
  })?;
  let operator = Operator {
    actor:    pick(args.actor, &file_cfg.actor, ""),
    location: pick(args.location, &file_cfg.location, ""),
  };

  run(&client, &operator, args.command, args.json).await
}

async fn run(
  client: &ApiClient,
  operator: &Operator,
  command: Command,
  json: bool,
) -> Result<()> {
  match command {
    Command::Scan { code: Some(code) } => {
      let res = client.scan(&code).await?;
      emit(json, &res, render::scan)
    }
    Command::Scan { code: None } => scan_stdin(client, json).await,

    Command::Factory { code, model, batch, comments } => {
      let details = ManufactureDetails { model, batch, comments };
      let rec = client.register_factory(&code, operator, &details).await?;
      emit(json, &rec, render::record)
    }

    Command::Store { code, store_id, received_by, condition, comments } => {
      let details = StoreReceiptDetails { store_id, received_by, condition, comments };
      let rec = client.register_store_entry(&code, operator, &details).await?;
      emit(json, &rec, render::record)
    }

    Command::Sale {
      code,
      customer_name,
      customer_phone,
      customer_email,
      customer_document,
      warranty_months,
      vehicle_model,
      vehicle_plate,
      price_cents,
      comments,
    } => {
      let details = SaleDetails {
        customer: Customer {
          name:     customer_name,
          phone:    customer_phone,
          email:    customer_email,
          document: customer_document,
        },
        warranty_months,
        vehicle_model,
        vehicle_plate,
        sale_price_cents: price_cents,
        comments,
      };
      let rec = client.register_sale(&code, operator, &details).await?;
      emit(json, &rec, render::record)
    }

    Command::Warranty { code } => {
      let report = client.warranty(&code).await?;
      emit(json, &report, render::warranty)
    }

    Command::History { code } => {
      let rec = client.history(&code).await?;
      emit(json, &rec, render::record)
    }

    Command::List => {
      let list = client.list().await?;
      emit(json, &list, |l: &Vec<_>| render::summaries(l))
    }
  }
}

/// Resolve each scanned line as it arrives. A bad code is reported and the
/// loop keeps reading, since a scanner will keep sending.
async fn scan_stdin(client: &ApiClient, json: bool) -> Result<()> {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await.context("reading stdin")? {
    let code = line.trim();
    if code.is_empty() {
      continue;
    }
    match client.scan(code).await {
      Ok(res) => emit(json, &res, render::scan)?,
      Err(e) => eprintln!("{code}: {e:#}"),
    }
  }
  Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl Fn(&T) -> String) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value).context("serialising output")?);
  } else {
    let out = text(value);
    if out.ends_with('\n') {
      print!("{out}");
    } else {
      println!("{out}");
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flag_beats_file_beats_default() {
    assert_eq!(pick(Some("http://a".into()), "http://b", DEFAULT_URL), "http://a");
    assert_eq!(pick(None, "http://b", DEFAULT_URL), "http://b");
    assert_eq!(pick(None, "", DEFAULT_URL), DEFAULT_URL);
  }

  #[test]
  fn config_file_fields_are_optional() {
    let cfg: ConfigFile = toml::from_str("actor = \"joana\"").unwrap();
    assert_eq!(cfg.actor, "joana");
    assert!(cfg.url.is_empty());
  }

  #[test]
  fn store_condition_parses_from_flag() {
    let args = Args::try_parse_from([
      "battrack", "store", "BAT1", "--store-id", "S01", "--condition", "damaged",
    ])
    .unwrap();
    match args.command {
      Command::Store { condition, store_id, .. } => {
        assert_eq!(condition, Condition::Damaged);
        assert_eq!(store_id, "S01");
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn scan_without_code_reads_stdin() {
    let args = Args::try_parse_from(["battrack", "scan"]).unwrap();
    assert!(matches!(args.command, Command::Scan { code: None }));
  }

  #[test]
  fn sale_requires_warranty_months() {
    let err = Args::try_parse_from([
      "battrack", "sale", "BAT1", "--customer-name", "C", "--customer-phone", "1",
    ])
    .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
  }

  #[test]
  fn unknown_condition_is_rejected() {
    assert!(
      Args::try_parse_from([
        "battrack", "store", "BAT1", "--store-id", "S01", "--condition", "wet",
      ])
      .is_err()
    );
  }
}
