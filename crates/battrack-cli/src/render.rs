//! Plain-text rendering of API responses for the terminal.

use std::fmt::Write as _;

use battrack_core::{
  event::{EventPayload, LifecycleEvent},
  record::{BatteryRecord, BatterySummary, ScanResolution, WarrantyReport},
  stage::NextAction,
  warranty::WarrantyInfo,
};

const DATE_FMT: &str = "%Y-%m-%d %H:%M";

/// The subcommand an operator should run next for a scanned code.
pub fn next_command(action: NextAction) -> &'static str {
  match action {
    NextAction::RegisterFactory => "factory",
    NextAction::RegisterStoreEntry => "store",
    NextAction::RegisterSale => "sale",
    NextAction::CheckWarranty => "warranty",
  }
}

/// One line per scan, suited to a stream of scanner input.
pub fn scan(res: &ScanResolution) -> String {
  format!(
    "{}  stage={}  next={}  (battrack {} {})",
    res.code,
    res.stage,
    res.next_action,
    next_command(res.next_action),
    res.code,
  )
}

pub fn summaries(list: &[BatterySummary]) -> String {
  if list.is_empty() {
    return "no batteries recorded\n".to_string();
  }
  let width = list.iter().map(|s| s.code.as_str().len()).max().unwrap_or(0);
  let mut out = String::new();
  for s in list {
    let _ = writeln!(out, "{:<width$}  {}", s.code.as_str(), s.stage);
  }
  out
}

pub fn record(rec: &BatteryRecord) -> String {
  let mut out = format!("{}  stage={}\n", rec.code, rec.stage);
  if let Some(w) = &rec.warranty {
    out.push_str(&warranty_status(w));
  }
  out.push_str(&history(&rec.events));
  out
}

pub fn warranty(report: &WarrantyReport) -> String {
  let mut out = format!("{}\n", report.code);
  out.push_str(&warranty_status(&report.warranty));
  let fields = [
    ("model", &report.model),
    ("store", &report.store_id),
    ("customer", &report.customer_name),
  ];
  for (label, value) in fields {
    if let Some(v) = value {
      let _ = writeln!(out, "  {label:<9} {v}");
    }
  }
  out.push_str(&history(&report.history));
  out
}

fn warranty_status(w: &WarrantyInfo) -> String {
  let state = if w.is_valid { "VALID" } else { "EXPIRED" };
  let mut out = format!(
    "  warranty  {state}, {} months from {}, expires {}\n",
    w.warranty_period_months,
    w.sale_date.format("%Y-%m-%d"),
    w.expiry_date.format("%Y-%m-%d"),
  );
  if w.is_valid {
    let _ = writeln!(out, "  remaining {} days", w.remaining_days);
  }
  out
}

fn history(events: &[LifecycleEvent]) -> String {
  let mut out = String::from("  history\n");
  if events.is_empty() {
    out.push_str("    (none)\n");
  }
  for e in events {
    let _ = writeln!(
      out,
      "    {}  {:<17} {} @ {}{}",
      e.timestamp.format(DATE_FMT),
      e.kind().as_str(),
      e.actor,
      e.location,
      detail(&e.payload),
    );
  }
  out
}

fn detail(payload: &EventPayload) -> String {
  match payload {
    EventPayload::Manufactured(m) => format!("  model={}", m.model),
    EventPayload::ReceivedAtStore(r) => {
      format!("  store={} condition={}", r.store_id, r.condition)
    }
    EventPayload::Sold(s) => format!("  customer={}", s.customer.name),
  }
}
