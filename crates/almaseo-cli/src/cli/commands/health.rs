use std::time::Instant;

use almaseo_refresh::DraftFields;
use anyhow::{Context, Result};

use super::build_guard;
use crate::cli::args::{HealthArgs, SiteArgs};
use crate::exit_codes;

pub async fn run(site: &SiteArgs, args: HealthArgs) -> Result<i32> {
    let draft = match args.draft.as_deref() {
        Some(raw) => match parse_draft(raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                eprintln!("error: {:#}", e);
                return Ok(exit_codes::CONFIG_ERROR);
            }
        },
        None => None,
    };

    let (guard, sink) = match build_guard(site, args.post_id) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::for_error(&e));
        }
    };

    let reason = if draft.is_some() { "field-edit" } else { "manual" };
    guard.request_refresh(reason, draft);
    guard.settled().await;

    if let Some(err) = sink.last_error() {
        eprintln!("error: {}", err);
        return Ok(exit_codes::for_error(&err));
    }
    let Some(snapshot) = guard.snapshot() else {
        anyhow::bail!("refresh settled without a result");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    } else {
        print!("{}", sink.panel.lock().render(Instant::now()));
    }
    Ok(exit_codes::SUCCESS)
}

fn parse_draft(raw: &str) -> Result<DraftFields> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--draft is not valid JSON")?;
    match value {
        serde_json::Value::Object(fields) => Ok(fields),
        other => anyhow::bail!("--draft must be a JSON object, got {}", kind(&other)),
    }
}

fn kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
