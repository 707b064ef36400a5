//! Snapshot decoding.
//!
//! Snapshots written by older builds, or edited by hand, do not always match
//! the current types exactly: points may be fractional, numbers may be null
//! or quoted, whole sections may be missing. Decoding walks the JSON value
//! field by field so one odd value costs that value, not the whole state.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::*;

/// Parse a snapshot. Only malformed JSON, or a document that is not an
/// object, is an error.
///
/// Missing or unusable fields take their defaults, fractional integers are
/// truncated toward zero and a log without a readable date is dropped.
pub fn decode_snapshot(json: &str) -> Result<AppState> {
    let doc: Value = serde_json::from_str(json).context("Failed to parse snapshot")?;
    if !doc.is_object() {
        bail!("Snapshot is not a JSON object");
    }

    let defaults = AppState::default();
    Ok(AppState {
        profile: field(&doc, "profile")
            .map(parse_profile)
            .unwrap_or(defaults.profile),
        logs: field(&doc, "logs").map(parse_logs).unwrap_or_default(),
        settings: field(&doc, "settings")
            .map(parse_settings)
            .unwrap_or(defaults.settings),
        current_day: field(&doc, "currentDay")
            .map(parse_current_day)
            .unwrap_or_default(),
    })
}

/// `None` for missing keys and explicit nulls alike.
fn field<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|n: &f64| n.is_finite())
}

/// Integer value, truncating fractions. Out-of-range values saturate.
fn whole(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| number(v).map(|n| n.trunc() as i64))
}

fn count(v: &Value) -> Option<u32> {
    whole(v).and_then(|n| u32::try_from(n).ok())
}

fn iso_date(v: &Value) -> Option<NaiveDate> {
    // Full timestamps keep their date part
    let s = v.as_str()?;
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_profile(v: &Value) -> Profile {
    let mut profile = Profile::default();
    if let Some(n) = field(v, "age").and_then(count) {
        profile.age = n;
    }
    if let Some(n) = field(v, "height").and_then(count) {
        profile.height = n;
    }
    if let Some(w) = field(v, "baseWeight").and_then(number) {
        profile.base_weight = w;
    }
    if let Some(w) = field(v, "currentWeight").and_then(number) {
        profile.current_weight = w;
    }
    if let Some(w) = field(v, "targetWeight").and_then(number) {
        profile.target_weight = w;
    }
    if let Some(d) = field(v, "startDate").and_then(iso_date) {
        profile.start_date = d;
    }
    if let Some(d) = field(v, "targetDate").and_then(iso_date) {
        profile.target_date = d;
    }
    if let Some(g) = field(v, "gender").and_then(|g| g.as_str()) {
        profile.gender = Gender::from_tag(g);
    }
    profile
}

fn parse_items(v: Option<&Value>) -> Vec<LogItem> {
    let Some(items) = v.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| item.is_object())
        .enumerate()
        .map(|(i, item)| LogItem {
            name: field(item, "name")
                .and_then(|n| n.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("Item {}", i + 1)),
            points: field(item, "points").and_then(whole).unwrap_or(0),
        })
        .collect()
}

fn parse_log(v: &Value) -> Option<(Option<i64>, DailyLog)> {
    let date = field(v, "date").and_then(iso_date)?;
    let items = parse_items(field(v, "items"));
    let total_points = field(v, "totalPoints").and_then(whole).unwrap_or_else(|| {
        items
            .iter()
            .fold(0i64, |sum, i| sum.saturating_add(i.points))
    });

    let log = DailyLog {
        id: 0,
        date,
        weight: field(v, "weight").and_then(number),
        items,
        total_points,
    };
    Some((field(v, "id").and_then(whole), log))
}

fn parse_logs(v: &Value) -> Vec<DailyLog> {
    let Some(entries) = v.as_array() else {
        warn!("Saved logs are not a list, ignoring them");
        return Vec::new();
    };

    let parsed: Vec<_> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let log = parse_log(entry);
            if log.is_none() {
                warn!(index, "Dropping saved log without a readable date");
            }
            log
        })
        .collect();

    // Logs saved without an id get fresh ones above every existing id
    let mut next_id = parsed
        .iter()
        .filter_map(|(id, _)| *id)
        .max()
        .map_or(1, |max| max.saturating_add(1));

    parsed
        .into_iter()
        .map(|(id, log)| {
            let id = id.unwrap_or_else(|| {
                let id = next_id;
                next_id = next_id.saturating_add(1);
                debug!(date = %log.date, id, "Assigned id to saved log");
                id
            });
            DailyLog { id, ..log }
        })
        .collect()
}

fn parse_settings(v: &Value) -> Settings {
    let mut settings = Settings::default();
    if let Some(b) = field(v, "useColorCoding").and_then(|b| b.as_bool()) {
        settings.use_color_coding = b;
    }
    if let Some(n) = field(v, "deficitGreen").and_then(whole) {
        settings.deficit_green = n;
    }
    if let Some(n) = field(v, "deficitYellow").and_then(whole) {
        settings.deficit_yellow = n;
    }
    if let Some(n) = field(v, "deficitOrange").and_then(whole) {
        settings.deficit_orange = n;
    }
    settings
}

fn parse_current_day(v: &Value) -> CurrentDay {
    CurrentDay {
        items: parse_items(field(v, "items")),
        weight: field(v, "weight").and_then(number),
    }
}
