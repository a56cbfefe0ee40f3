//! Dataset acquisition and field-tolerant decoding.
//!
//! The published admission sheets drift in format between cycles: column
//! headers flip between Latin and Cyrillic, numeric cells show up as
//! strings, exam lists arrive as arrays or as one `;`-joined cell. The
//! decoder here absorbs all of that so the rest of the crate only ever
//! sees clean [`ProgramRecord`]s.
//!
//! Acquisition order: remote feed URL (when configured), then the local
//! snapshot path. The first source yielding at least one record wins.
//! Every failure degrades to "no records from this source" with a warn
//! log; this function never errors.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::ProgramRecord;
use crate::config::CorpusConfig;
use crate::normalize;

/// Header/field aliases, canonical name first. Matching is done on the
/// lowercased, trimmed header.
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("university", &["university", "вуз", "университет", "uni"]),
    ("program", &["program", "направление", "программа", "specialty"]),
    ("city", &["city", "город"]),
    ("level", &["level", "уровень", "degree"]),
    ("form", &["form", "форма", "форма обучения"]),
    ("exams", &["exams", "экзамены", "егэ", "subjects"]),
    ("budget", &["budget", "бюджет", "бюджетные места"]),
    ("dorm", &["dorm", "dormitory", "общежитие"]),
    (
        "score_min",
        &["score_min", "min_score", "минимальный балл", "проходной балл", "балл"],
    ),
    ("url", &["url", "ссылка", "link"]),
    ("year", &["year", "год", "год приема", "год приёма"]),
];

fn canonical_field(header: &str) -> Option<&'static str> {
    let h = header.trim().to_lowercase().replace('ё', "е");
    for (canon, aliases) in FIELD_ALIASES {
        if aliases.iter().any(|a| *a == h) {
            return Some(canon);
        }
    }
    None
}

/// Load records from the configured sources. Infallible by contract:
/// total failure yields an empty vec, which the store caches until the
/// TTL expires.
pub async fn load(cfg: &CorpusConfig) -> Vec<ProgramRecord> {
    if let Some(url) = cfg.data_url.as_deref().filter(|u| !u.trim().is_empty()) {
        match fetch_remote(url, cfg.fetch_timeout_secs).await {
            Ok(body) => {
                let records = decode(&body);
                if !records.is_empty() {
                    debug!(count = records.len(), "corpus loaded from feed url");
                    return records;
                }
                warn!(url, "feed url returned no decodable records");
            }
            Err(err) => warn!(url, error = %err, "feed fetch failed"),
        }
    }

    match tokio::fs::read_to_string(&cfg.data_path).await {
        Ok(body) => {
            let records = decode(&body);
            if records.is_empty() {
                warn!(path = %cfg.data_path, "local snapshot yielded no records");
            } else {
                debug!(count = records.len(), path = %cfg.data_path, "corpus loaded from file");
            }
            records
        }
        Err(err) => {
            warn!(path = %cfg.data_path, error = %err, "local snapshot unreadable");
            Vec::new()
        }
    }
}

async fn fetch_remote(url: &str, timeout_secs: u64) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// Decode a raw payload into records, sniffing JSON vs CSV by the first
/// non-whitespace byte.
pub fn decode(body: &str) -> Vec<ProgramRecord> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        decode_json(trimmed)
    } else {
        decode_csv(body)
    }
}

fn decode_json(body: &str) -> Vec<ProgramRecord> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "json payload did not parse");
            return Vec::new();
        }
    };
    let items: Vec<Value> = match value {
        Value::Array(a) => a,
        // Some exports wrap the array in an envelope object.
        Value::Object(mut o) => match o.remove("items").or_else(|| o.remove("data")) {
            Some(Value::Array(a)) => a,
            _ => {
                warn!("json payload is not an array of records");
                return Vec::new();
            }
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| item.as_object().and_then(record_from_json))
        .collect()
}

fn record_from_json(obj: &serde_json::Map<String, Value>) -> Option<ProgramRecord> {
    let mut fields: Vec<(&'static str, &Value)> = Vec::new();
    for (k, v) in obj {
        if let Some(canon) = canonical_field(k) {
            fields.push((canon, v));
        }
    }
    let get = |name: &str| fields.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

    let university = get("university").and_then(value_str)?;
    let program = get("program").and_then(value_str)?;
    if university.trim().is_empty() || program.trim().is_empty() {
        return None;
    }

    let exam_list = match get("exams") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(normalize::normalize_exam)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(other) => value_str(other).map(|s| split_exams(&s)).unwrap_or_default(),
        None => Vec::new(),
    };

    Some(finish_record(
        university,
        program,
        get("city").and_then(value_str).unwrap_or_default(),
        get("level").and_then(value_str).unwrap_or_default(),
        get("form").and_then(value_str).unwrap_or_default(),
        exam_list,
        get("budget").and_then(value_bool),
        get("dorm").and_then(value_bool),
        get("score_min").and_then(value_u32),
        get("url").and_then(value_str).filter(|s| !s.trim().is_empty()),
        get("year").and_then(value_i32),
    ))
}

fn decode_csv(body: &str) -> Vec<ProgramRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    // Resolve header aliases once, keyed by column index.
    let columns: Vec<Option<&'static str>> = match reader.headers() {
        Ok(headers) => headers.iter().map(canonical_field).collect(),
        Err(err) => {
            warn!(error = %err, "csv header row unreadable");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(err) => {
                debug!(error = %err, "skipping malformed csv row");
                continue;
            }
        };
        let cell = |name: &str| -> Option<&str> {
            columns
                .iter()
                .position(|c| *c == Some(name))
                .and_then(|i| row.get(i))
                .filter(|s| !s.trim().is_empty())
        };

        let (Some(university), Some(program)) = (cell("university"), cell("program")) else {
            continue;
        };
        records.push(finish_record(
            university.to_string(),
            program.to_string(),
            cell("city").unwrap_or_default().to_string(),
            cell("level").unwrap_or_default().to_string(),
            cell("form").unwrap_or_default().to_string(),
            cell("exams").map(split_exams).unwrap_or_default(),
            cell("budget").and_then(lenient_bool),
            cell("dorm").and_then(lenient_bool),
            cell("score_min").and_then(lenient_u32),
            cell("url").map(str::to_string),
            cell("year").and_then(lenient_i32),
        ));
    }
    records
}

#[allow(clippy::too_many_arguments)]
fn finish_record(
    university: String,
    program: String,
    city: String,
    level: String,
    form: String,
    exam_list: Vec<String>,
    budget_available: Option<bool>,
    dorm_available: Option<bool>,
    min_score: Option<u32>,
    url: Option<String>,
    source_year: Option<i32>,
) -> ProgramRecord {
    let city = normalize::normalize_city(&city);
    let city_key = normalize::city_key(&city);
    ProgramRecord {
        university: university.trim().to_string(),
        program: program.trim().to_string(),
        city,
        city_key,
        level: normalize::normalize_level(&level),
        form: normalize::normalize_form(&form),
        exam_list,
        budget_available,
        dorm_available,
        min_score,
        url,
        source_year,
    }
}

fn split_exams(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(normalize::normalize_exam)
        .filter(|s| !s.is_empty())
        .collect()
}

fn value_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => lenient_bool(s),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn value_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|x| u32::try_from(x).ok()),
        Value::String(s) => lenient_u32(s),
        _ => None,
    }
}

fn value_i32(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => n.as_i64().and_then(|x| i32::try_from(x).ok()),
        Value::String(s) => lenient_i32(s),
        _ => None,
    }
}

fn lenient_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "да" | "yes" | "1" | "есть" => Some(true),
        "false" | "нет" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn lenient_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn lenient_i32(s: &str) -> Option<i32> {
    s.trim().parse().ok()
}
