//! # Normalizer
//!
//! Canonicalization of free-text Russian tokens (city names, education
//! levels, exam names) to a fixed comparison vocabulary.
//!
//! - City aliases map common variant spellings ("спб", "питер") to one
//!   canonical name; output is title-cased for display, `city_key` gives the
//!   lower-case comparison form.
//! - Level matching is an ordered stem list; first match wins.
//! - Exam aliases collapse word-order variants of the same subject.
//!
//! Every function here is pure and total: malformed input degrades to a
//! trimmed lower-cased copy, empty input returns an empty string. Outputs
//! are idempotent under re-normalization so stored record fields and parsed
//! filter values compare consistently regardless of original casing,
//! prefixes ("г.", "город") or spelling (ё/е, dash styles).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static CITY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("москва", "Москва"),
        ("мск", "Москва"),
        ("спб", "Санкт-Петербург"),
        ("питер", "Санкт-Петербург"),
        ("санкт петербург", "Санкт-Петербург"),
        ("санкт-петербург", "Санкт-Петербург"),
        ("петербург", "Санкт-Петербург"),
        ("екб", "Екатеринбург"),
        ("нижний новгород", "Нижний Новгород"),
    ])
});

static EXAM_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("профильная математика", "математика профиль"),
        ("математика профильная", "математика профиль"),
        ("рус", "русский"),
        ("русский язык", "русский"),
        ("инф", "информатика"),
        ("общество", "обществознание"),
        ("англ", "английский"),
    ])
});

/// Level stems in priority order; the first stem contained in the input wins.
const LEVEL_STEMS: [(&str, &str); 5] = [
    ("бак", "бакалавриат"),
    ("маг", "магистратура"),
    ("спец", "специалитет"),
    ("аспи", "аспирантура"),
    ("спо", "спо"),
];

static RE_CITY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(г\.|гор\.|город)\s*").expect("city prefix regex"));
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-–—]+").expect("dash regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Shared cleanup: trim, lower-case, ё→е, collapse dash variants and runs
/// of whitespace.
fn clean(s: &str) -> String {
    let mut out = s.trim().to_lowercase();
    out = out.replace('ё', "е");
    out = RE_DASHES.replace_all(&out, "-").into_owned();
    out = RE_WS.replace_all(&out, " ").into_owned();
    out.trim().to_string()
}

/// Title-case each dash- or space-separated word (Cyrillic aware).
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = true;
    for ch in s.chars() {
        if upper_next && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
            if ch == ' ' || ch == '-' {
                upper_next = true;
            }
        }
    }
    out
}

/// Canonical display form of a city name ("г. ОМСК" → "Омск").
pub fn normalize_city(s: &str) -> String {
    let stripped = RE_CITY_PREFIX.replace(s.trim(), "");
    let key = clean(&stripped);
    if key.is_empty() {
        return String::new();
    }
    if let Some(canon) = CITY_ALIASES.get(key.as_str()) {
        return (*canon).to_string();
    }
    // Alias table keys are dash-normalized; retry with dashes as spaces so
    // "санкт - петербург" still resolves.
    let spaced = key.replace('-', " ");
    if let Some(canon) = CITY_ALIASES.get(spaced.as_str()) {
        return (*canon).to_string();
    }
    title_case(&key)
}

/// Lower-case comparison key for a city; equality on keys is the safe city
/// match (exact, no substring, so "Москва" never matches "Московская область").
pub fn city_key(s: &str) -> String {
    normalize_city(s).to_lowercase()
}

/// Canonical education level ("бакалавр", "Бакалавриат (очно)" → "бакалавриат").
/// Unknown levels come back as the trimmed lower-case input, not an error.
pub fn normalize_level(s: &str) -> String {
    let l = clean(s);
    if l.is_empty() {
        return String::new();
    }
    for (stem, canon) in LEVEL_STEMS {
        if l.contains(stem) {
            return canon.to_string();
        }
    }
    l
}

/// Canonical study form ("Очно—заочная" → "очно-заочная"). Forms carry no
/// alias table; cleanup alone makes record and filter values comparable.
pub fn normalize_form(s: &str) -> String {
    clean(s)
}

/// Canonical exam name ("Профильная математика" → "математика профиль").
pub fn normalize_exam(s: &str) -> String {
    let e = clean(s);
    if e.is_empty() {
        return String::new();
    }
    match EXAM_ALIASES.get(e.as_str()) {
        Some(canon) => (*canon).to_string(),
        None => e,
    }
}
