//! # Filter Parser
//!
//! Turns one free-text user message into a structured [`QueryFilters`]
//! record. Recognition runs as an ordered sequence of independent
//! extraction rules over the same input (explicit `key=value` pairs, city
//! clause, dormitory, budget, level, study form, exams, program/direction,
//! admission year, score threshold); whatever no rule consumes becomes
//! free-text keywords for relevance scoring.
//!
//! The parser is deterministic, synchronous and never fails: worst case it
//! returns an all-unconstrained filter set with the full input as keywords.
//! Every optional field uses `None` for "unconstrained": an explicit
//! "не важно" clears a field instead of storing the literal text, and the
//! null → "не важно" translation happens only in [`QueryFilters::human_summary`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::{normalize_city, normalize_exam, normalize_form, normalize_level};

/// Structured representation of one user request. Every `None`/empty field
/// means "unconstrained"; `dorm` and `budget` are tri-state so "no" stays
/// distinguishable from "don't care".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub min_score: Option<u32>,
    #[serde(default)]
    pub dorm: Option<bool>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub required_exams: Vec<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub budget: Option<bool>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl QueryFilters {
    /// True when no hard constraint is set. Keywords and direction don't
    /// count: they only reorder results, never exclude.
    pub fn is_unconstrained(&self) -> bool {
        self.city.is_none()
            && self.min_score.is_none()
            && self.dorm.is_none()
            && self.level.is_none()
            && self.form.is_none()
            && self.required_exams.is_empty()
            && self.budget.is_none()
            && self.year.is_none()
    }

    /// Display-layer rendering; this is the only place a null becomes "не важно".
    pub fn human_summary(&self) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "не важно".into());
        let score = self
            .min_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "—".into());
        let tri = |v: Option<bool>| match v {
            Some(true) => "да",
            Some(false) => "нет",
            None => "не важно",
        };
        let exams = if self.required_exams.is_empty() {
            "—".to_string()
        } else {
            self.required_exams.join(", ")
        };
        format!(
            "город — {}, баллы — {}, общежитие — {}, уровень — {}, экзамены — {}",
            opt(&self.city),
            score,
            tri(self.dorm),
            opt(&self.level),
            exams
        )
    }
}

// Fixed vocabularies. City and exam entries mirror the comparison keys the
// normalizer produces, so a vocabulary hit is already canonical.
const KNOWN_CITIES: [&str; 10] = [
    "санкт-петербург",
    "нижний новгород",
    "москва",
    "питер",
    "спб",
    "омск",
    "новосибирск",
    "екатеринбург",
    "казань",
    "томск",
];

// Longest variants first so "математика профиль" wins over "математика".
const KNOWN_EXAMS: [&str; 14] = [
    "математика профиль",
    "профильная математика",
    "иностранный язык",
    "обществознание",
    "информатика",
    "математика",
    "литература",
    "английский",
    "география",
    "биология",
    "русский",
    "история",
    "физика",
    "химия",
];

const KNOWN_LEVELS: [&str; 8] = [
    "бакалавриат",
    "бакалавр",
    "магистратура",
    "магистр",
    "специалитет",
    "аспирантура",
    "колледж",
    "спо",
];

const KNOWN_FORMS: [&str; 8] = [
    "очно-заочная",
    "очно-заочное",
    "дистанционная",
    "дистанционное",
    "вечерняя",
    "заочная",
    "заочное",
    "очная",
];

const KNOWN_MAJORS: [&str; 8] = [
    "информатика и вычислительная техника",
    "программная инженерия",
    "прикладная информатика",
    "информатика",
    "экономика",
    "менеджмент",
    "юриспруденция",
    "математика",
];

const NOT_IMPORTANT: [&str; 5] = ["не важно", "неважно", "без разницы", "любой", "любое"];

const NEGATIVE_WORDS: [&str; 4] = ["не предоставляется", "отсутствует", "не нужно", "нет"];

/// Marker words stripped from the keyword residue; they steer extraction
/// rules and carry no relevance signal on their own.
const STOPWORDS: [&str; 29] = [
    "город",
    "гор",
    "баллы",
    "балл",
    "баллов",
    "проходной",
    "минимум",
    "общежитие",
    "общага",
    "проживание",
    "уровень",
    "степень",
    "экзамены",
    "экзамен",
    "егэ",
    "направление",
    "специальность",
    "программа",
    "форма",
    "обучения",
    "бюджет",
    "есть",
    "нужно",
    "нужен",
    "предоставляется",
    "не",
    "важно",
    "и",
    "с",
];

static RE_KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(city|город|level|уровень|form|форма)\s*=\s*([^\s=;,]+(?:\s+[^\s=;,]+)*)")
        .expect("key=value regex")
});
static RE_CITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(город|гор\.|г\.)\s*[:\-]?\s*([а-яёa-z\- ]+)").expect("city regex")
});
static RE_SCORE_KEYED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:баллы?|минимум|проходной)\s*(?:балл)?\s*[:\-]?\s*(\d{2,3})\b")
        .expect("score regex")
});
static RE_SCORE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{2,3})\s*балл(?:ов|а|ы)?\b").expect("score suffix regex"));
static RE_SCORE_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,3})\b").expect("bare score regex"));
static RE_DORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(общежити\w*|общага|проживание)").expect("dorm regex"));
static RE_BUDGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(бюджет\w*)").expect("budget regex"));
static RE_LEVEL_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:уровень|степень)\s*[:\-]?\s*([а-яёa-z]+(?:\s+[а-яёa-z]+)?)")
        .expect("level clause regex")
});
static RE_EXAMS_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:экзамены?|егэ)\s*[:\-]?\s*([а-яёa-z0-9 ,;\-()]+)")
        .expect("exams clause regex")
});
static RE_DIRECTION_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:направление|специальность|программа)\s*[:\-]?\s*([а-яёa-z0-9 \-()]+)")
        .expect("direction clause regex")
});
static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("year regex"));
static RE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)[а-яёa-z0-9\-]{2,}").expect("word regex"));

fn contains_not_important(s: &str) -> bool {
    NOT_IMPORTANT.iter().any(|w| s.contains(w))
}

/// A token other rules own: vocabulary entries and clause markers. City
/// captures and clause values stop here so greedy regexes don't swallow
/// the rest of the message.
fn is_vocab_word(tok: &str) -> bool {
    KNOWN_LEVELS.contains(&tok)
        || KNOWN_FORMS.contains(&tok)
        || KNOWN_EXAMS.contains(&tok)
        || KNOWN_MAJORS.contains(&tok)
        || STOPWORDS.contains(&tok)
        || KNOWN_CITIES.contains(&tok)
}

/// Drop trailing tokens that belong to other rules' vocabularies
/// ("программная инженерия москва" → "программная инженерия").
fn trim_trailing_vocab(s: &str) -> String {
    let mut toks: Vec<&str> = s.split_whitespace().collect();
    while let Some(last) = toks.last() {
        if is_vocab_word(last) {
            toks.pop();
        } else {
            break;
        }
    }
    toks.join(" ")
}

/// Remove the first occurrence of `piece` from the residue, replacing it
/// with a space so token boundaries survive.
fn consume(residue: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if let Some(pos) = residue.find(piece) {
        residue.replace_range(pos..pos + piece.len(), " ");
    }
}

/// The clause a keyword match belongs to: from the match start to the next
/// `,`/`;`/`.` or end of message.
fn clause_after(text: &str, start: usize) -> &str {
    let rest = &text[start..];
    let end = rest.find([',', ';', '.']).unwrap_or(rest.len());
    &rest[..end]
}

/// Like [`trim_trailing_vocab`] but spares tokens `own` claims, so a
/// `city=` value that is itself city vocabulary survives the trim.
fn trim_trailing_vocab_except(s: &str, own: impl Fn(&str) -> bool) -> String {
    let mut toks: Vec<&str> = s.split_whitespace().collect();
    while let Some(last) = toks.last() {
        if is_vocab_word(last) && !own(last) {
            toks.pop();
        } else {
            break;
        }
    }
    toks.join(" ")
}

fn rule_key_value(t: &str, residue: &mut String, out: &mut QueryFilters) {
    for caps in RE_KEY_VALUE.captures_iter(t) {
        let key = caps[1].to_lowercase();
        // The value capture is greedy; cut it back to the tokens this key owns.
        let own: fn(&str) -> bool = match key.as_str() {
            "city" | "город" => |tok| KNOWN_CITIES.contains(&tok),
            "level" | "уровень" => |tok| KNOWN_LEVELS.contains(&tok),
            "form" | "форма" => |tok| KNOWN_FORMS.contains(&tok),
            _ => |_| false,
        };
        let val = trim_trailing_vocab_except(caps[2].trim(), own);
        if val.is_empty() || contains_not_important(&val) {
            consume(residue, &caps[0]);
            continue;
        }
        match key.as_str() {
            "city" | "город" => {
                out.city = Some(normalize_city(&val)).filter(|c| !c.is_empty());
            }
            "level" | "уровень" => {
                out.level = Some(normalize_level(&val)).filter(|l| !l.is_empty());
            }
            "form" | "форма" => {
                out.form = Some(normalize_form(&val)).filter(|f| !f.is_empty());
            }
            _ => {}
        }
        consume(residue, &caps[0]);
    }
}

/// City rule: explicit `(город|г.)` clause first, then the known-cities
/// vocabulary. "город не важно" clears the field and suppresses the scan.
fn rule_city(t: &str, residue: &mut String, out: &mut QueryFilters) {
    let mut cleared = false;
    if out.city.is_none() {
        if let Some(caps) = RE_CITY.captures(t) {
            let keyword = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let captured = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let captured_lc = captured.trim().to_lowercase();
            if let Some(phrase) = NOT_IMPORTANT.iter().find(|w| captured_lc.starts_with(*w)) {
                // Explicit "doesn't matter": unconstrained, not a literal city.
                cleared = true;
                consume(residue, keyword);
                consume(residue, phrase);
            } else {
                // Keep tokens until some other vocabulary word shows up,
                // three at most (covers "нижний новгород", "ростов-на-дону").
                let mut taken: Vec<&str> = Vec::new();
                for tok in captured.split_whitespace() {
                    if taken.len() == 3 || is_vocab_word(tok) {
                        break;
                    }
                    taken.push(tok);
                }
                let name = taken.join(" ");
                if !name.is_empty() {
                    out.city = Some(normalize_city(&name)).filter(|c| !c.is_empty());
                    consume(residue, keyword);
                    for tok in taken {
                        consume(residue, tok);
                    }
                }
            }
        }
    }
    if out.city.is_none() && !cleared {
        for city in KNOWN_CITIES {
            if t.contains(city) {
                out.city = Some(normalize_city(city));
                consume(residue, city);
                break;
            }
        }
    }
}

fn rule_dorm(t: &str, residue: &mut String, out: &mut QueryFilters) {
    if let Some(m) = RE_DORM.find(t) {
        let clause = clause_after(t, m.start());
        if NEGATIVE_WORDS.iter().any(|w| clause.contains(w)) {
            out.dorm = Some(false);
        } else if contains_not_important(clause) {
            out.dorm = None;
        } else {
            // Topic mentioned without negation defaults to "required".
            out.dorm = Some(true);
        }
        consume(residue, clause);
    }
}

fn rule_budget(t: &str, residue: &mut String, out: &mut QueryFilters) {
    if let Some(m) = RE_BUDGET.find(t) {
        let clause = clause_after(t, m.start());
        if NEGATIVE_WORDS.iter().any(|w| clause.contains(w)) {
            out.budget = Some(false);
        } else if contains_not_important(clause) {
            out.budget = None;
        } else {
            out.budget = Some(true);
        }
        consume(residue, m.as_str());
    }
}

fn rule_level(t: &str, residue: &mut String, out: &mut QueryFilters) {
    if out.level.is_none() {
        if let Some(caps) = RE_LEVEL_CLAUSE.captures(t) {
            let val = caps[1].trim().to_lowercase();
            if contains_not_important(&val) {
                // "уровень не важно" keeps the field unconstrained.
                consume(residue, &caps[0]);
                return;
            }
        }
        for lvl in KNOWN_LEVELS {
            if t.contains(lvl) {
                out.level = Some(normalize_level(lvl));
                consume(residue, lvl);
                break;
            }
        }
    } else {
        // Already set via key=value; still consume a plain vocabulary hit.
        for lvl in KNOWN_LEVELS {
            if t.contains(lvl) {
                consume(residue, lvl);
            }
        }
    }
}

fn rule_form(t: &str, residue: &mut String, out: &mut QueryFilters) {
    if out.form.is_some() {
        return;
    }
    for form in KNOWN_FORMS {
        if t.contains(form) {
            out.form = Some(normalize_form(form));
            consume(residue, form);
            break;
        }
    }
}

fn rule_exams(t: &str, residue: &mut String, out: &mut QueryFilters) {
    let mut found: Vec<String> = Vec::new();
    if let Some(caps) = RE_EXAMS_CLAUSE.captures(t) {
        for part in caps[1].split([',', ';']) {
            let e = normalize_exam(&trim_trailing_vocab_keep_exams(part));
            if !e.is_empty() && !found.contains(&e) {
                found.push(e);
            }
        }
        consume(residue, &caps[0]);
    } else {
        // No explicit clause: scan the whole message, first-seen order.
        let mut hits: Vec<(usize, usize, &str)> = Vec::new();
        for exam in KNOWN_EXAMS {
            if let Some(pos) = t.find(exam) {
                hits.push((pos, exam.len(), exam));
            }
        }
        // Position order; longer entry wins a shared start ("математика
        // профиль" over "математика").
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut covered_until = 0usize;
        for (pos, len, exam) in hits {
            if pos < covered_until {
                continue;
            }
            let e = normalize_exam(exam);
            if !found.contains(&e) {
                found.push(e);
                covered_until = pos + len;
                consume(residue, exam);
            }
        }
    }
    out.required_exams = found;
}

/// Like [`trim_trailing_vocab`] but keeps exam vocabulary, since here exam
/// words are the payload ("математика москва" → "математика").
fn trim_trailing_vocab_keep_exams(s: &str) -> String {
    let mut toks: Vec<&str> = s.split_whitespace().collect();
    while let Some(last) = toks.last() {
        let owned_elsewhere = (KNOWN_LEVELS.contains(last)
            || KNOWN_FORMS.contains(last)
            || KNOWN_CITIES.contains(last)
            || STOPWORDS.contains(last))
            && !KNOWN_EXAMS.contains(last);
        if owned_elsewhere {
            toks.pop();
        } else {
            break;
        }
    }
    toks.join(" ")
}

fn rule_direction(t: &str, _residue: &mut String, out: &mut QueryFilters) {
    if let Some(caps) = RE_DIRECTION_CLAUSE.captures(t) {
        let val = trim_trailing_vocab(caps[1].trim());
        if !val.is_empty() && !contains_not_important(&val) {
            out.direction = Some(val);
            return;
        }
    }
    for major in KNOWN_MAJORS {
        if t.contains(major) {
            out.direction = Some(major.to_string());
            break;
        }
    }
}

fn rule_year(t: &str, residue: &mut String, out: &mut QueryFilters) {
    if let Some(caps) = RE_YEAR.captures(t) {
        if let Ok(y) = caps[1].parse::<i32>() {
            if (2015..=2035).contains(&y) {
                out.year = Some(y);
                consume(residue, &caps[0]);
            }
        }
    }
}

/// Score rule: keyworded 2–3 digit numbers win; a bare 2–3 digit number in
/// the residue is accepted as a weaker signal. The bare-number heuristic is
/// a known source of false positives (street numbers, counts) and is kept
/// as documented behavior of the original.
fn rule_score(t: &str, residue: &mut String, out: &mut QueryFilters) {
    let keyed = RE_SCORE_KEYED
        .captures(t)
        .or_else(|| RE_SCORE_SUFFIX.captures(t));
    if let Some(caps) = keyed {
        if let Ok(v) = caps[1].parse::<u32>() {
            out.min_score = Some(v);
            consume(residue, &caps[0]);
            return;
        }
    }
    let snapshot = residue.clone();
    if let Some(caps) = RE_SCORE_BARE.captures(&snapshot) {
        if let Ok(v) = caps[1].parse::<u32>() {
            out.min_score = Some(v);
            consume(residue, &caps[0]);
        }
    }
}

fn rule_keywords(residue: &str, out: &mut QueryFilters) {
    let mut kw: Vec<String> = Vec::new();
    for m in RE_WORD.find_iter(residue) {
        let w = m.as_str().to_string();
        if STOPWORDS.contains(&w.as_str()) {
            continue;
        }
        if !kw.contains(&w) {
            kw.push(w);
        }
    }
    out.keywords = kw;
}

/// Parse one free-text message into [`QueryFilters`]. Deterministic, no I/O,
/// never fails; the rules run in priority order over the same input.
pub fn parse(raw: &str) -> QueryFilters {
    let t = raw.trim().to_lowercase().replace('ё', "е");
    let mut out = QueryFilters::default();
    if t.is_empty() {
        return out;
    }
    let mut residue = t.clone();

    rule_key_value(&t, &mut residue, &mut out);
    rule_city(&t, &mut residue, &mut out);
    rule_dorm(&t, &mut residue, &mut out);
    rule_budget(&t, &mut residue, &mut out);
    rule_level(&t, &mut residue, &mut out);
    rule_form(&t, &mut residue, &mut out);
    rule_exams(&t, &mut residue, &mut out);
    rule_direction(&t, &mut residue, &mut out);
    rule_year(&t, &mut residue, &mut out);
    // Score runs last: year consumption keeps a 4-digit year away from the
    // bare-number heuristic, and the exam rule has already removed numbers
    // embedded in exam clauses from the residue.
    rule_score(&t, &mut residue, &mut out);
    rule_keywords(&residue, &mut out);

    debug!(
        target: "filters",
        id = %anon_hash(raw),
        summary = %out.human_summary(),
        "parsed query"
    );
    out
}

/// Short SHA-256 digest so query logs stay useful without retaining raw
/// user text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_structured_message() {
        let f = parse(
            "Город Омск; баллы 210; общежитие есть; уровень бакалавриат; \
             экзамены математика профиль, физика, русский",
        );
        assert_eq!(f.city.as_deref(), Some("Омск"));
        assert_eq!(f.min_score, Some(210));
        assert_eq!(f.dorm, Some(true));
        assert_eq!(f.level.as_deref(), Some("бакалавриат"));
        assert_eq!(
            f.required_exams,
            vec!["математика профиль", "физика", "русский"]
        );
    }

    #[test]
    fn city_not_important_clears_instead_of_storing() {
        let f = parse("город не важно бакалавриат");
        assert_eq!(f.city, None);
        assert_eq!(f.level.as_deref(), Some("бакалавриат"));
    }

    #[test]
    fn city_vocabulary_scan_without_clause() {
        let f = parse("информатика москва бакалавриат");
        assert_eq!(f.city.as_deref(), Some("Москва"));
        assert_eq!(f.level.as_deref(), Some("бакалавриат"));
    }

    #[test]
    fn city_alias_and_prefix() {
        assert_eq!(
            parse("г. спб магистратура").city.as_deref(),
            Some("Санкт-Петербург")
        );
        assert_eq!(
            parse("питер физика").city.as_deref(),
            Some("Санкт-Петербург")
        );
    }

    #[test]
    fn multiword_city_stops_at_vocab() {
        let f = parse("город нижний новгород бакалавриат экономика");
        assert_eq!(f.city.as_deref(), Some("Нижний Новгород"));
        assert_eq!(f.level.as_deref(), Some("бакалавриат"));
    }

    #[test]
    fn key_value_pairs_take_priority() {
        let f = parse("математика city=Санкт-Петербург магистратура");
        assert_eq!(f.city.as_deref(), Some("Санкт-Петербург"));
        assert_eq!(f.level.as_deref(), Some("магистратура"));
    }

    #[test]
    fn score_with_keyword() {
        assert_eq!(parse("проходной балл 250 москва").min_score, Some(250));
        assert_eq!(parse("у меня 180 баллов").min_score, Some(180));
    }

    #[test]
    fn bare_number_is_accepted_as_weak_signal() {
        // Known ambiguity, kept as documented behavior.
        assert_eq!(parse("информатика 240 москва").min_score, Some(240));
    }

    #[test]
    fn year_is_not_mistaken_for_score() {
        let f = parse("информатика москва 2024");
        assert_eq!(f.year, Some(2024));
        assert_eq!(f.min_score, None);
    }

    #[test]
    fn dorm_tristate() {
        assert_eq!(parse("нужно общежитие").dorm, Some(true));
        assert_eq!(parse("общежитие не предоставляется").dorm, Some(false));
        assert_eq!(parse("общежитие нет").dorm, Some(false));
        assert_eq!(parse("общежитие не важно").dorm, None);
        assert_eq!(parse("информатика москва").dorm, None);
    }

    #[test]
    fn budget_tristate() {
        assert_eq!(parse("информатика бюджет москва").budget, Some(true));
        assert_eq!(parse("бюджета нет, согласен платно").budget, Some(false));
        assert_eq!(parse("бюджет не важно").budget, None);
        assert_eq!(parse("информатика москва").budget, None);
    }

    #[test]
    fn level_not_important_clears() {
        let f = parse("москва уровень не важно физика");
        assert_eq!(f.level, None);
        assert_eq!(f.city.as_deref(), Some("Москва"));
    }

    #[test]
    fn form_vocabulary_longest_first() {
        assert_eq!(
            parse("очно-заочная форма обучения").form.as_deref(),
            Some("очно-заочная")
        );
        assert_eq!(parse("заочная магистратура").form.as_deref(), Some("заочная"));
        assert_eq!(parse("очная информатика").form.as_deref(), Some("очная"));
    }

    #[test]
    fn exams_clause_splits_and_normalizes() {
        let f = parse("егэ: профильная математика, инф; рус");
        assert_eq!(
            f.required_exams,
            vec!["математика профиль", "информатика", "русский"]
        );
    }

    #[test]
    fn exams_scan_preserves_first_seen_order() {
        let f = parse("сдавал: физика русский математика профиль");
        assert_eq!(
            f.required_exams,
            vec!["физика", "русский", "математика профиль"]
        );
    }

    #[test]
    fn exam_scan_does_not_double_count_profil_math() {
        let f = parse("математика профиль и информатика");
        assert_eq!(f.required_exams, vec!["математика профиль", "информатика"]);
    }

    #[test]
    fn direction_clause_and_majors_scan() {
        assert_eq!(
            parse("направление программная инженерия москва")
                .direction
                .as_deref(),
            Some("программная инженерия")
        );
        assert_eq!(
            parse("менеджмент москва").direction.as_deref(),
            Some("менеджмент")
        );
    }

    #[test]
    fn unmatched_text_becomes_keywords() {
        let f = parse("лучший университет для олимпиадников");
        assert!(f.is_unconstrained());
        assert_eq!(
            f.keywords,
            vec!["лучший", "университет", "для", "олимпиадников"]
        );
    }

    #[test]
    fn empty_input_is_fully_unconstrained() {
        let f = parse("   ");
        assert!(f.is_unconstrained());
        assert!(f.keywords.is_empty());
    }

    #[test]
    fn human_summary_renders_null_as_ne_vazhno() {
        let s = QueryFilters::default().human_summary();
        assert!(s.contains("город — не важно"));
        assert!(s.contains("баллы — —"));
    }

    #[test]
    fn parse_never_panics_on_noise() {
        for s in ["?!;;;", "= = =", "город", "баллы", "123456789", "г."] {
            let _ = parse(s);
        }
    }
}
