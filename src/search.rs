// src/search.rs
//! Offline matcher and ranker: hard filtering by [`QueryFilters`], relevance
//! scoring of the survivors, stable sort, pagination.
//!
//! Filtering is strict only where the user was explicit. Unknown record
//! fields never exclude: a record without a published minimum score still
//! matches a score threshold, a record with no exam data still matches an
//! exam constraint. Scoring only reorders, it never drops.

use serde::{Deserialize, Serialize};

use crate::corpus::ProgramRecord;
use crate::filters::QueryFilters;
use crate::normalize;

/// Queries shorter than this return an empty page instead of scanning.
pub const MIN_QUERY_CHARS: usize = 3;

const W_PROGRAM_TOKEN: f32 = 0.4;
const W_UNIVERSITY_TOKEN: f32 = 0.15;
const W_CITY_BONUS: f32 = 0.2;
const W_FUZZY: f32 = 0.25;
const FUZZY_FLOOR: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub items: Vec<ProgramRecord>,
    pub total_matching: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl SearchResultPage {
    pub fn empty(offset: usize, limit: usize) -> Self {
        Self {
            items: Vec::new(),
            total_matching: 0,
            offset,
            limit,
            has_more: false,
        }
    }
}

/// One interface, interchangeable implementations; which one runs is
/// decided once at startup, not per call.
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &'static str;
    /// Lexical relevance of the free-text keywords to one record. The city
    /// bonus is applied outside the scorer so both implementations agree
    /// on it.
    fn relevance(&self, keywords: &[String], record: &ProgramRecord) -> f32;
}

/// Substring-overlap scorer, always available.
pub struct TokenOverlapScorer;

impl RelevanceScorer for TokenOverlapScorer {
    fn name(&self) -> &'static str {
        "token"
    }

    fn relevance(&self, keywords: &[String], record: &ProgramRecord) -> f32 {
        let program = fold(&record.program);
        let university = fold(&record.university);
        let mut score = 0.0;
        for kw in keywords {
            if program.contains(kw.as_str()) {
                score += W_PROGRAM_TOKEN;
            }
            if university.contains(kw.as_str()) {
                score += W_UNIVERSITY_TOKEN;
            }
        }
        score
    }
}

/// Overlap scorer with edit-distance credit for near-miss keywords, so
/// inflected or misspelled program names still rank above strangers.
pub struct FuzzyScorer;

impl RelevanceScorer for FuzzyScorer {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn relevance(&self, keywords: &[String], record: &ProgramRecord) -> f32 {
        let mut score = TokenOverlapScorer.relevance(keywords, record);
        let program = fold(&record.program);
        let program_tokens: Vec<&str> = program.split_whitespace().collect();
        for kw in keywords {
            if program.contains(kw.as_str()) {
                continue;
            }
            let best = program_tokens
                .iter()
                .map(|t| strsim::normalized_levenshtein(kw, t))
                .fold(0.0_f64, f64::max);
            if best >= FUZZY_FLOOR {
                score += (best as f32) * W_FUZZY;
            }
        }
        score
    }
}

/// Startup-time scorer selection. Unrecognized names fall back to the
/// fuzzy scorer.
pub fn select_scorer(kind: &str) -> Box<dyn RelevanceScorer> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "token" => Box::new(TokenOverlapScorer),
        _ => Box::new(FuzzyScorer),
    }
}

/// Hard-filter, score, sort, paginate.
pub fn search(
    raw_query: &str,
    filters: &QueryFilters,
    offset: usize,
    limit: usize,
    records: &[ProgramRecord],
    scorer: &dyn RelevanceScorer,
) -> SearchResultPage {
    if records.is_empty() || raw_query.trim().chars().count() < MIN_QUERY_CHARS {
        return SearchResultPage::empty(offset, limit);
    }

    let raw_folded = fold(raw_query);
    let mut keywords: Vec<String> = filters.keywords.iter().map(|k| fold(k)).collect();
    // The extracted program direction is the strongest relevance signal and
    // is usually consumed out of the keyword residue by the parser.
    if let Some(direction) = filters.direction.as_deref() {
        let d = fold(direction);
        if !keywords.contains(&d) {
            keywords.push(d);
        }
    }

    let mut scored: Vec<(&ProgramRecord, f32)> = records
        .iter()
        .filter(|r| matches(filters, r))
        .map(|r| {
            let mut score = scorer.relevance(&keywords, r);
            if !r.city_key.is_empty() && raw_folded.contains(&r.city_key) {
                score += W_CITY_BONUS;
            }
            (r, score)
        })
        .collect();

    // sort_by is stable, so equal scores keep corpus order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total_matching = scored.len();
    let items: Vec<ProgramRecord> = scored
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(r, _)| r.clone())
        .collect();

    SearchResultPage {
        items,
        total_matching,
        offset,
        limit,
        has_more: offset.saturating_add(limit) < total_matching,
    }
}

/// True when the record survives every constraint the filters actually set.
pub fn matches(filters: &QueryFilters, record: &ProgramRecord) -> bool {
    if let Some(city) = filters.city.as_deref() {
        // Exact key equality; substring would confuse "Москва" with
        // "Московская область".
        if normalize::city_key(city) != record.city_key {
            return false;
        }
    }
    if let Some(level) = filters.level.as_deref() {
        if !record.level.contains(&normalize::normalize_level(level)) {
            return false;
        }
    }
    if let Some(form) = filters.form.as_deref() {
        if !record.form.contains(&normalize::normalize_form(form)) {
            return false;
        }
    }
    if let Some(threshold) = filters.min_score {
        // Absent record score never excludes.
        if let Some(score) = record.min_score {
            if score < threshold {
                return false;
            }
        }
    }
    if tri_state_conflict(filters.dorm, record.dorm_available) {
        return false;
    }
    if tri_state_conflict(filters.budget, record.budget_available) {
        return false;
    }
    if !filters.required_exams.is_empty() && !record.exam_list.is_empty() {
        let serialized = fold(&record.exam_list.join(" "));
        for exam in &filters.required_exams {
            if !serialized.contains(&fold(&normalize::normalize_exam(exam))) {
                return false;
            }
        }
    }
    if let Some(year) = filters.year {
        if let Some(record_year) = record.source_year {
            if record_year != year {
                return false;
            }
        }
    }
    true
}

/// Excludes only when both sides are concrete and disagree.
fn tri_state_conflict(want: Option<bool>, have: Option<bool>) -> bool {
    matches!((want, have), (Some(w), Some(h)) if w != h)
}

fn fold(s: &str) -> String {
    s.to_lowercase().replace('ё', "е")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(university: &str, program: &str, city: &str, level: &str, score: Option<u32>) -> ProgramRecord {
        let city = normalize::normalize_city(city);
        ProgramRecord {
            university: university.to_string(),
            program: program.to_string(),
            city_key: normalize::city_key(&city),
            city,
            level: level.to_string(),
            min_score: score,
            ..ProgramRecord::default()
        }
    }

    fn three_city_corpus() -> Vec<ProgramRecord> {
        vec![
            record("МГУ", "Прикладная математика", "Москва", "бакалавриат", Some(250)),
            record("ОмГУ", "Информатика", "Омск", "бакалавриат", Some(200)),
            record("ВШЭ", "Экономика", "Москва", "магистратура", Some(300)),
        ]
    }

    #[test]
    fn moscow_bachelor_query_matches_exactly_one() {
        let corpus = three_city_corpus();
        let filters = QueryFilters {
            city: Some("Москва".into()),
            level: Some("бакалавриат".into()),
            ..QueryFilters::default()
        };
        let page = search("Москва бакалавриат", &filters, 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 1);
        assert_eq!(page.items[0].university, "МГУ");
        assert_eq!(page.items[0].min_score, Some(250));
    }

    #[test]
    fn unconstrained_filters_match_whole_corpus_in_stable_order() {
        let corpus = three_city_corpus();
        let page = search("университет", &QueryFilters::default(), 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 3);
        // "университет" appears in no program name, all scores tie, corpus
        // order survives.
        let unis: Vec<&str> = page.items.iter().map(|r| r.university.as_str()).collect();
        assert_eq!(unis, vec!["МГУ", "ОмГУ", "ВШЭ"]);
    }

    #[test]
    fn empty_corpus_returns_empty_page() {
        let page = search("информатика в москве", &QueryFilters::default(), 0, 10, &[], &FuzzyScorer);
        assert_eq!(page.total_matching, 0);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn short_query_returns_empty_page() {
        let corpus = three_city_corpus();
        let page = search("ок", &QueryFilters::default(), 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 0);
    }

    #[test]
    fn adding_constraints_never_grows_the_match_set() {
        let corpus = three_city_corpus();
        let base = QueryFilters::default();
        let mut narrowed = base.clone();
        narrowed.city = Some("Москва".into());
        let mut narrower = narrowed.clone();
        narrower.min_score = Some(260);

        let n0 = search("университеты", &base, 0, 100, &corpus, &TokenOverlapScorer).total_matching;
        let n1 = search("университеты", &narrowed, 0, 100, &corpus, &TokenOverlapScorer).total_matching;
        let n2 = search("университеты", &narrower, 0, 100, &corpus, &TokenOverlapScorer).total_matching;
        assert!(n0 >= n1 && n1 >= n2);
    }

    #[test]
    fn missing_min_score_is_never_excluded_by_threshold() {
        let corpus = vec![record("СФУ", "Физика", "Красноярск", "бакалавриат", None)];
        let filters = QueryFilters {
            min_score: Some(290),
            ..QueryFilters::default()
        };
        assert_eq!(
            search("физика", &filters, 0, 10, &corpus, &TokenOverlapScorer).total_matching,
            1
        );
    }

    #[test]
    fn tri_state_dorm_only_excludes_on_concrete_disagreement() {
        let mut with_dorm = record("А", "Химия", "Казань", "бакалавриат", None);
        with_dorm.dorm_available = Some(true);
        let mut without_dorm = record("Б", "Химия", "Казань", "бакалавриат", None);
        without_dorm.dorm_available = Some(false);
        let unknown_dorm = record("В", "Химия", "Казань", "бакалавриат", None);
        let corpus = vec![with_dorm, without_dorm, unknown_dorm];

        let need_dorm = QueryFilters {
            dorm: Some(true),
            ..QueryFilters::default()
        };
        let page = search("химия", &need_dorm, 0, 10, &corpus, &TokenOverlapScorer);
        // Concrete "no" drops out, unknown stays in.
        assert_eq!(page.total_matching, 2);
        assert!(page.items.iter().all(|r| r.dorm_available != Some(false)));
    }

    #[test]
    fn empty_exam_list_never_excluded_by_exam_filter() {
        let mut with_exams = record("А", "Информатика", "Омск", "бакалавриат", None);
        with_exams.exam_list = vec!["математика профиль".into(), "информатика".into()];
        let no_exam_data = record("Б", "Информатика", "Омск", "бакалавриат", None);
        let mut wrong_exams = record("В", "Информатика", "Омск", "бакалавриат", None);
        wrong_exams.exam_list = vec!["биология".into()];
        let corpus = vec![with_exams, no_exam_data, wrong_exams];

        let filters = QueryFilters {
            required_exams: vec!["информатика".into()],
            ..QueryFilters::default()
        };
        let page = search("информатика", &filters, 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 2);
    }

    #[test]
    fn program_overlap_outranks_university_overlap() {
        let corpus = vec![
            record("Информатика-центр", "Экономика", "Омск", "бакалавриат", None),
            record("ОмГУ", "Прикладная информатика", "Омск", "бакалавриат", None),
        ];
        let filters = QueryFilters {
            keywords: vec!["информатика".into()],
            ..QueryFilters::default()
        };
        let page = search("информатика", &filters, 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.items[0].university, "ОмГУ");
    }

    #[test]
    fn city_mention_in_raw_query_is_a_bonus_not_a_filter() {
        let corpus = vec![
            record("ОмГУ", "Информатика", "Омск", "бакалавриат", None),
            record("МГУ", "Информатика", "Москва", "бакалавриат", None),
        ];
        let filters = QueryFilters {
            keywords: vec!["информатика".into()],
            ..QueryFilters::default()
        };
        let page = search("информатика в москве... ну или москва", &filters, 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 2);
        assert_eq!(page.items[0].city, "Москва");
    }

    #[test]
    fn fuzzy_scorer_credits_near_miss_keywords() {
        let corpus = vec![
            record("А", "Юриспруденция", "Омск", "бакалавриат", None),
            record("Б", "Математика", "Омск", "бакалавриат", None),
        ];
        let filters = QueryFilters {
            // Misspelled, no substring hit anywhere.
            keywords: vec!["матиматика".into()],
            ..QueryFilters::default()
        };
        let page = search("матиматика", &filters, 0, 10, &corpus, &FuzzyScorer);
        assert_eq!(page.items[0].program, "Математика");
    }

    #[test]
    fn pages_concatenate_to_the_full_result_set() {
        let corpus: Vec<ProgramRecord> = (0..7)
            .map(|i| record(&format!("У{i}"), "Физика", "Томск", "бакалавриат", None))
            .collect();
        let filters = QueryFilters::default();
        let full = search("физика", &filters, 0, 100, &corpus, &TokenOverlapScorer);

        let mut collected = Vec::new();
        let mut offset = 0;
        loop {
            let page = search("физика", &filters, offset, 3, &corpus, &TokenOverlapScorer);
            let advanced = page.items.len();
            collected.extend(page.items);
            offset += 3;
            if !page.has_more {
                break;
            }
            assert_eq!(advanced, 3);
        }
        assert_eq!(collected, full.items);
    }

    #[test]
    fn huge_offset_yields_an_empty_page_not_a_panic() {
        let corpus = three_city_corpus();
        let page = search(
            "все вузы",
            &QueryFilters::default(),
            usize::MAX,
            10,
            &corpus,
            &TokenOverlapScorer,
        );
        assert_eq!(page.total_matching, 3);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn has_more_flags_exactly_when_a_tail_remains() {
        let corpus = three_city_corpus();
        let first = search("вузы страны", &QueryFilters::default(), 0, 2, &corpus, &TokenOverlapScorer);
        assert!(first.has_more);
        let last = search("вузы страны", &QueryFilters::default(), 2, 2, &corpus, &TokenOverlapScorer);
        assert!(!last.has_more);
        assert_eq!(last.items.len(), 1);
    }

    #[test]
    fn year_filter_keeps_unknown_year_records() {
        let mut old = record("А", "Физика", "Томск", "бакалавриат", None);
        old.source_year = Some(2024);
        let mut fresh = record("Б", "Физика", "Томск", "бакалавриат", None);
        fresh.source_year = Some(2025);
        let unknown = record("В", "Физика", "Томск", "бакалавриат", None);
        let corpus = vec![old, fresh, unknown];

        let filters = QueryFilters {
            year: Some(2025),
            ..QueryFilters::default()
        };
        let page = search("физика", &filters, 0, 10, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 2);
    }
}
