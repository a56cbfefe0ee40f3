// tests/search_ranking.rs
//
// Matcher/ranker behavior over small hand-built corpora, through the public
// `search` surface: hard filtering, relevance order, pagination contract.

use uni_finder::filters::{parse, QueryFilters};
use uni_finder::normalize;
use uni_finder::search::{search, select_scorer, RelevanceScorer, TokenOverlapScorer};
use uni_finder::ProgramRecord;

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

fn corpus() -> Vec<ProgramRecord> {
    vec![
        record("МГУ", "Прикладная математика", "Москва", "бакалавриат", Some(250)),
        record("ОмГУ", "Информатика", "Омск", "бакалавриат", Some(200)),
        record("ВШЭ", "Экономика", "Москва", "магистратура", Some(300)),
    ]
}

#[test]
fn parsed_query_drives_the_whole_pipeline() {
    let corpus = corpus();
    let raw = "Москва бакалавриат";
    let filters = parse(raw);
    let page = search(raw, &filters, 0, 10, &corpus, &TokenOverlapScorer);
    assert_eq!(page.total_matching, 1);
    assert_eq!(page.items[0].university, "МГУ");
    assert_eq!(page.items[0].min_score, Some(250));
}

#[test]
fn no_constraints_keeps_corpus_order_on_tied_scores() {
    let corpus = corpus();
    let page = search("университет", &QueryFilters::default(), 0, 10, &corpus, &TokenOverlapScorer);
    assert_eq!(page.total_matching, 3);
    let order: Vec<&str> = page.items.iter().map(|r| r.university.as_str()).collect();
    assert_eq!(order, vec!["МГУ", "ОмГУ", "ВШЭ"]);
}

#[test]
fn score_threshold_excludes_only_known_lower_scores() {
    let mut corpus = corpus();
    corpus.push(record("СФУ", "Математика", "Красноярск", "бакалавриат", None));
    let filters = QueryFilters {
        min_score: Some(260),
        ..QueryFilters::default()
    };
    let page = search("математика", &filters, 0, 10, &corpus, &TokenOverlapScorer);
    // 250 and 200 drop, 300 stays, the unknown score stays.
    assert_eq!(page.total_matching, 2);
    assert!(page
        .items
        .iter()
        .all(|r| r.min_score.is_none() || r.min_score >= Some(260)));
}

#[test]
fn configured_scorer_names_select_distinct_implementations() {
    assert_eq!(select_scorer("token").name(), "token");
    assert_eq!(select_scorer("fuzzy").name(), "fuzzy");
    // Unrecognized names fall back to fuzzy.
    assert_eq!(select_scorer("whatever").name(), "fuzzy");
}

#[test]
fn pagination_partitions_the_filtered_set() {
    let corpus: Vec<ProgramRecord> = (0..10)
        .map(|i| record(&format!("Вуз {i}"), "Физика", "Томск", "бакалавриат", Some(200 + i)))
        .collect();
    let filters = QueryFilters::default();
    let full = search("физика", &filters, 0, 100, &corpus, &TokenOverlapScorer);
    assert_eq!(full.total_matching, 10);

    let mut stitched = Vec::new();
    for chunk in 0..4 {
        let page = search("физика", &filters, chunk * 3, 3, &corpus, &TokenOverlapScorer);
        assert_eq!(page.total_matching, 10);
        stitched.extend(page.items);
    }
    assert_eq!(stitched, full.items);
}

#[test]
fn offset_past_the_end_yields_an_empty_tail() {
    let corpus = corpus();
    let page = search("все программы", &QueryFilters::default(), 50, 10, &corpus, &TokenOverlapScorer);
    assert_eq!(page.total_matching, 3);
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[test]
fn empty_corpus_never_raises() {
    let page = search("математика москва", &QueryFilters::default(), 0, 10, &[], &TokenOverlapScorer);
    assert_eq!(page.total_matching, 0);
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}
