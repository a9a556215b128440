use assert_matches::assert_matches;

use dge_scope::dataset::{GeneRecord, neg_log10};
use dge_scope::domain::RankMetric;
use dge_scope::enrich::{
    EnrichmentTerm, RawEnrichment, RawResultBlock, build_request, dedup_genes, merge_result,
    rank_terms,
};
use dge_scope::error::ScopeError;

fn record(gene: &str, log2_fold_change: f64) -> GeneRecord {
    GeneRecord {
        gene: gene.to_string(),
        pvalue: 0.001,
        log2_fold_change,
        neg_log10_pvalue: neg_log10(0.001),
        padj: 0.001,
        base_mean: 100.0,
        study: "liver".to_string(),
    }
}

fn term(name: &str, odds_ratio: f64) -> EnrichmentTerm {
    EnrichmentTerm {
        term: name.to_string(),
        overlap: "3/100".to_string(),
        overlap_percent: 3.0,
        p_value: 0.01,
        adj_p_value: 0.05,
        odds_ratio,
        combined_score: 10.0,
        genes: vec!["TP53".to_string()],
        result_type: "GO".to_string(),
        study: "liver".to_string(),
    }
}

#[test]
fn request_builder_dedups_case_sensitively() {
    let up = vec![record("A", 2.0), record("A", 2.1), record("B", 1.5)];
    let down = vec![record("C", -2.0)];
    let request = build_request(&up, &down, 0.05, "GO_Biological_Process_2021");
    assert_eq!(request.upregulated, vec!["A", "B"]);
    assert_eq!(request.downregulated, vec!["C"]);
    assert_eq!(request.cutoff, 0.05);
    assert_eq!(request.gene_set, "GO_Biological_Process_2021");
}

#[test]
fn dedup_is_case_sensitive_identity() {
    let unique = dedup_genes(["Tp53", "TP53", "Tp53"]);
    assert_eq!(unique, vec!["Tp53", "TP53"]);
}

#[test]
fn request_serializes_with_snake_case_gene_set() {
    let request = build_request(&[record("A", 2.0)], &[], 0.05, "KEGG_2021");
    let json = serde_json::to_value(&request).unwrap();
    assert!(json.get("gene_set").is_some());
    assert!(json.get("upregulated").is_some());
}

fn raw_block(terms: &[(&str, f64)]) -> RawResultBlock {
    RawResultBlock {
        term: terms.iter().map(|(t, _)| t.to_string()).collect(),
        overlap: vec!["3/100".to_string(); terms.len()],
        overlap_percent: vec![3.0; terms.len()],
        p_value: vec![0.01; terms.len()],
        adj_p_value: vec![0.05; terms.len()],
        odds_ratio: terms.iter().map(|(_, or)| *or).collect(),
        combined_score: vec![10.0; terms.len()],
        genes: vec![vec!["TP53".to_string()]; terms.len()],
    }
}

#[test]
fn merge_pairs_parallel_arrays_by_index() {
    let mut raw = std::collections::BTreeMap::new();
    raw.insert("GO".to_string(), raw_block(&[("X", 5.0), ("Y", 9.0)]));
    let terms = merge_result(&RawEnrichment(raw), "liver").unwrap();
    assert_eq!(terms.len(), 2);
    assert_eq!(terms[0].term, "X");
    assert_eq!(terms[0].study, "liver");
    assert_eq!(terms[0].result_type, "GO");
    assert_eq!(terms[1].odds_ratio, 9.0);
}

#[test]
fn merge_rejects_mismatched_arrays() {
    let mut block = raw_block(&[("X", 5.0), ("Y", 9.0)]);
    block.odds_ratio.pop();
    let mut raw = std::collections::BTreeMap::new();
    raw.insert("GO".to_string(), block);
    let err = merge_result(&RawEnrichment(raw), "liver").unwrap_err();
    assert_matches!(
        err,
        ScopeError::EnrichShape {
            field: "Odds Ratio",
            expected: 2,
            actual: 1,
            ..
        }
    );
}

#[test]
fn ranking_is_descending_with_stable_ties() {
    let terms = vec![term("X", 5.0), term("Y", 9.0), term("Z", 9.0)];
    let ranked = rank_terms(terms, RankMetric::OddsRatio, 2);
    let names: Vec<&str> = ranked.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(names, vec!["Y", "Z"]);
}

#[test]
fn ranking_truncates_to_top_n() {
    let terms = vec![term("X", 1.0), term("Y", 2.0), term("Z", 3.0)];
    let ranked = rank_terms(terms, RankMetric::OddsRatio, 10);
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].term, "Z");
}

#[test]
fn raw_response_field_names_match_the_api() {
    let payload = r#"{
        "GO_Biological_Process_2021": {
            "Term": ["apoptosis"],
            "Overlap": ["3/100"],
            "Overlap Percent": [3.0],
            "P-value": [0.001],
            "Adjusted P-value": [0.01],
            "Odds Ratio": [4.2],
            "Combined Score": [12.5],
            "Genes": [["TP53", "BAX"]]
        }
    }"#;
    let raw: RawEnrichment = serde_json::from_str(payload).unwrap();
    let terms = merge_result(&raw, "liver").unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].term, "apoptosis");
    assert_eq!(terms[0].genes, vec!["TP53", "BAX"]);
    assert_eq!(terms[0].combined_score, 12.5);
}
