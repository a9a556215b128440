use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::GeneRecord;
use crate::domain::{FilterConfig, OverlapClass};
use crate::filter::passes_selection;

/// A base-study gene tagged with its cross-study overlap classification.
/// Built fresh per classification run, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedGene {
    #[serde(flatten)]
    pub record: GeneRecord,
    #[serde(rename = "type")]
    pub class: OverlapClass,
    #[serde(rename = "overlapSource", skip_serializing_if = "Option::is_none")]
    pub overlap_source: Option<String>,
}

/// How comparison-set membership combines when both sets are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationMode {
    /// Both "must" and "not" sets non-empty: a gene overlaps only if it
    /// appears in both sets.
    And,
    /// Exactly one set non-empty: membership in that set suffices.
    Or,
    /// No comparison sets at all; everything stays `base`.
    None,
}

pub fn combination_mode(must: &[GeneRecord], not: &[GeneRecord]) -> CombinationMode {
    match (must.is_empty(), not.is_empty()) {
        (false, false) => CombinationMode::And,
        (true, true) => CombinationMode::None,
        _ => CombinationMode::Or,
    }
}

/// Classify base-study genes against "must" and "not" comparison studies.
///
/// Output preserves the input order of base genes; qualifying genes with no
/// overlap stay tagged `base`. Genes failing the base selection test are
/// omitted (they were never candidates).
///
/// Two behaviors are carried over from the original dashboard verbatim and
/// are intentionally asymmetric:
/// - membership combines with AND when both comparison sets are non-empty
///   and OR when only one is (see [`CombinationMode`]);
/// - the comparison-side significance check compares the *raw* p-value
///   against the threshold, while the base test uses the -log10 scale.
pub fn classify(
    base: &[GeneRecord],
    must: &[GeneRecord],
    not: &[GeneRecord],
    cfg: &FilterConfig,
) -> Vec<ClassifiedGene> {
    let must_by_gene = index_by_gene(must);
    let not_by_gene = index_by_gene(not);
    let mode = combination_mode(must, not);

    let mut classified = Vec::new();
    for record in base {
        if !passes_selection(record, cfg) {
            continue;
        }

        let in_must = must_by_gene.contains_key(record.gene.as_str());
        let in_not = not_by_gene.contains_key(record.gene.as_str());
        let member = match mode {
            CombinationMode::And => in_must && in_not,
            CombinationMode::Or => in_must || in_not,
            CombinationMode::None => false,
        };

        if !member {
            classified.push(ClassifiedGene {
                record: record.clone(),
                class: OverlapClass::Base,
                overlap_source: None,
            });
            continue;
        }

        let must_sources = matching_sources(
            must_by_gene.get(record.gene.as_str()),
            record.log2_fold_change,
            cfg,
            Direction::Same,
        );
        let not_sources = matching_sources(
            not_by_gene.get(record.gene.as_str()),
            record.log2_fold_change,
            cfg,
            Direction::Opposite,
        );

        let class = match (must_sources.is_empty(), not_sources.is_empty()) {
            (false, false) => OverlapClass::OverlapBoth,
            (false, true) => OverlapClass::OverlapMust,
            (true, false) => OverlapClass::OverlapNot,
            (true, true) => OverlapClass::Base,
        };
        let overlap_source = if class == OverlapClass::Base {
            None
        } else {
            let mut sources = must_sources;
            for study in not_sources {
                if !sources.contains(&study) {
                    sources.push(study);
                }
            }
            Some(sources.join(","))
        };

        classified.push(ClassifiedGene {
            record: record.clone(),
            class,
            overlap_source,
        });
    }
    classified
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Same,
    Opposite,
}

fn index_by_gene(records: &[GeneRecord]) -> HashMap<&str, Vec<&GeneRecord>> {
    let mut map: HashMap<&str, Vec<&GeneRecord>> = HashMap::new();
    for record in records {
        map.entry(record.gene.as_str()).or_default().push(record);
    }
    map
}

/// Studies whose comparison record qualifies against the base gene.
///
/// The significance check here is `pvalue < significance_threshold` on the
/// raw p-value, inherited from the original logic as-is.
fn matching_sources(
    candidates: Option<&Vec<&GeneRecord>>,
    base_fold_change: f64,
    cfg: &FilterConfig,
    direction: Direction,
) -> Vec<String> {
    let Some(candidates) = candidates else {
        return Vec::new();
    };
    let mut sources = Vec::new();
    for candidate in candidates {
        let strong_enough = candidate.log2_fold_change.abs() >= cfg.fold_change_threshold;
        let significant = candidate.pvalue < cfg.significance_threshold;
        let product = base_fold_change * candidate.log2_fold_change;
        let agrees = match direction {
            Direction::Same => product > 0.0,
            Direction::Opposite => product < 0.0,
        };
        if strong_enough && significant && agrees && !sources.contains(&candidate.study) {
            sources.push(candidate.study.clone());
        }
    }
    sources
}
