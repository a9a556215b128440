use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::GeneRecord;
use crate::domain::{FilterConfig, GeneSelection};

/// Significance tag for the full-dataset view. No record is dropped by
/// tagging, only partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regulation {
    Upregulated,
    Downregulated,
    NotSignificant,
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regulation::Upregulated => write!(f, "upregulated"),
            Regulation::Downregulated => write!(f, "downregulated"),
            Regulation::NotSignificant => write!(f, "not-significant"),
        }
    }
}

/// A record paired with its significance tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedGene {
    #[serde(flatten)]
    pub record: GeneRecord,
    pub regulation: Regulation,
}

/// Regulated partitions of one study under one threshold pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegulatedSets {
    pub upregulated: Vec<GeneRecord>,
    pub downregulated: Vec<GeneRecord>,
}

/// Classify a single record against the thresholds.
///
/// The significance test is on the -log10 scale; a NaN `neg_log10_pvalue`
/// fails it, while `+inf` (from `pvalue == 0`) always passes.
pub fn regulation(record: &GeneRecord, cfg: &FilterConfig) -> Regulation {
    if !(record.neg_log10_pvalue >= cfg.significance_threshold) {
        return Regulation::NotSignificant;
    }
    if record.log2_fold_change >= cfg.fold_change_threshold {
        Regulation::Upregulated
    } else if record.log2_fold_change <= -cfg.fold_change_threshold {
        Regulation::Downregulated
    } else {
        Regulation::NotSignificant
    }
}

/// Partition a study's records into up/downregulated sets.
pub fn filter_by_significance(genes: &[GeneRecord], cfg: &FilterConfig) -> RegulatedSets {
    let mut sets = RegulatedSets::default();
    for record in genes {
        match regulation(record, cfg) {
            Regulation::Upregulated => sets.upregulated.push(record.clone()),
            Regulation::Downregulated => sets.downregulated.push(record.clone()),
            Regulation::NotSignificant => {}
        }
    }
    sets
}

/// Tag every record for the full-dataset view.
pub fn tag_all(genes: &[GeneRecord], cfg: &FilterConfig) -> Vec<TaggedGene> {
    genes
        .iter()
        .map(|record| TaggedGene {
            record: record.clone(),
            regulation: regulation(record, cfg),
        })
        .collect()
}

/// Whether a base-study record qualifies under the configured selection.
pub fn passes_selection(record: &GeneRecord, cfg: &FilterConfig) -> bool {
    match (cfg.gene_selection, regulation(record, cfg)) {
        (GeneSelection::All, Regulation::Upregulated | Regulation::Downregulated) => true,
        (GeneSelection::Upregulated, Regulation::Upregulated) => true,
        (GeneSelection::Downregulated, Regulation::Downregulated) => true,
        _ => false,
    }
}
