use serde::{Deserialize, Serialize};

use crate::error::ScopeError;

/// On-the-wire shape of a study file: parallel arrays, one entry per gene.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudyFile {
    pub gene: Vec<String>,
    pub pvalue: Vec<f64>,
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: Vec<f64>,
    pub padj: Vec<f64>,
    #[serde(rename = "baseMean")]
    pub base_mean: Vec<f64>,
}

/// One gene's differential expression result within a study.
///
/// `neg_log10_pvalue` is always derived from `pvalue`, never stored
/// independently. `pvalue == 0` derives to `+inf`, not NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub gene: String,
    pub pvalue: f64,
    #[serde(rename = "log2FoldChange")]
    pub log2_fold_change: f64,
    #[serde(rename = "negLog10PValue")]
    pub neg_log10_pvalue: f64,
    pub padj: f64,
    #[serde(rename = "baseMean")]
    pub base_mean: f64,
    pub study: String,
}

/// `-log10(p)` with the zero edge case pinned to positive infinity.
pub fn neg_log10(pvalue: f64) -> f64 {
    if pvalue == 0.0 {
        f64::INFINITY
    } else {
        -pvalue.log10()
    }
}

/// A study's records, reshaped from parallel arrays into one record per gene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyDataset {
    pub study: String,
    pub records: Vec<GeneRecord>,
}

impl StudyDataset {
    /// Reshape a raw study file. Unequal array lengths are a load-time
    /// error, not silently tolerated.
    pub fn from_file(study: &str, file: StudyFile) -> Result<Self, ScopeError> {
        let expected = file.gene.len();
        let check = |field: &'static str, actual: usize| -> Result<(), ScopeError> {
            if actual != expected {
                return Err(ScopeError::StudyShape {
                    study: study.to_string(),
                    field,
                    expected,
                    actual,
                });
            }
            Ok(())
        };
        check("pvalue", file.pvalue.len())?;
        check("log2FoldChange", file.log2_fold_change.len())?;
        check("padj", file.padj.len())?;
        check("baseMean", file.base_mean.len())?;

        let records = file
            .gene
            .into_iter()
            .zip(file.pvalue)
            .zip(file.log2_fold_change)
            .zip(file.padj)
            .zip(file.base_mean)
            .map(|((((gene, pvalue), log2_fold_change), padj), base_mean)| GeneRecord {
                gene,
                neg_log10_pvalue: neg_log10(pvalue),
                pvalue,
                log2_fold_change,
                padj,
                base_mean,
                study: study.to_string(),
            })
            .collect();

        Ok(Self {
            study: study.to_string(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
