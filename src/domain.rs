use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScopeError;

/// Name of a study as it appears in the study file URL, e.g.
/// `GET /studies/{name}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyName(String);

impl StudyName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudyName {
    type Err = ScopeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !is_valid {
            return Err(ScopeError::InvalidStudyName(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Which study file collection a name resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StudyKind {
    Study,
    Processed,
}

impl StudyKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            StudyKind::Study => "studies",
            StudyKind::Processed => "processed",
        }
    }
}

impl fmt::Display for StudyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyKind::Study => write!(f, "study"),
            StudyKind::Processed => write!(f, "processed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneSelection {
    All,
    Upregulated,
    Downregulated,
}

impl fmt::Display for GeneSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneSelection::All => write!(f, "all"),
            GeneSelection::Upregulated => write!(f, "upregulated"),
            GeneSelection::Downregulated => write!(f, "downregulated"),
        }
    }
}

/// Overlap classification of a base-study gene against comparison studies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapClass {
    Base,
    OverlapMust,
    OverlapNot,
    OverlapBoth,
}

impl fmt::Display for OverlapClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapClass::Base => write!(f, "base"),
            OverlapClass::OverlapMust => write!(f, "overlap-must"),
            OverlapClass::OverlapNot => write!(f, "overlap-not"),
            OverlapClass::OverlapBoth => write!(f, "overlap-both"),
        }
    }
}

/// Metric used to rank enrichment terms; ranking is always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RankMetric {
    PValue,
    AdjPValue,
    OddsRatio,
    CombinedScore,
    OverlapPercent,
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMetric::PValue => write!(f, "p-value"),
            RankMetric::AdjPValue => write!(f, "adj-p-value"),
            RankMetric::OddsRatio => write!(f, "odds-ratio"),
            RankMetric::CombinedScore => write!(f, "combined-score"),
            RankMetric::OverlapPercent => write!(f, "overlap-percent"),
        }
    }
}

/// User-chosen thresholds, read-only to the filter and classifier.
///
/// `significance_threshold` is on the -log10(p-value) scale;
/// `fold_change_threshold` applies symmetrically to log2 fold change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub significance_threshold: f64,
    pub fold_change_threshold: f64,
    pub gene_selection: GeneSelection,
}

impl FilterConfig {
    pub fn new(
        significance_threshold: f64,
        fold_change_threshold: f64,
        gene_selection: GeneSelection,
    ) -> Result<Self, ScopeError> {
        if !significance_threshold.is_finite() || significance_threshold < 0.0 {
            return Err(ScopeError::InvalidThreshold(format!(
                "significance threshold must be finite and >= 0, got {significance_threshold}"
            )));
        }
        if !fold_change_threshold.is_finite() || fold_change_threshold < 0.0 {
            return Err(ScopeError::InvalidThreshold(format!(
                "fold-change threshold must be finite and >= 0, got {fold_change_threshold}"
            )));
        }
        Ok(Self {
            significance_threshold,
            fold_change_threshold,
            gene_selection,
        })
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 1.3,
            fold_change_threshold: 1.0,
            gene_selection: GeneSelection::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_study_name_valid() {
        let name: StudyName = " tabula-muris_liver.v2 ".parse().unwrap();
        assert_eq!(name.as_str(), "tabula-muris_liver.v2");
    }

    #[test]
    fn parse_study_name_invalid() {
        let err = "../escape".parse::<StudyName>().unwrap_err();
        assert_matches!(err, ScopeError::InvalidStudyName(_));
        let err = "".parse::<StudyName>().unwrap_err();
        assert_matches!(err, ScopeError::InvalidStudyName(_));
    }

    #[test]
    fn study_kind_path_segments() {
        assert_eq!(StudyKind::Study.path_segment(), "studies");
        assert_eq!(StudyKind::Processed.path_segment(), "processed");
    }

    #[test]
    fn filter_config_rejects_negative_thresholds() {
        let err = FilterConfig::new(-1.0, 0.5, GeneSelection::All).unwrap_err();
        assert_matches!(err, ScopeError::InvalidThreshold(_));
        let err = FilterConfig::new(1.0, f64::NAN, GeneSelection::All).unwrap_err();
        assert_matches!(err, ScopeError::InvalidThreshold(_));
    }

    #[test]
    fn filter_config_zero_thresholds_are_permissive() {
        let cfg = FilterConfig::new(0.0, 0.0, GeneSelection::All).unwrap();
        assert_eq!(cfg.significance_threshold, 0.0);
        assert_eq!(cfg.fold_change_threshold, 0.0);
    }
}
