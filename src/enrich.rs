use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::dataset::GeneRecord;
use crate::domain::RankMetric;
use crate::error::ScopeError;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_CUTOFF: f64 = 0.05;

/// Request body for `POST /ea/apply-enrichment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichRequest {
    pub upregulated: Vec<String>,
    pub downregulated: Vec<String>,
    pub cutoff: f64,
    pub gene_set: String,
}

/// Deduplicate gene names case-sensitively, first occurrence wins.
pub fn dedup_genes<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for name in names {
        if seen.insert(name) {
            unique.push(name.to_string());
        }
    }
    unique
}

/// Package regulated gene lists into the shape the enrichment API expects.
pub fn build_request(
    upregulated: &[GeneRecord],
    downregulated: &[GeneRecord],
    cutoff: f64,
    gene_set: &str,
) -> EnrichRequest {
    EnrichRequest {
        upregulated: dedup_genes(upregulated.iter().map(|r| r.gene.as_str())),
        downregulated: dedup_genes(downregulated.iter().map(|r| r.gene.as_str())),
        cutoff,
        gene_set: gene_set.to_string(),
    }
}

/// Raw response: one block of parallel per-term arrays per result type.
/// A `BTreeMap` keeps result-type iteration deterministic.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawEnrichment(pub BTreeMap<String, RawResultBlock>);

#[derive(Debug, Clone, Deserialize)]
pub struct RawResultBlock {
    #[serde(rename = "Term")]
    pub term: Vec<String>,
    #[serde(rename = "Overlap")]
    pub overlap: Vec<String>,
    #[serde(rename = "Overlap Percent")]
    pub overlap_percent: Vec<f64>,
    #[serde(rename = "P-value")]
    pub p_value: Vec<f64>,
    #[serde(rename = "Adjusted P-value")]
    pub adj_p_value: Vec<f64>,
    #[serde(rename = "Odds Ratio")]
    pub odds_ratio: Vec<f64>,
    #[serde(rename = "Combined Score")]
    pub combined_score: Vec<f64>,
    #[serde(rename = "Genes")]
    pub genes: Vec<Vec<String>>,
}

/// One enriched term, paired back with the study and result type that
/// produced it. Treated as immutable input to ranking and plotting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentTerm {
    pub term: String,
    pub overlap: String,
    #[serde(rename = "overlapPercent")]
    pub overlap_percent: f64,
    #[serde(rename = "pValue")]
    pub p_value: f64,
    #[serde(rename = "adjPValue")]
    pub adj_p_value: f64,
    #[serde(rename = "oddsRatio")]
    pub odds_ratio: f64,
    #[serde(rename = "combinedScore")]
    pub combined_score: f64,
    pub genes: Vec<String>,
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub study: String,
}

impl RankMetric {
    pub fn value(&self, term: &EnrichmentTerm) -> f64 {
        match self {
            RankMetric::PValue => term.p_value,
            RankMetric::AdjPValue => term.adj_p_value,
            RankMetric::OddsRatio => term.odds_ratio,
            RankMetric::CombinedScore => term.combined_score,
            RankMetric::OverlapPercent => term.overlap_percent,
        }
    }
}

/// Pair the response's parallel arrays back into per-term records, tagged
/// with the study context. Pairing is strictly by index; unequal lengths
/// within a result type are an error.
pub fn merge_result(raw: &RawEnrichment, study: &str) -> Result<Vec<EnrichmentTerm>, ScopeError> {
    let mut terms = Vec::new();
    for (result_type, block) in &raw.0 {
        let expected = block.term.len();
        let check = |field: &'static str, actual: usize| -> Result<(), ScopeError> {
            if actual != expected {
                return Err(ScopeError::EnrichShape {
                    result_type: result_type.clone(),
                    field,
                    expected,
                    actual,
                });
            }
            Ok(())
        };
        check("Overlap", block.overlap.len())?;
        check("Overlap Percent", block.overlap_percent.len())?;
        check("P-value", block.p_value.len())?;
        check("Adjusted P-value", block.adj_p_value.len())?;
        check("Odds Ratio", block.odds_ratio.len())?;
        check("Combined Score", block.combined_score.len())?;
        check("Genes", block.genes.len())?;

        for index in 0..expected {
            terms.push(EnrichmentTerm {
                term: block.term[index].clone(),
                overlap: block.overlap[index].clone(),
                overlap_percent: block.overlap_percent[index],
                p_value: block.p_value[index],
                adj_p_value: block.adj_p_value[index],
                odds_ratio: block.odds_ratio[index],
                combined_score: block.combined_score[index],
                genes: block.genes[index].clone(),
                result_type: result_type.clone(),
                study: study.to_string(),
            });
        }
    }
    Ok(terms)
}

/// Top-N terms by the selected metric, descending. The sort is stable so
/// ties keep input order.
pub fn rank_terms(
    mut terms: Vec<EnrichmentTerm>,
    metric: RankMetric,
    top_n: usize,
) -> Vec<EnrichmentTerm> {
    terms.sort_by(|a, b| {
        metric
            .value(b)
            .partial_cmp(&metric.value(a))
            .unwrap_or(Ordering::Equal)
    });
    terms.truncate(top_n);
    terms
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneSetCatalog {
    pub gene_sets: Vec<String>,
}

/// Remote enrichment-analysis service.
pub trait EnrichClient: Send + Sync {
    fn apply_enrichment(&self, request: &EnrichRequest) -> Result<RawEnrichment, ScopeError>;
    fn gene_sets(&self) -> Result<Vec<String>, ScopeError>;
}

#[derive(Clone)]
pub struct EnrichHttpClient {
    client: Client,
    base_url: String,
}

impl EnrichHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ScopeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("dge-scope/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ScopeError::EnrichHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ScopeError::EnrichHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl EnrichClient for EnrichHttpClient {
    fn apply_enrichment(&self, request: &EnrichRequest) -> Result<RawEnrichment, ScopeError> {
        let url = format!("{}/ea/apply-enrichment", self.base_url);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .map_err(|err| ScopeError::EnrichHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "enrichment request failed".to_string());
            return Err(ScopeError::EnrichStatus { status, message });
        }
        response
            .json::<RawEnrichment>()
            .map_err(|err| ScopeError::EnrichParse(err.to_string()))
    }

    fn gene_sets(&self) -> Result<Vec<String>, ScopeError> {
        let url = format!("{}/ea/filters", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ScopeError::EnrichHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "gene-set catalog request failed".to_string());
            return Err(ScopeError::EnrichStatus { status, message });
        }
        let catalog = response
            .json::<GeneSetCatalog>()
            .map_err(|err| ScopeError::EnrichParse(err.to_string()))?;
        Ok(catalog.gene_sets)
    }
}
