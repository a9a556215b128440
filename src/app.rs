use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::cache::{CacheStats, StudyCache};
use crate::dataset::StudyDataset;
use crate::domain::{FilterConfig, RankMetric, StudyKind, StudyName};
use crate::enrich::{EnrichClient, EnrichmentTerm, build_request, merge_result, rank_terms};
use crate::error::ScopeError;
use crate::filter::{TaggedGene, filter_by_significance, tag_all};
use crate::overlap::{ClassifiedGene, CombinationMode, classify, combination_mode};
use crate::studies::StudyClient;

/// Fixed pacing between sequential enrichment requests. Not a rate-limit
/// algorithm, just the original inter-request delay.
pub const ENRICH_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub study: String,
    pub config: FilterConfig,
    pub total: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub genes: Vec<TaggedGene>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    pub base_study: String,
    pub must_studies: Vec<String>,
    pub not_studies: Vec<String>,
    pub combination_mode: CombinationMode,
    pub config: FilterConfig,
    pub skipped_studies: Vec<String>,
    pub genes: Vec<ClassifiedGene>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichResult {
    pub gene_set: String,
    pub cutoff: f64,
    pub metric: RankMetric,
    pub top_n: usize,
    pub items: Vec<EnrichItemResult>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichItemResult {
    pub study: String,
    pub upregulated: usize,
    pub downregulated: usize,
    pub terms: Vec<EnrichmentTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneSetsResult {
    pub gene_sets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub config: FilterConfig,
    pub studies: Vec<StudySummary>,
    pub cache: CacheStats,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub study: String,
    pub kind: StudyKind,
    pub genes: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct App<S: StudyClient, E: EnrichClient> {
    studies: S,
    enrich: E,
    cache: Mutex<StudyCache>,
}

impl<S: StudyClient, E: EnrichClient> App<S, E> {
    pub fn new(studies: S, enrich: E) -> Self {
        Self {
            studies,
            enrich,
            cache: Mutex::new(StudyCache::new()),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().expect("cache lock poisoned").stats()
    }

    fn load(&self, name: &StudyName, kind: StudyKind) -> Result<StudyDataset, ScopeError> {
        let mut cache = self.cache.lock().expect("cache lock poisoned");
        cache.get_or_fetch(&self.studies, name, kind)
    }

    /// Load one study and tag every record against the thresholds.
    pub fn filter(
        &self,
        name: &StudyName,
        kind: StudyKind,
        cfg: &FilterConfig,
        sink: &dyn ProgressSink,
    ) -> Result<FilterResult, ScopeError> {
        sink.event(ProgressEvent {
            message: format!("phase=Load; study {name}"),
            elapsed: None,
        });
        let dataset = self.load(name, kind)?;

        sink.event(ProgressEvent {
            message: "phase=Filter; applying thresholds".to_string(),
            elapsed: None,
        });
        let tagged = tag_all(&dataset.records, cfg);
        let sets = filter_by_significance(&dataset.records, cfg);

        Ok(FilterResult {
            study: name.as_str().to_string(),
            config: *cfg,
            total: dataset.len(),
            upregulated: sets.upregulated.len(),
            downregulated: sets.downregulated.len(),
            genes: tagged,
            generated_at: iso_timestamp(),
        })
    }

    /// Classify the base study's genes against must/not comparison studies.
    ///
    /// A comparison study that fails to load is logged and skipped; only a
    /// missing base study is fatal.
    pub fn classify(
        &self,
        base: &StudyName,
        kind: StudyKind,
        must: &[StudyName],
        not: &[StudyName],
        cfg: &FilterConfig,
        sink: &dyn ProgressSink,
    ) -> Result<ClassifyResult, ScopeError> {
        sink.event(ProgressEvent {
            message: format!("phase=Load; base study {base}"),
            elapsed: None,
        });
        let base_dataset = self.load(base, kind)?;

        let mut skipped = Vec::new();
        let mut load_group = |names: &[StudyName]| -> Vec<crate::dataset::GeneRecord> {
            let mut records = Vec::new();
            for name in names {
                sink.event(ProgressEvent {
                    message: format!("phase=Load; comparison study {name}"),
                    elapsed: None,
                });
                match self.load(name, kind) {
                    Ok(dataset) => records.extend(dataset.records),
                    Err(err) => {
                        warn!(study = %name, error = %err, "skipping comparison study");
                        skipped.push(name.as_str().to_string());
                    }
                }
            }
            records
        };
        let must_records = load_group(must);
        let not_records = load_group(not);

        sink.event(ProgressEvent {
            message: "phase=Classify; computing overlaps".to_string(),
            elapsed: None,
        });
        let mode = combination_mode(&must_records, &not_records);
        let genes = classify(&base_dataset.records, &must_records, &not_records, cfg);

        Ok(ClassifyResult {
            base_study: base.as_str().to_string(),
            must_studies: must.iter().map(|n| n.as_str().to_string()).collect(),
            not_studies: not.iter().map(|n| n.as_str().to_string()).collect(),
            combination_mode: mode,
            config: *cfg,
            skipped_studies: skipped,
            genes,
            generated_at: iso_timestamp(),
        })
    }

    /// Run enrichment for each study strictly sequentially with fixed
    /// pacing. A failure for one study becomes that item's error marker;
    /// remaining studies still run. Nothing is retried.
    pub fn enrich(
        &self,
        studies: &[(StudyName, StudyKind)],
        cfg: &FilterConfig,
        gene_set: &str,
        cutoff: f64,
        metric: RankMetric,
        top_n: usize,
        sink: &dyn ProgressSink,
    ) -> Result<EnrichResult, ScopeError> {
        let mut items = Vec::new();
        for (index, (name, kind)) in studies.iter().enumerate() {
            if index > 0 {
                std::thread::sleep(ENRICH_PACING);
            }
            sink.event(ProgressEvent {
                message: format!("phase=Enrich; study {name}"),
                elapsed: None,
            });
            items.push(self.enrich_single(name, *kind, cfg, gene_set, cutoff, metric, top_n));
        }

        Ok(EnrichResult {
            gene_set: gene_set.to_string(),
            cutoff,
            metric,
            top_n,
            items,
            generated_at: iso_timestamp(),
        })
    }

    fn enrich_single(
        &self,
        name: &StudyName,
        kind: StudyKind,
        cfg: &FilterConfig,
        gene_set: &str,
        cutoff: f64,
        metric: RankMetric,
        top_n: usize,
    ) -> EnrichItemResult {
        match self.try_enrich_single(name, kind, cfg, gene_set, cutoff, metric, top_n) {
            Ok(item) => item,
            Err(err) => {
                warn!(study = %name, error = %err, "enrichment failed for study");
                EnrichItemResult {
                    study: name.as_str().to_string(),
                    upregulated: 0,
                    downregulated: 0,
                    terms: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn try_enrich_single(
        &self,
        name: &StudyName,
        kind: StudyKind,
        cfg: &FilterConfig,
        gene_set: &str,
        cutoff: f64,
        metric: RankMetric,
        top_n: usize,
    ) -> Result<EnrichItemResult, ScopeError> {
        let dataset = self.load(name, kind)?;
        let sets = filter_by_significance(&dataset.records, cfg);
        let request = build_request(&sets.upregulated, &sets.downregulated, cutoff, gene_set);
        let raw = self.enrich.apply_enrichment(&request)?;
        let terms = merge_result(&raw, name.as_str())?;
        Ok(EnrichItemResult {
            study: name.as_str().to_string(),
            upregulated: request.upregulated.len(),
            downregulated: request.downregulated.len(),
            terms: rank_terms(terms, metric, top_n),
            error: None,
        })
    }

    pub fn gene_sets(&self, sink: &dyn ProgressSink) -> Result<GeneSetsResult, ScopeError> {
        sink.event(ProgressEvent {
            message: "phase=Enrich; fetching gene-set catalog".to_string(),
            elapsed: None,
        });
        let gene_sets = self.enrich.gene_sets()?;
        Ok(GeneSetsResult { gene_sets })
    }

    /// Per-study record and regulated counts for the configured studies.
    /// Load failures are per-study markers, never fatal to the summary.
    pub fn summary(
        &self,
        studies: &[(StudyName, StudyKind)],
        cfg: &FilterConfig,
        sink: &dyn ProgressSink,
    ) -> Result<SummaryResult, ScopeError> {
        let mut rows = Vec::new();
        for (name, kind) in studies {
            sink.event(ProgressEvent {
                message: format!("phase=Load; study {name}"),
                elapsed: None,
            });
            match self.load(name, *kind) {
                Ok(dataset) => {
                    let sets = filter_by_significance(&dataset.records, cfg);
                    rows.push(StudySummary {
                        study: name.as_str().to_string(),
                        kind: *kind,
                        genes: dataset.len(),
                        upregulated: sets.upregulated.len(),
                        downregulated: sets.downregulated.len(),
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(study = %name, error = %err, "excluding study from summary");
                    rows.push(StudySummary {
                        study: name.as_str().to_string(),
                        kind: *kind,
                        genes: 0,
                        upregulated: 0,
                        downregulated: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        Ok(SummaryResult {
            config: *cfg,
            studies: rows,
            cache: self.cache_stats(),
            generated_at: iso_timestamp(),
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
