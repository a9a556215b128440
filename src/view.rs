use serde::Serialize;

use crate::domain::{OverlapClass, RankMetric};
use crate::enrich::EnrichmentTerm;
use crate::filter::{Regulation, TaggedGene};
use crate::overlap::ClassifiedGene;

/// Drawing cap for the -log10 axis; `pvalue == 0` records keep their
/// infinite significance in data, the view just pins them to the top.
pub const NEG_LOG10_CAP: f64 = 300.0;

/// One marker on the volcano plot: x is log2 fold change, y is clamped
/// -log10(p).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolcanoPoint {
    pub gene: String,
    pub x: f64,
    pub y: f64,
    pub series: VolcanoSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolcanoSeries {
    Upregulated,
    Downregulated,
    NotSignificant,
    Base,
    OverlapMust,
    OverlapNot,
    OverlapBoth,
}

fn clamp_y(neg_log10_pvalue: f64) -> f64 {
    if neg_log10_pvalue.is_nan() {
        0.0
    } else {
        neg_log10_pvalue.min(NEG_LOG10_CAP)
    }
}

pub fn volcano_points(tagged: &[TaggedGene]) -> Vec<VolcanoPoint> {
    tagged
        .iter()
        .map(|gene| VolcanoPoint {
            gene: gene.record.gene.clone(),
            x: gene.record.log2_fold_change,
            y: clamp_y(gene.record.neg_log10_pvalue),
            series: match gene.regulation {
                Regulation::Upregulated => VolcanoSeries::Upregulated,
                Regulation::Downregulated => VolcanoSeries::Downregulated,
                Regulation::NotSignificant => VolcanoSeries::NotSignificant,
            },
        })
        .collect()
}

pub fn classified_points(genes: &[ClassifiedGene]) -> Vec<VolcanoPoint> {
    genes
        .iter()
        .map(|gene| VolcanoPoint {
            gene: gene.record.gene.clone(),
            x: gene.record.log2_fold_change,
            y: clamp_y(gene.record.neg_log10_pvalue),
            series: match gene.class {
                OverlapClass::Base => VolcanoSeries::Base,
                OverlapClass::OverlapMust => VolcanoSeries::OverlapMust,
                OverlapClass::OverlapNot => VolcanoSeries::OverlapNot,
                OverlapClass::OverlapBoth => VolcanoSeries::OverlapBoth,
            },
        })
        .collect()
}

/// One dot on the enrichment dot plot: sized by overlap percent, colored by
/// the ranking metric's value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotPlotRow {
    pub term: String,
    pub study: String,
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub size: f64,
    pub value: f64,
    #[serde(rename = "geneCount")]
    pub gene_count: usize,
}

pub fn dot_plot_rows(terms: &[EnrichmentTerm], metric: RankMetric) -> Vec<DotPlotRow> {
    terms
        .iter()
        .map(|term| DotPlotRow {
            term: term.term.clone(),
            study: term.study.clone(),
            result_type: term.result_type.clone(),
            size: term.overlap_percent,
            value: metric.value(term),
            gene_count: term.genes.len(),
        })
        .collect()
}

/// Preformatted table row for the classified-gene grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneRow {
    pub gene: String,
    pub log2_fold_change: String,
    pub pvalue: String,
    pub padj: String,
    pub class: String,
    pub source: String,
}

pub fn gene_table_rows(genes: &[ClassifiedGene]) -> Vec<GeneRow> {
    genes
        .iter()
        .map(|gene| GeneRow {
            gene: gene.record.gene.clone(),
            log2_fold_change: format!("{:.3}", gene.record.log2_fold_change),
            pvalue: format!("{:.3e}", gene.record.pvalue),
            padj: format!("{:.3e}", gene.record.padj),
            class: gene.class.to_string(),
            source: gene.overlap_source.clone().unwrap_or_default(),
        })
        .collect()
}
