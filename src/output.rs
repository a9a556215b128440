use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    ClassifyResult, EnrichResult, FilterResult, GeneSetsResult, SummaryResult,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_filter(result: &FilterResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_classify(result: &ClassifyResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_enrich(result: &EnrichResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_gene_sets(result: &GeneSetsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_summary(result: &SummaryResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}

/// Forwards progress events to tracing; used by the interactive path where
/// stdout is reserved for the viewer.
pub struct TraceSink;

impl crate::app::ProgressSink for TraceSink {
    fn event(&self, event: crate::app::ProgressEvent) {
        tracing::info!("{}", event.message);
    }
}
