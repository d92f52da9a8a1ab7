//! Synthesizer agent for combining research results into one report.

use salesintel_core::{CombinedReport, ReportSection, ResearchResult};
use tracing::debug;

/// Turns an ordered sequence of results into labelled report sections.
///
/// Each result becomes exactly one section, in input order, with its fields copied
/// verbatim. Field names that appear in more than one section are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesizerAgent;

impl SynthesizerAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize<I>(&self, results: I) -> CombinedReport
    where
        I: IntoIterator<Item = ResearchResult>,
    {
        let sections: Vec<ReportSection> = results.into_iter().map(ReportSection::from).collect();
        debug!(sections = sections.len(), "report synthesized");
        CombinedReport::from_sections(sections)
    }
}
