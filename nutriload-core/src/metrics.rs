use std::sync::OnceLock;

use metrics::{Label, counter, describe_counter};

use crate::stats::{BatchReport, SourceStats};

static METRICS_INIT: OnceLock<bool> = OnceLock::new();

/// Lazily describes all the metrics used in this module once
pub fn lazy_init() {
    METRICS_INIT.get_or_init(|| {
        describe_counter!(
            "nutriload.source.records",
            "records merged into the catalog index"
        );
        describe_counter!(
            "nutriload.source.skipped",
            "lines and records dropped while reading a source"
        );
        describe_counter!("nutriload.load.inserted", "documents inserted into the store");
        describe_counter!("nutriload.load.rejected", "documents rejected by the store");
        true
    });
}

/// Emits the record counts of a finished source pass
pub fn emit_source_stats(stats: &SourceStats) {
    let source = stats
        .kind
        .map_or_else(|| "unknown".to_string(), |kind| kind.to_string());
    let labels = [Label::new("source", source)];

    lazy_init();
    counter!("nutriload.source.records", labels.iter()).increment(stats.applied() as u64);
    counter!("nutriload.source.skipped", labels.iter()).increment(stats.skipped() as u64);
}

/// Emits the document counts of a single batch insert
pub fn emit_batch(report: &BatchReport) {
    lazy_init();
    counter!("nutriload.load.inserted").increment(report.inserted as u64);
    counter!("nutriload.load.rejected").increment(report.rejected.len() as u64);
}
