//! One scrape: document in, metrics out.
//!
//! ```text
//! Document ──► Flattener ──► metrics ─┬──────────────────────────────► combined
//!                                     └─► translate (compat mode) ──►
//! Document ──► explicit-path rules (compat mode) ───────────────────►
//! ```
//!
//! The combined set is de-duplicated by (name, labels) so the exposition
//! layer never receives two samples with the same identity.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::convert::{RuleTable, extract_explicit, translate};
use crate::document::Document;
use crate::flatten::{FlattenOptions, Flattener};
use crate::metric::{InvalidMetric, LabelSet, RawMetric, Sample};

/// Result of a scrape.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    pub metrics: Vec<RawMetric>,
    pub invalid: Vec<InvalidMetric>,
}

impl Scrape {
    fn push_samples(&mut self, samples: Vec<Sample>) {
        for sample in samples {
            match sample {
                Ok(metric) => self.metrics.push(metric),
                Err(invalid) => self.invalid.push(invalid),
            }
        }
    }
}

/// Flatten + optional legacy translation, bound to caller-owned configuration.
pub struct Pipeline<'a> {
    flattener: Flattener<'a>,
    labels: &'a LabelSet,
    compatibility: Option<&'a RuleTable>,
}

impl<'a> Pipeline<'a> {
    pub fn new(options: &'a FlattenOptions, prefix: &str, labels: &'a LabelSet) -> Self {
        Self {
            flattener: Flattener::new(options, prefix, labels),
            labels,
            compatibility: None,
        }
    }

    /// Enables compatibility mode: legacy metrics are derived with `table`.
    pub fn with_compatibility(mut self, table: &'a RuleTable) -> Self {
        self.compatibility = Some(table);
        self
    }

    pub fn compatibility_enabled(&self) -> bool {
        self.compatibility.is_some()
    }

    pub fn run(&self, doc: &Document) -> Scrape {
        let mut scrape = Scrape::default();
        scrape.push_samples(self.flattener.flatten(doc));
        let flattened = scrape.metrics.len();

        if let Some(table) = self.compatibility {
            let legacy = translate(&scrape.metrics, table);
            let translated = legacy.len();
            scrape.metrics.extend(legacy);
            scrape.push_samples(extract_explicit(doc, table, self.labels));
            debug!(
                flattened,
                translated,
                explicit = scrape.metrics.len() - flattened - translated,
                "compatibility metrics derived"
            );
        }

        dedup(&mut scrape.metrics);
        if !scrape.invalid.is_empty() {
            debug!(count = scrape.invalid.len(), "scrape produced invalid metrics");
        }
        scrape
    }
}

/// Keeps the first metric of every (name, labels) identity.
fn dedup(metrics: &mut Vec<RawMetric>) {
    let mut seen = HashSet::with_capacity(metrics.len());
    metrics.retain(|m| {
        let fresh = seen.insert(m.identity());
        if !fresh {
            warn!(metric = %m.name(), "dropping duplicate metric");
        }
        fresh
    });
}
