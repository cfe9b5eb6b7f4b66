//! mongotel-core - metric synthesis from MongoDB diagnostic documents.
//!
//! Provides:
//! - `document` - in-memory document model, Extended JSON decoding
//! - `metric` - raw metric model, label sets, topology labels
//! - `flatten` - document flattener and field name normalizer
//! - `convert` - conversion rule table, legacy compatibility translator,
//!   lock-metric extraction
//! - `source` - document source abstraction (file, reader, static)
//! - `pipeline` - flatten + compatibility for one scrape
//! - `exposition` - Prometheus text rendering
//!
//! ```text
//! DocumentSource ──► Document ──► Pipeline ──► Scrape ──► exposition::render
//!                                   │
//!                    FlattenOptions ┘ RuleTable (compat mode)
//! ```

pub mod convert;
pub mod document;
pub mod exposition;
pub mod flatten;
pub mod metric;
pub mod pipeline;
pub mod source;

pub use convert::{RuleTable, translate};
pub use document::{Document, Value};
pub use flatten::{FlattenOptions, Flattener};
pub use metric::{InvalidMetric, LabelSet, RawMetric, TopologyLabels, ValueKind};
pub use pipeline::{Pipeline, Scrape};
