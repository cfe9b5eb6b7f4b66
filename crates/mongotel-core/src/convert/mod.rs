//! Compatibility translator: derives legacy-named metrics from current ones.
//!
//! Matching per input metric:
//! 1. Direct rule indexed by the metric name. At most one applies.
//! 2. Only if no Direct rule matched: every PrefixSuffix rule whose prefix
//!    is a prefix of the name, in declaration order. Several rules may share a
//!    prefix to fan one metric out into several legacy families.
//! 3. Neither: the metric has no legacy equivalent and yields nothing.
//!
//! The result holds only the additional legacy metrics; callers concatenate
//! it with the input.

mod legacy;
mod locks;
mod rules;

use std::collections::HashSet;

use tracing::debug;

use crate::metric::{MetricError, RawMetric};

pub use locks::{extract_explicit, extract_lock_metrics};
pub use rules::{
    ConversionRule, DirectRule, ExplicitPathRule, PrefixSuffixRule, RuleError, RuleTable,
};

/// Translates `metrics` with `table`, returning only the derived legacy metrics.
///
/// Output order: for each input in order, its Direct result or its
/// PrefixSuffix results. Duplicates by (name, labels) are dropped.
pub fn translate(metrics: &[RawMetric], table: &RuleTable) -> Vec<RawMetric> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    let mut emit = |result: Result<RawMetric, MetricError>, source: &RawMetric| match result {
        Ok(metric) => {
            if seen.insert(metric.identity()) {
                out.push(metric);
            } else {
                debug!(metric = %metric.name(), source = %source.name(), "duplicate legacy metric dropped");
            }
        }
        Err(error) => {
            debug!(source = %source.name(), error = %error, "legacy conversion failed");
        }
    };

    for metric in metrics {
        if let Some(rule) = table.direct(metric.name()) {
            emit(apply_direct(metric, rule), metric);
            continue;
        }

        for rule in table.prefix_suffix_rules() {
            if let Some(suffix) = match_prefix(metric.name(), &rule.prefix) {
                emit(apply_prefix_suffix(metric, rule, suffix), metric);
            }
        }
    }

    out
}

/// Renames `metric` per a Direct rule. Value and kind are copied.
pub fn apply_direct(metric: &RawMetric, rule: &DirectRule) -> Result<RawMetric, MetricError> {
    let names = metric
        .label_names()
        .iter()
        .map(|n| rule.label_name_map.get(n).unwrap_or(n).clone())
        .collect();
    let values = metric
        .label_values()
        .iter()
        .map(|v| rule.label_value_map.get(v).unwrap_or(v).clone())
        .collect();
    RawMetric::new(
        rule.old_name.as_str(),
        metric.help(),
        names,
        values,
        metric.value(),
        metric.kind(),
    )
}

/// Emits `metric` as `rule.old_name` with the (mapped) suffix as a label.
///
/// The input's labels are kept; the suffix label replaces a label of the
/// same name.
pub fn apply_prefix_suffix(
    metric: &RawMetric,
    rule: &PrefixSuffixRule,
    suffix: &str,
) -> Result<RawMetric, MetricError> {
    let value = rule
        .suffix_value_map
        .get(suffix)
        .map(String::as_str)
        .unwrap_or(suffix);
    let mut labels = metric.label_set();
    labels.insert(rule.suffix_label.as_str(), value);
    RawMetric::with_labels(
        rule.old_name.as_str(),
        metric.help(),
        &labels,
        metric.value(),
        metric.kind(),
    )
}

/// Returns the rest of `name` after `prefix`, with one leading `_` trimmed.
///
/// Any plain prefix matches: `mongodb_ss_mem` covers `mongodb_ss_mem_resident`
/// (suffix `resident`), `mongodb_ss_memory` (suffix `ory`) and
/// `mongodb_ss_mem` itself (empty suffix).
fn match_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    Some(rest.strip_prefix('_').unwrap_or(rest))
}
