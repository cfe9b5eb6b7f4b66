//! Lock-metric extraction by explicit document paths.
//!
//! `serverStatus.locks` is keyed by resource name and then by lock mode
//! (`locks.Global.acquireCount.r`). The legacy families carry resource and
//! mode as labels, which cannot be recovered from a flattened name, so
//! these metrics are read directly from fixed paths.

use tracing::debug;

use crate::document::{Document, Value};
use crate::metric::{InvalidMetric, LabelSet, MetricError, RawMetric, Sample, ValueKind};

use super::rules::{ConversionRule, RuleTable};

type LockMetric = (&'static str, &'static [&'static str], &'static [(&'static str, &'static str)]);

const ACQUIRE_COUNT: &str = "mongodb_ss_locks_acquireCount";
const ACQUIRE_WAIT_COUNT: &str = "mongodb_ss_locks_acquireWaitCount";
const TIME_ACQUIRING: &str = "mongodb_ss_locks_timeAcquiringMicros";
const GLOBAL_TIME_ACQUIRING: &str = "mongodb_mongod_locks_time_acquiring_global_microseconds_total";

#[rustfmt::skip]
const LOCK_METRICS: &[LockMetric] = &[
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Global", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "Global")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Global", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "Global")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Global", "acquireCount", "R"], &[("lock_mode", "R"), ("resource", "Global")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Global", "acquireCount", "W"], &[("lock_mode", "W"), ("resource", "Global")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Database", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "Database")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Database", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "Database")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Database", "acquireCount", "R"], &[("lock_mode", "R"), ("resource", "Database")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Database", "acquireCount", "W"], &[("lock_mode", "W"), ("resource", "Database")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Collection", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "Collection")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Collection", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "Collection")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Collection", "acquireCount", "R"], &[("lock_mode", "R"), ("resource", "Collection")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Collection", "acquireCount", "W"], &[("lock_mode", "W"), ("resource", "Collection")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "ParallelBatchWriterMode", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "ParallelBatchWriterMode")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "ParallelBatchWriterMode", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "ParallelBatchWriterMode")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "ParallelBatchWriterMode", "acquireCount", "W"], &[("lock_mode", "W"), ("resource", "ParallelBatchWriterMode")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "ReplicationStateTransition", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "ReplicationStateTransition")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "ReplicationStateTransition", "acquireCount", "W"], &[("lock_mode", "W"), ("resource", "ReplicationStateTransition")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "Mutex", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "Mutex")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "oplog", "acquireCount", "r"], &[("lock_mode", "r"), ("resource", "oplog")]),
    (ACQUIRE_COUNT, &["serverStatus", "locks", "oplog", "acquireCount", "w"], &[("lock_mode", "w"), ("resource", "oplog")]),
    (ACQUIRE_WAIT_COUNT, &["serverStatus", "locks", "Global", "acquireWaitCount", "r"], &[("lock_mode", "r"), ("resource", "Global")]),
    (ACQUIRE_WAIT_COUNT, &["serverStatus", "locks", "Global", "acquireWaitCount", "w"], &[("lock_mode", "w"), ("resource", "Global")]),
    (ACQUIRE_WAIT_COUNT, &["serverStatus", "locks", "Global", "acquireWaitCount", "W"], &[("lock_mode", "W"), ("resource", "Global")]),
    (ACQUIRE_WAIT_COUNT, &["serverStatus", "locks", "Database", "acquireWaitCount", "w"], &[("lock_mode", "w"), ("resource", "Database")]),
    (ACQUIRE_WAIT_COUNT, &["serverStatus", "locks", "Collection", "acquireWaitCount", "w"], &[("lock_mode", "w"), ("resource", "Collection")]),
    (TIME_ACQUIRING, &["serverStatus", "locks", "Global", "timeAcquiringMicros", "r"], &[("lock_mode", "r"), ("resource", "Global")]),
    (TIME_ACQUIRING, &["serverStatus", "locks", "Global", "timeAcquiringMicros", "w"], &[("lock_mode", "w"), ("resource", "Global")]),
    (TIME_ACQUIRING, &["serverStatus", "locks", "Global", "timeAcquiringMicros", "W"], &[("lock_mode", "W"), ("resource", "Global")]),
    (TIME_ACQUIRING, &["serverStatus", "locks", "Database", "timeAcquiringMicros", "w"], &[("lock_mode", "w"), ("resource", "Database")]),
    (TIME_ACQUIRING, &["serverStatus", "locks", "Collection", "timeAcquiringMicros", "w"], &[("lock_mode", "w"), ("resource", "Collection")]),
    (GLOBAL_TIME_ACQUIRING, &["serverStatus", "locks", "Global", "timeAcquiringMicros", "r"], &[("type", "read")]),
    (GLOBAL_TIME_ACQUIRING, &["serverStatus", "locks", "Global", "timeAcquiringMicros", "w"], &[("type", "write")]),
];

/// The lock metrics as ExplicitPath rules, for inclusion in a [`RuleTable`].
pub(crate) fn lock_rules() -> Vec<ConversionRule> {
    LOCK_METRICS
        .iter()
        .map(|&(name, path, labels)| ConversionRule::explicit_path(name, path, labels))
        .collect()
}

/// Extracts the built-in lock metrics from a diagnostic document.
///
/// Metrics carry only their static labels.
pub fn extract_lock_metrics(doc: &Document) -> Vec<Sample> {
    let base = LabelSet::new();
    LOCK_METRICS
        .iter()
        .filter_map(|&(name, path, labels)| {
            let labels: LabelSet = labels.iter().copied().collect();
            extract_one(doc, name, path, &labels, &base)
        })
        .collect()
}

/// Applies every ExplicitPath rule of `table` to `doc`.
///
/// `base` labels are attached to each metric; a rule's static labels win
/// over base labels of the same name.
pub fn extract_explicit(doc: &Document, table: &RuleTable, base: &LabelSet) -> Vec<Sample> {
    table
        .explicit_rules()
        .iter()
        .filter_map(|rule| {
            let labels: LabelSet = rule.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            extract_one(doc, &rule.name, rule.path.as_slice(), &labels, base)
        })
        .collect()
}

/// Missing path -> `None`; numeric -> metric; anything else -> marker.
fn extract_one<S: AsRef<str>>(
    doc: &Document,
    name: &str,
    path: &[S],
    labels: &LabelSet,
    base: &LabelSet,
) -> Option<Sample> {
    let value = doc.get_path(path)?;

    let Some(number) = value.as_f64() else {
        let error = match value {
            Value::Malformed { message, .. } => MetricError::Malformed(message.clone()),
            other => MetricError::NotNumeric(other.kind()),
        };
        debug!(metric = %name, error = %error, "invalid lock metric");
        return Some(Err(InvalidMetric::new(name, error)));
    };

    let labels = base.merged(labels);
    Some(
        RawMetric::with_labels(name, name, &labels, number, ValueKind::Untyped)
            .map_err(|error| InvalidMetric::new(name, error)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        Document::from_json(&json).unwrap()
    }

    #[test]
    fn test_global_acquire_count() {
        let d = doc(json!({"serverStatus": {"locks": {"Global": {"acquireCount": {"r": 7}}}}}));
        let samples = extract_lock_metrics(&d);
        assert_eq!(samples.len(), 1);
        let m = samples[0].as_ref().unwrap();
        assert_eq!(m.name(), "mongodb_ss_locks_acquireCount");
        assert_eq!(m.label("lock_mode"), Some("r"));
        assert_eq!(m.label("resource"), Some("Global"));
        assert_eq!(m.label_names().len(), 2);
        assert_eq!(m.value(), 7.0);
    }

    #[test]
    fn test_missing_paths_are_skipped() {
        assert!(extract_lock_metrics(&Document::new()).is_empty());
        let d = doc(json!({"serverStatus": {"locks": "disabled"}}));
        assert!(extract_lock_metrics(&d).is_empty());
    }

    #[test]
    fn test_non_numeric_terminal_is_marked_invalid() {
        let d = doc(json!({"serverStatus": {"locks": {"Mutex": {"acquireCount": {"r": "many"}}}}}));
        let samples = extract_lock_metrics(&d);
        assert_eq!(samples.len(), 1);
        let err = samples[0].as_ref().unwrap_err();
        assert_eq!(err.name, "mongodb_ss_locks_acquireCount");
        assert_eq!(err.error, MetricError::NotNumeric("string"));
    }

    #[test]
    fn test_malformed_terminal_is_marked_invalid() {
        let d = doc(json!({"serverStatus": {"locks": {
            "Global": {"acquireCount": {"r": {"$numberLong": "lots"}, "w": 3}}
        }}}));
        let samples = extract_lock_metrics(&d);
        assert_eq!(samples.len(), 2);
        assert!(matches!(&samples[0], Err(e) if matches!(e.error, MetricError::Malformed(_))));
        assert_eq!(samples[1].as_ref().map(RawMetric::value), Ok(3.0));
    }

    #[test]
    fn test_one_path_feeds_two_families() {
        let d = doc(json!({"serverStatus": {"locks": {"Global": {"timeAcquiringMicros": {"w": 250}}}}}));
        let samples = extract_lock_metrics(&d);
        let names: Vec<&str> = samples.iter().filter_map(|s| s.as_ref().ok()).map(RawMetric::name).collect();
        assert_eq!(
            names,
            vec![
                "mongodb_ss_locks_timeAcquiringMicros",
                "mongodb_mongod_locks_time_acquiring_global_microseconds_total"
            ]
        );
    }

    #[test]
    fn test_explicit_with_base_labels() {
        let table = RuleTable::new(vec![ConversionRule::explicit_path(
            "legacy_lock",
            &["locks", "Global", "acquireCount", "W"],
            &[("resource", "Global")],
        )])
        .unwrap();
        let base: LabelSet = [("rs_nm", "rs0"), ("resource", "ignored")].into_iter().collect();
        let d = doc(json!({"locks": {"Global": {"acquireCount": {"W": {"$numberLong": "12"}}}}}));
        let samples = extract_explicit(&d, &table, &base);
        let m = samples[0].as_ref().unwrap();
        assert_eq!(m.label("rs_nm"), Some("rs0"));
        assert_eq!(m.label("resource"), Some("Global"));
        assert_eq!(m.value(), 12.0);
    }

    #[test]
    fn test_lock_rules_build_into_table() {
        let table = RuleTable::new(lock_rules()).unwrap();
        assert_eq!(table.explicit_rules().len(), LOCK_METRICS.len());
    }
}
