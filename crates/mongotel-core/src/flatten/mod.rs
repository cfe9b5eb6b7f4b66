//! Document flattener.
//!
//! Walks a [`Document`] and turns every numeric leaf into a [`RawMetric`]
//! named after its field path:
//!
//! ```text
//! {"a": {"b": {"c": true}}}  --prefix "p"-->  p_a_b_c 1
//! ```
//!
//! Leaf handling:
//! - bool, int32, int64, double: emitted (bool as 0/1);
//! - date, timestamp, string, objectId, array, null: dropped silently;
//! - decimal128, binData, regex, javascript, minKey, maxKey, undefined:
//!   an [`InvalidMetric`] marker for that field, siblings continue;
//! - malformed (a wrapper that failed to decode): a marker as well.
//!
//! Because normalization is not injective (`aB` and `a_b` both become
//! `a_b`), the flattener resolves name collisions after the walk: colliding
//! samples get a `field_path` label with the raw dotted path, and if that
//! still collides only the sample with the smallest raw path is kept.

mod normalize;
mod options;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::document::{Document, Value};
use crate::metric::{InvalidMetric, LabelSet, MetricError, RawMetric, Sample};

pub use normalize::{join, normalize};
pub use options::FlattenOptions;

/// Label added to metrics whose names collide after normalization.
pub const FIELD_PATH_LABEL: &str = "field_path";

/// Flattens `doc` with no naming rules.
pub fn flatten(doc: &Document, prefix: &str, labels: &LabelSet) -> Vec<Sample> {
    Flattener::new(&FlattenOptions::default(), prefix, labels).flatten(doc)
}

/// Flattener bound to a prefix, a base label set and naming options.
pub struct Flattener<'a> {
    options: &'a FlattenOptions,
    prefix: String,
    labels: &'a LabelSet,
}

/// A sample collected during the walk, before collision resolution.
struct Pending {
    path: Vec<String>,
    name: String,
    labels: LabelSet,
    value: f64,
}

impl Pending {
    fn key(&self) -> (String, LabelSet) {
        (self.name.clone(), self.labels.clone())
    }
}

impl<'a> Flattener<'a> {
    /// The prefix is normalized, so a valid prefix (`mongodb`) is used as is.
    pub fn new(options: &'a FlattenOptions, prefix: &str, labels: &'a LabelSet) -> Self {
        Self {
            options,
            prefix: normalize(prefix),
            labels,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Flattens a document into samples.
    ///
    /// Valid metrics come first, ordered by name and labels; invalid-metric
    /// markers follow in walk order.
    pub fn flatten(&self, doc: &Document) -> Vec<Sample> {
        let mut pending = Vec::new();
        let mut invalid = Vec::new();
        let mut path = Vec::new();
        self.walk(doc, &self.prefix, None, &mut path, &mut pending, &mut invalid);

        let mut samples: Vec<Sample> = resolve_collisions(pending)
            .into_iter()
            .map(|p| self.build(p))
            .collect();
        samples.extend(invalid.into_iter().map(Err));
        samples
    }

    fn walk(
        &self,
        doc: &Document,
        name: &str,
        family_label: Option<&str>,
        path: &mut Vec<String>,
        pending: &mut Vec<Pending>,
        invalid: &mut Vec<InvalidMetric>,
    ) {
        for (field, value) in doc.iter() {
            path.push(field.to_string());
            let joined = join(name, &normalize(field));
            let full_name = self.options.rename(&joined);

            let leaf = match value {
                Value::Document(child) => {
                    let family = self.options.family_label(full_name);
                    self.walk(child, full_name, family, path, pending, invalid);
                    Ok(None)
                }
                Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
                Value::Int32(v) => Ok(Some(f64::from(*v))),
                Value::Int64(v) => Ok(Some(*v as f64)),
                Value::Double(v) => Ok(Some(*v)),
                Value::DateTime(_)
                | Value::Timestamp { .. }
                | Value::String(_)
                | Value::ObjectId(_)
                | Value::Array(_)
                | Value::Null => Ok(None),
                Value::Decimal128(_)
                | Value::Binary { .. }
                | Value::RegularExpression { .. }
                | Value::JavaScriptCode(_)
                | Value::MinKey
                | Value::MaxKey
                | Value::Undefined => Err(MetricError::UnsupportedKind(value.kind())),
                Value::Malformed { message, .. } => Err(MetricError::Malformed(message.clone())),
            };

            let number = match leaf {
                Ok(number) => number,
                Err(error) => {
                    debug!(metric = %full_name, field = %path.join("."), error = %error, "invalid metric");
                    invalid.push(InvalidMetric::new(full_name, error));
                    None
                }
            };

            if let Some(value) = number {
                let mut labels = self.labels.clone();
                let metric_name = match family_label {
                    Some(label) => {
                        labels.insert(label, field);
                        name.to_string()
                    }
                    None => full_name.to_string(),
                };
                pending.push(Pending {
                    path: path.clone(),
                    name: metric_name,
                    labels,
                    value,
                });
            }

            path.pop();
        }
    }

    fn build(&self, pending: Pending) -> Sample {
        let help = match self.options.help(&pending.name) {
            Some(help) => help.to_string(),
            None => self.placeholder_help(&pending.name),
        };
        let kind = self.options.kind(&pending.name);
        RawMetric::with_labels(&pending.name, help, &pending.labels, pending.value, kind).map_err(|error| {
            debug!(metric = %pending.name, error = %error, "invalid metric");
            InvalidMetric::new(pending.name.clone(), error)
        })
    }

    /// Name minus the prefix; the full name if the prefix was renamed away.
    fn placeholder_help(&self, name: &str) -> String {
        match name.strip_prefix(self.prefix.as_str()) {
            Some(rest) if rest.len() > 1 && rest.starts_with('_') => rest[1..].to_string(),
            _ => name.to_string(),
        }
    }
}

/// Makes (name, labels) unique across the pass.
fn resolve_collisions(mut pending: Vec<Pending>) -> Vec<Pending> {
    let mut counts: HashMap<(String, LabelSet), usize> = HashMap::new();
    for p in &pending {
        *counts.entry(p.key()).or_default() += 1;
    }
    for p in &mut pending {
        if counts.get(&p.key()).copied().unwrap_or(0) > 1 {
            let dotted = p.path.join(".");
            p.labels.insert(FIELD_PATH_LABEL, dotted);
        }
    }

    let mut unique: BTreeMap<(String, LabelSet), Pending> = BTreeMap::new();
    for p in pending {
        match unique.entry(p.key()) {
            Entry::Vacant(slot) => {
                slot.insert(p);
            }
            Entry::Occupied(mut slot) => {
                let dropped = if p.path < slot.get().path {
                    slot.insert(p)
                } else {
                    p
                };
                warn!(
                    metric = %dropped.name,
                    field = %dropped.path.join("."),
                    "dropping metric with colliding name"
                );
            }
        }
    }

    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::ValueKind;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        Document::from_json(&json).unwrap()
    }

    fn metrics(samples: Vec<Sample>) -> Vec<RawMetric> {
        samples.into_iter().filter_map(Result::ok).collect()
    }

    fn find<'a>(metrics: &'a [RawMetric], name: &str) -> Option<&'a RawMetric> {
        metrics.iter().find(|m| m.name() == name)
    }

    #[test]
    fn test_bool_leaf_at_nested_path() {
        let samples = flatten(&doc(json!({"a": {"b": {"c": true}}})), "p", &LabelSet::new());
        let metrics = metrics(samples);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name(), "p_a_b_c");
        assert_eq!(metrics[0].value(), 1.0);
        assert_eq!(metrics[0].kind(), ValueKind::Untyped);
        assert_eq!(metrics[0].help(), "a_b_c");
    }

    #[test]
    fn test_numeric_kinds() {
        let d = doc(json!({
            "i": 3,
            "l": {"$numberLong": "9007199254740993"},
            "d": 1.5,
            "f": false,
        }));
        let metrics = metrics(flatten(&d, "p", &LabelSet::new()));
        assert_eq!(find(&metrics, "p_i").map(RawMetric::value), Some(3.0));
        assert_eq!(
            find(&metrics, "p_l").map(RawMetric::value),
            Some(9_007_199_254_740_993i64 as f64)
        );
        assert_eq!(find(&metrics, "p_d").map(RawMetric::value), Some(1.5));
        assert_eq!(find(&metrics, "p_f").map(RawMetric::value), Some(0.0));
    }

    #[test]
    fn test_text_and_other_expected_kinds_are_dropped() {
        let d = doc(json!({
            "host": "db1",
            "localTime": {"$date": "2024-03-01T10:00:00Z"},
            "ts": {"$timestamp": {"t": 1, "i": 1}},
            "id": {"$oid": "65e1a2b3c4d5e6f708091a2b"},
            "list": [1, 2],
            "nothing": null,
        }));
        let samples = flatten(&d, "p", &LabelSet::new());
        assert!(samples.is_empty(), "{:?}", samples);
    }

    #[test]
    fn test_unsupported_kind_yields_marker_and_siblings_continue() {
        let d = doc(json!({
            "dec": {"$numberDecimal": "1.5"},
            "ok": 1,
        }));
        let samples = flatten(&d, "p", &LabelSet::new());
        assert_eq!(samples.len(), 2);
        let invalid: Vec<&InvalidMetric> = samples.iter().filter_map(|s| s.as_ref().err()).collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].name, "p_dec");
        assert_eq!(invalid[0].error, MetricError::UnsupportedKind("decimal128"));
        assert!(samples.iter().any(|s| matches!(s, Ok(m) if m.name() == "p_ok")));
    }

    #[test]
    fn test_malformed_value_yields_marker_and_siblings_continue() {
        let d = doc(json!({"serverStatus": {"uptime": 5, "odd": {"$numberLong": "abc"}}}));
        let samples = flatten(&d, "mongodb", &LabelSet::new());
        assert_eq!(samples.len(), 2);
        assert!(matches!(&samples[0], Ok(m) if m.name() == "mongodb_server_status_uptime" && m.value() == 5.0));
        let err = samples[1].as_ref().unwrap_err();
        assert_eq!(err.name, "mongodb_server_status_odd");
        assert!(matches!(err.error, MetricError::Malformed(_)));
    }

    #[test]
    fn test_base_labels_attached() {
        let labels: LabelSet = [("cl_role", "mongod")].into_iter().collect();
        let metrics = metrics(flatten(&doc(json!({"x": 1})), "p", &labels));
        assert_eq!(metrics[0].label("cl_role"), Some("mongod"));
    }

    #[test]
    fn test_names_are_lowercase_underscore() {
        let d = doc(json!({
            "serverStatus": {
                "wiredTiger": {"cache": {"bytes currently in the cache": 10}},
                "Global": {"acquireCount": {"R": 1, "W": 2}},
                "dur.commits": 4,
            }
        }));
        let metrics = metrics(flatten(&d, "mongodb", &LabelSet::new()));
        assert_eq!(metrics.len(), 4);
        for m in &metrics {
            assert!(
                m.name().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "{}",
                m.name()
            );
        }
        assert!(find(&metrics, "mongodb_server_status_wired_tiger_cache_bytes_currently_in_the_cache").is_some());
        assert!(find(&metrics, "mongodb_server_status__global_acquire_count__r").is_some());
    }

    #[test]
    fn test_deterministic_regardless_of_insertion_order() {
        let mut a = Document::new();
        a.insert("x", 1i32);
        a.insert("y", 2i32);
        let mut inner = Document::new();
        inner.insert("z", 3i32);
        a.insert("n", inner.clone());

        let mut b = Document::new();
        b.insert("n", inner);
        b.insert("y", 2i32);
        b.insert("x", 1i32);

        let labels = LabelSet::new();
        let ma = metrics(flatten(&a, "p", &labels));
        let mb = metrics(flatten(&b, "p", &labels));
        assert_eq!(ma, mb);
    }

    #[test]
    fn test_collision_gets_field_path_label() {
        let d = doc(json!({"aB": 1, "a_b": 2}));
        let metrics = metrics(flatten(&d, "p", &LabelSet::new()));
        assert_eq!(metrics.len(), 2);
        let mut paths: Vec<&str> = metrics.iter().filter_map(|m| m.label(FIELD_PATH_LABEL)).collect();
        paths.sort();
        assert_eq!(paths, vec!["aB", "a_b"]);
        assert!(metrics.iter().all(|m| m.name() == "p_a_b"));
    }

    #[test]
    fn test_nested_collision_with_same_dotted_path_keeps_one() {
        // {"a": {"b": 1}} and {"a.b": 2} share both name and dotted path.
        let mut inner = Document::new();
        inner.insert("b", 1i32);
        let mut d = Document::new();
        d.insert("a", inner);
        d.insert("a.b", 2i32);

        let metrics = metrics(flatten(&d, "p", &LabelSet::new()));
        assert_eq!(metrics.len(), 1);
        // ["a", "b"] sorts before ["a.b"].
        assert_eq!(metrics[0].value(), 1.0);
    }

    #[test]
    fn test_label_alignment_and_uniqueness() {
        let labels: LabelSet = [("rs_nm", "rs0")].into_iter().collect();
        let options = FlattenOptions::mongodb();
        let d = doc(json!({"serverStatus": {"asserts": {"regular": 0, "warning": 3}, "uptime": 10}}));
        let samples = Flattener::new(&options, "mongodb", &labels).flatten(&d);
        for m in metrics(samples) {
            assert_eq!(m.label_names().len(), m.label_values().len());
            let mut names = m.label_names().to_vec();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), m.label_names().len());
        }
    }

    #[test]
    fn test_mongodb_options_apply_renames_and_families() {
        let options = FlattenOptions::mongodb();
        let d = doc(json!({
            "serverStatus": {
                "asserts": {"regular": 0, "warning": 3},
                "wiredTiger": {"transaction": {"transaction begins": 12}},
                "uptime": 100,
            }
        }));
        let labels = LabelSet::new();
        let metrics = metrics(Flattener::new(&options, "mongodb", &labels).flatten(&d));

        let warning = metrics
            .iter()
            .find(|m| m.name() == "mongodb_ss_asserts" && m.label("assert_type") == Some("warning"))
            .unwrap();
        assert_eq!(warning.value(), 3.0);
        assert_eq!(warning.kind(), ValueKind::Counter);

        assert!(find(&metrics, "mongodb_ss_wt_txn_transaction_begins").is_some());
        let uptime = find(&metrics, "mongodb_ss_uptime").unwrap();
        assert_eq!(uptime.kind(), ValueKind::Gauge);
        assert_eq!(uptime.help(), "Seconds since the server process started");
    }

    #[test]
    fn test_renamed_names_stay_lowercase() {
        let options = FlattenOptions::new().with_rename("p_server_status", "p_SS");
        let labels = LabelSet::new();
        let d = doc(json!({"serverStatus": {"uptime": 1}}));
        let metrics = metrics(Flattener::new(&options, "p", &labels).flatten(&d));
        assert_eq!(metrics[0].name(), "p__s_s_uptime");
    }

    #[test]
    fn test_prefix_is_normalized() {
        let metrics = metrics(flatten(&doc(json!({"x": 1})), "myApp", &LabelSet::new()));
        assert_eq!(metrics[0].name(), "my_app_x");
    }
}
