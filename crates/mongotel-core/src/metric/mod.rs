//! Raw metric model shared by the flattener, the translator and exposition.
//!
//! A [`RawMetric`] is validated on construction: the name is a legal metric
//! name and the label names are unique and aligned with their values. Every
//! component that produces metrics goes through [`RawMetric::new`], so the
//! exposition layer never sees a malformed sample.
//!
//! Field-scoped failures are carried as [`InvalidMetric`] markers instead of
//! aborting the scrape.

mod labels;

use serde::Serialize;

pub use labels::{LabelSet, TopologyLabels};

/// Prometheus value type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Counter,
    Gauge,
    #[default]
    Untyped,
}

impl ValueKind {
    /// Name used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Counter => "counter",
            ValueKind::Gauge => "gauge",
            ValueKind::Untyped => "untyped",
        }
    }
}

/// Reason a metric could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Metric or label name is empty or contains illegal characters.
    InvalidName(String),
    /// `label_names` and `label_values` have different lengths.
    LabelMismatch { names: usize, values: usize },
    /// The same label name appears twice.
    DuplicateLabel(String),
    /// Leaf kind the flattener has no numeric interpretation for.
    UnsupportedKind(&'static str),
    /// A value was expected to be numeric but has another kind.
    NotNumeric(&'static str),
    /// The source value could not be decoded.
    Malformed(String),
}

impl std::fmt::Display for MetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricError::InvalidName(name) => write!(f, "invalid metric or label name '{}'", name),
            MetricError::LabelMismatch { names, values } => {
                write!(f, "{} label names but {} label values", names, values)
            }
            MetricError::DuplicateLabel(name) => write!(f, "duplicate label '{}'", name),
            MetricError::UnsupportedKind(kind) => write!(f, "unsupported value kind '{}'", kind),
            MetricError::NotNumeric(kind) => write!(f, "expected a number, found '{}'", kind),
            MetricError::Malformed(message) => write!(f, "malformed value: {}", message),
        }
    }
}

impl std::error::Error for MetricError {}

/// Invalid-metric marker: a metric that could not be produced, with the reason.
///
/// Callers decide whether to surface it (e.g. as a log line or an
/// "invalid metric" sample) or drop it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidMetric {
    pub name: String,
    pub error: MetricError,
}

impl InvalidMetric {
    pub fn new(name: impl Into<String>, error: MetricError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl std::fmt::Display for InvalidMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

impl std::error::Error for InvalidMetric {}

/// One element of a flatten or extraction pass.
pub type Sample = Result<RawMetric, InvalidMetric>;

/// Identity of a metric: name plus label pairs sorted by label name.
///
/// Two metrics with the same identity are duplicates regardless of the
/// order their labels were attached in.
pub type MetricIdentity = (String, Vec<(String, String)>);

/// Named, labeled, typed sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawMetric {
    name: String,
    help: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
    value: f64,
    kind: ValueKind,
}

impl RawMetric {
    /// Builds a metric, validating name and labels.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        label_names: Vec<String>,
        label_values: Vec<String>,
        value: f64,
        kind: ValueKind,
    ) -> Result<Self, MetricError> {
        let name = name.into();
        if !is_valid_metric_name(&name) {
            return Err(MetricError::InvalidName(name));
        }
        if label_names.len() != label_values.len() {
            return Err(MetricError::LabelMismatch {
                names: label_names.len(),
                values: label_values.len(),
            });
        }
        for (i, label) in label_names.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(MetricError::InvalidName(label.clone()));
            }
            if label_names[..i].contains(label) {
                return Err(MetricError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self {
            name,
            help: help.into(),
            label_names,
            label_values,
            value,
            kind,
        })
    }

    /// Builds a metric from a label set (labels ordered by name).
    pub fn with_labels(
        name: impl Into<String>,
        help: impl Into<String>,
        labels: &LabelSet,
        value: f64,
        kind: ValueKind,
    ) -> Result<Self, MetricError> {
        let (names, values) = labels.to_vecs();
        Self::new(name, help, names, values, value, kind)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the value of a label, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.label_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.label_values[i].as_str())
    }

    /// Iterates over `(name, value)` label pairs in stored order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.label_names
            .iter()
            .zip(&self.label_values)
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Collects the labels into a [`LabelSet`].
    pub fn label_set(&self) -> LabelSet {
        self.labels().collect()
    }

    pub fn identity(&self) -> MetricIdentity {
        let mut pairs: Vec<(String, String)> = self
            .labels()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        pairs.sort();
        (self.name.clone(), pairs)
    }
}

/// Metric names follow the exposition format: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
///
/// Names produced by the flattener are stricter (`[a-z0-9_]+`); the wider
/// rule admits hand-authored legacy names such as
/// `mongodb_ss_locks_acquireCount`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Label names: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_accepts_aligned_labels() {
        let m = RawMetric::new(
            "mongodb_ss_asserts",
            "asserts",
            strings(&["assert_type", "cl_role"]),
            strings(&["warning", "shardsvr"]),
            3.0,
            ValueKind::Counter,
        )
        .unwrap();
        assert_eq!(m.label("assert_type"), Some("warning"));
        assert_eq!(m.label("missing"), None);
        assert_eq!(m.value(), 3.0);
    }

    #[test]
    fn new_rejects_misaligned_labels() {
        let err = RawMetric::new("m", "", strings(&["a", "b"]), strings(&["1"]), 0.0, ValueKind::Untyped)
            .unwrap_err();
        assert_eq!(err, MetricError::LabelMismatch { names: 2, values: 1 });
    }

    #[test]
    fn new_rejects_duplicate_labels() {
        let err = RawMetric::new("m", "", strings(&["a", "a"]), strings(&["1", "2"]), 0.0, ValueKind::Untyped)
            .unwrap_err();
        assert_eq!(err, MetricError::DuplicateLabel("a".to_string()));
    }

    #[test]
    fn new_rejects_bad_names() {
        assert!(RawMetric::new("", "", vec![], vec![], 0.0, ValueKind::Untyped).is_err());
        assert!(RawMetric::new("1abc", "", vec![], vec![], 0.0, ValueKind::Untyped).is_err());
        assert!(RawMetric::new("a b", "", vec![], vec![], 0.0, ValueKind::Untyped).is_err());
        assert!(
            RawMetric::new("ok", "", strings(&["bad-label"]), strings(&["v"]), 0.0, ValueKind::Untyped)
                .is_err()
        );
    }

    #[test]
    fn identity_ignores_label_order() {
        let a = RawMetric::new("m", "", strings(&["x", "y"]), strings(&["1", "2"]), 0.0, ValueKind::Untyped)
            .unwrap();
        let b = RawMetric::new("m", "", strings(&["y", "x"]), strings(&["2", "1"]), 5.0, ValueKind::Gauge)
            .unwrap();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn metric_name_charset() {
        assert!(is_valid_metric_name("mongodb_ss_locks_acquireCount"));
        assert!(is_valid_metric_name("_x:y"));
        assert!(!is_valid_metric_name("9lives"));
        assert!(!is_valid_label_name("a:b"));
    }
}
