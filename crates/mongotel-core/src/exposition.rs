//! Prometheus text exposition (format 0.0.4).
//!
//! Metrics are grouped into families by name. Each family gets one `# HELP`
//! line (first non-empty help) and one `# TYPE` line, followed by its
//! samples ordered by labels.
//!
//! The translator can merge samples of different kinds into one legacy
//! family. The family type is the kind its typed samples agree on; untyped
//! samples do not vote, and a counter/gauge conflict exposes the family as
//! untyped.

use std::collections::BTreeMap;
use std::fmt::Write;

use tracing::{debug, warn};

use crate::metric::{RawMetric, ValueKind};

/// Content type of [`render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders metrics as Prometheus text exposition, families sorted by name.
pub fn render(metrics: &[RawMetric]) -> String {
    let mut families: BTreeMap<&str, Vec<&RawMetric>> = BTreeMap::new();
    for metric in metrics {
        families.entry(metric.name()).or_default().push(metric);
    }

    let mut output = String::new();
    for (name, mut samples) in families {
        samples.sort_by(|a, b| a.identity().cmp(&b.identity()));
        let help = samples.iter().copied().map(RawMetric::help).find(|h| !h.is_empty());

        if let Some(help) = help {
            let _ = writeln!(output, "# HELP {} {}", name, escape_help(help));
        }
        let _ = writeln!(output, "# TYPE {} {}", name, family_kind(name, &samples).as_str());

        for sample in samples {
            output.push_str(name);
            write_labels(&mut output, sample);
            let _ = writeln!(output, " {}", format_value(sample.value()));
        }
    }
    output
}

fn family_kind(name: &str, samples: &[&RawMetric]) -> ValueKind {
    let mut kind = ValueKind::Untyped;
    let mut untyped = false;
    for sample in samples {
        match (kind, sample.kind()) {
            (_, ValueKind::Untyped) => untyped = true,
            (ValueKind::Untyped, typed) => kind = typed,
            (current, typed) if current == typed => {}
            _ => {
                warn!(metric = %name, "family mixes counter and gauge samples, exposing as untyped");
                return ValueKind::Untyped;
            }
        }
    }
    if untyped && kind != ValueKind::Untyped {
        debug!(metric = %name, kind = kind.as_str(), "untyped samples exposed under typed family");
    }
    kind
}

fn write_labels(output: &mut String, metric: &RawMetric) {
    let mut labels: Vec<(&str, &str)> = metric.labels().collect();
    if labels.is_empty() {
        return;
    }
    labels.sort_unstable();

    output.push('{');
    for (i, (name, value)) in labels.into_iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        let _ = write!(output, "{}=\"{}\"", name, escape_label_value(value));
    }
    output.push('}');
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{LabelSet, ValueKind};

    fn metric(name: &str, help: &str, labels: &[(&str, &str)], value: f64, kind: ValueKind) -> RawMetric {
        let labels: LabelSet = labels.iter().copied().collect();
        RawMetric::with_labels(name, help, &labels, value, kind).unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_family_grouping_and_order() {
        let metrics = vec![
            metric("b_total", "B things", &[("type", "y")], 2.0, ValueKind::Counter),
            metric("a_gauge", "", &[], 1.5, ValueKind::Gauge),
            metric("b_total", "B things", &[("type", "x")], 1.0, ValueKind::Counter),
        ];
        let expected = "\
# TYPE a_gauge gauge
a_gauge 1.5
# HELP b_total B things
# TYPE b_total counter
b_total{type=\"x\"} 1
b_total{type=\"y\"} 2
";
        assert_eq!(render(&metrics), expected);
    }

    #[test]
    fn test_family_type_from_typed_samples() {
        // Untyped sample sorts first but must not decide the family type.
        let metrics = vec![
            metric("mongodb_network_bytes_total", "", &[("state", "a_physical")], 1.0, ValueKind::Untyped),
            metric("mongodb_network_bytes_total", "bytes", &[("state", "in_bytes")], 2.0, ValueKind::Counter),
        ];
        let output = render(&metrics);
        assert!(output.contains("# HELP mongodb_network_bytes_total bytes\n"));
        assert!(output.contains("# TYPE mongodb_network_bytes_total counter\n"));
        assert_eq!(output.matches("# TYPE").count(), 1);
    }

    #[test]
    fn test_counter_gauge_conflict_is_untyped() {
        let metrics = vec![
            metric("m", "", &[("k", "a")], 1.0, ValueKind::Counter),
            metric("m", "", &[("k", "b")], 2.0, ValueKind::Gauge),
        ];
        assert!(render(&metrics).starts_with("# TYPE m untyped\n"));
    }

    #[test]
    fn test_labels_are_sorted_and_escaped() {
        let metrics = vec![metric(
            "m",
            "line1\nline2 \\",
            &[("z", "a\"b"), ("a", "c\\d\ne")],
            0.0,
            ValueKind::Untyped,
        )];
        let output = render(&metrics);
        assert!(output.contains("# HELP m line1\\nline2 \\\\\n"));
        assert!(output.contains("# TYPE m untyped\n"));
        assert!(output.contains("m{a=\"c\\\\d\\ne\",z=\"a\\\"b\"} 0\n"));
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(-3.25), "-3.25");
        assert_eq!(format_value(9_007_199_254_740_992.0), "9007199254740992");
    }

    #[test]
    fn test_legacy_leaf_pages_label_survives_rendering() {
        let metrics = vec![metric(
            "mongodb_mongod_wiredtiger_cache_bytes",
            "",
            &[("type", " internal_pages")],
            2.0,
            ValueKind::Untyped,
        )];
        assert!(render(&metrics).contains("{type=\" internal_pages\"} 2\n"));
    }
}
