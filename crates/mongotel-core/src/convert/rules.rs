//! Conversion rules and the immutable rule table.

use std::collections::{BTreeMap, HashMap};

use crate::metric::{is_valid_label_name, is_valid_metric_name};

/// Exact rename of one current metric to its legacy name.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectRule {
    pub old_name: String,
    pub new_name: String,
    /// Current label name -> legacy label name.
    pub label_name_map: BTreeMap<String, String>,
    /// Current label value -> legacy label value.
    pub label_value_map: BTreeMap<String, String>,
}

/// Maps every metric under `prefix` to `old_name`, moving the rest of the
/// name into the `suffix_label` label.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixSuffixRule {
    pub old_name: String,
    pub prefix: String,
    pub suffix_label: String,
    /// Raw suffix -> canonical label value. Suffixes not listed pass through.
    pub suffix_value_map: BTreeMap<String, String>,
}

/// Reads one value at a fixed document path, bypassing the flattener.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitPathRule {
    pub name: String,
    pub path: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// One declarative renaming instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionRule {
    Direct(DirectRule),
    PrefixSuffix(PrefixSuffixRule),
    ExplicitPath(ExplicitPathRule),
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl ConversionRule {
    /// `new_name` -> `old_name` with no label changes.
    pub fn direct(old_name: &str, new_name: &str) -> Self {
        Self::direct_labels(old_name, new_name, &[], &[])
    }

    /// `new_name` -> `old_name`, renaming labels and label values.
    pub fn direct_labels(
        old_name: &str,
        new_name: &str,
        label_names: &[(&str, &str)],
        label_values: &[(&str, &str)],
    ) -> Self {
        ConversionRule::Direct(DirectRule {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            label_name_map: to_map(label_names),
            label_value_map: to_map(label_values),
        })
    }

    pub fn prefix_suffix(old_name: &str, prefix: &str, suffix_label: &str) -> Self {
        Self::prefix_suffix_mapped(old_name, prefix, suffix_label, &[])
    }

    pub fn prefix_suffix_mapped(
        old_name: &str,
        prefix: &str,
        suffix_label: &str,
        suffix_values: &[(&str, &str)],
    ) -> Self {
        ConversionRule::PrefixSuffix(PrefixSuffixRule {
            old_name: old_name.to_string(),
            prefix: prefix.to_string(),
            suffix_label: suffix_label.to_string(),
            suffix_value_map: to_map(suffix_values),
        })
    }

    pub fn explicit_path(name: &str, path: &[&str], labels: &[(&str, &str)]) -> Self {
        ConversionRule::ExplicitPath(ExplicitPathRule {
            name: name.to_string(),
            path: path.iter().map(|s| s.to_string()).collect(),
            labels: to_map(labels),
        })
    }
}

/// Error building a [`RuleTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Two Direct rules share the same `new_name`.
    DuplicateDirect(String),
    /// A rule has an empty name, prefix or path.
    Empty(&'static str),
    /// An output metric or label name is not valid.
    InvalidName(String),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::DuplicateDirect(name) => {
                write!(f, "more than one direct rule for metric '{}'", name)
            }
            RuleError::Empty(what) => write!(f, "rule has an empty {}", what),
            RuleError::InvalidName(name) => write!(f, "invalid output name '{}'", name),
        }
    }
}

impl std::error::Error for RuleError {}

/// Immutable set of conversion rules.
///
/// Direct rules are indexed by `new_name`; PrefixSuffix and ExplicitPath
/// rules keep their declaration order. Shared read-only between scrapes.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    direct: HashMap<String, DirectRule>,
    prefix_suffix: Vec<PrefixSuffixRule>,
    explicit: Vec<ExplicitPathRule>,
}

impl RuleTable {
    /// A table with no rules; translation yields nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(rules: Vec<ConversionRule>) -> Result<Self, RuleError> {
        let mut table = Self::default();
        for rule in rules {
            match rule {
                ConversionRule::Direct(rule) => {
                    check_metric_name(&rule.old_name)?;
                    if rule.new_name.is_empty() {
                        return Err(RuleError::Empty("new name"));
                    }
                    for old_label in rule.label_name_map.values() {
                        check_label_name(old_label)?;
                    }
                    if table.direct.contains_key(&rule.new_name) {
                        return Err(RuleError::DuplicateDirect(rule.new_name));
                    }
                    table.direct.insert(rule.new_name.clone(), rule);
                }
                ConversionRule::PrefixSuffix(rule) => {
                    check_metric_name(&rule.old_name)?;
                    if rule.prefix.is_empty() {
                        return Err(RuleError::Empty("prefix"));
                    }
                    check_label_name(&rule.suffix_label)?;
                    table.prefix_suffix.push(rule);
                }
                ConversionRule::ExplicitPath(rule) => {
                    check_metric_name(&rule.name)?;
                    if rule.path.is_empty() {
                        return Err(RuleError::Empty("path"));
                    }
                    for label in rule.labels.keys() {
                        check_label_name(label)?;
                    }
                    table.explicit.push(rule);
                }
            }
        }
        Ok(table)
    }

    pub fn direct(&self, new_name: &str) -> Option<&DirectRule> {
        self.direct.get(new_name)
    }

    pub fn prefix_suffix_rules(&self) -> &[PrefixSuffixRule] {
        &self.prefix_suffix
    }

    pub fn explicit_rules(&self) -> &[ExplicitPathRule] {
        &self.explicit
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.prefix_suffix.is_empty() && self.explicit.is_empty()
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.prefix_suffix.len() + self.explicit.len()
    }
}

fn check_metric_name(name: &str) -> Result<(), RuleError> {
    if name.is_empty() {
        return Err(RuleError::Empty("name"));
    }
    if !is_valid_metric_name(name) {
        return Err(RuleError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn check_label_name(name: &str) -> Result<(), RuleError> {
    if !is_valid_label_name(name) {
        return Err(RuleError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_direct_rule_is_rejected() {
        let err = RuleTable::new(vec![
            ConversionRule::direct("mongodb_instance_uptime_seconds", "mongodb_ss_uptime"),
            ConversionRule::direct("mongodb_mongod_instance_uptime_seconds", "mongodb_ss_uptime"),
        ])
        .unwrap_err();
        assert_eq!(err, RuleError::DuplicateDirect("mongodb_ss_uptime".to_string()));
    }

    #[test]
    fn shared_prefix_rules_are_allowed_and_ordered() {
        let table = RuleTable::new(vec![
            ConversionRule::prefix_suffix("legacy_a", "mongodb_ss_wt_cache", "type"),
            ConversionRule::prefix_suffix("legacy_b", "mongodb_ss_wt_cache", "type"),
        ])
        .unwrap();
        let names: Vec<&str> = table
            .prefix_suffix_rules()
            .iter()
            .map(|r| r.old_name.as_str())
            .collect();
        assert_eq!(names, vec!["legacy_a", "legacy_b"]);
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert_eq!(
            RuleTable::new(vec![ConversionRule::direct("bad name", "x")]).unwrap_err(),
            RuleError::InvalidName("bad name".to_string())
        );
        assert_eq!(
            RuleTable::new(vec![ConversionRule::prefix_suffix("ok", "", "type")]).unwrap_err(),
            RuleError::Empty("prefix")
        );
        assert_eq!(
            RuleTable::new(vec![ConversionRule::explicit_path("ok", &[], &[])]).unwrap_err(),
            RuleError::Empty("path")
        );
    }

    #[test]
    fn empty_table() {
        let table = RuleTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.direct("anything").is_none());
    }
}
