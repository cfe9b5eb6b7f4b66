//! Label sets attached to metrics.

use std::collections::BTreeMap;

/// Mapping from label name to label value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a label, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.labels.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns a copy with `other` layered on top (other wins on conflicts).
    pub fn merged(&self, other: &LabelSet) -> LabelSet {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.insert(k, v);
        }
        out
    }

    /// Splits into positionally aligned name and value vectors.
    pub fn to_vecs(&self) -> (Vec<String>, Vec<String>) {
        self.labels.iter().map(|(k, v)| (k.clone(), v.clone())).unzip()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Deployment labels attached to every metric of a scrape.
///
/// Resolved once per process by the caller; unset fields produce no label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyLabels {
    /// Cluster role: `mongod`, `mongos`, `shardsvr`, `configsvr`.
    pub cluster_role: Option<String>,
    pub cluster_id: Option<String>,
    /// Replica set name.
    pub replset_name: Option<String>,
    /// Numeric member state as reported by `replSetGetStatus`.
    pub replset_state: Option<String>,
}

impl TopologyLabels {
    pub fn to_label_set(&self) -> LabelSet {
        let mut set = LabelSet::new();
        let fields = [
            ("cl_role", &self.cluster_role),
            ("cl_id", &self.cluster_id),
            ("rs_nm", &self.replset_name),
            ("rs_state", &self.replset_state),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                set.insert(name, value.as_str());
            }
        }
        set
    }
}

impl From<&TopologyLabels> for LabelSet {
    fn from(topology: &TopologyLabels) -> Self {
        topology.to_label_set()
    }
}
