//! Caller-owned naming configuration for the flattener.

use std::collections::BTreeMap;

use crate::metric::ValueKind;

use super::normalize::normalize;

/// Naming rules applied while flattening.
///
/// Built once at startup and passed by reference to every flatten call.
/// The default value applies no rules at all.
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    renames: BTreeMap<String, String>,
    families: BTreeMap<String, String>,
    kinds: BTreeMap<String, ValueKind>,
    help: BTreeMap<String, String>,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames a node whose full name equals `from`.
    ///
    /// Renames apply to containers as well as leaves, and children are named
    /// after the renamed parent, so chains compose: renaming
    /// `mongodb_server_status` to `mongodb_ss` and `mongodb_ss_wired_tiger`
    /// to `mongodb_ss_wt` shortens `serverStatus.wiredTiger.*` twice.
    ///
    /// `to` is normalized, so renamed names stay within `[a-z0-9_]`.
    pub fn with_rename(mut self, from: impl Into<String>, to: &str) -> Self {
        self.renames.insert(from.into(), normalize(to));
        self
    }

    /// Turns the direct leaf children of container `name` into one metric
    /// family named `name`, labeled `label = <raw field name>`.
    pub fn with_family(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.families.insert(name.into(), label.into());
        self
    }

    /// Classifies the metric `name` (after renames and families).
    pub fn with_kind(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.kinds.insert(name.into(), kind);
        self
    }

    pub fn with_counter(self, name: impl Into<String>) -> Self {
        self.with_kind(name, ValueKind::Counter)
    }

    /// Overrides the placeholder help text of metric `name`.
    pub fn with_help(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.help.insert(name.into(), help.into());
        self
    }

    pub(crate) fn rename<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map(String::as_str).unwrap_or(name)
    }

    pub(crate) fn family_label(&self, name: &str) -> Option<&str> {
        self.families.get(name).map(String::as_str)
    }

    pub(crate) fn kind(&self, name: &str) -> ValueKind {
        self.kinds.get(name).copied().unwrap_or_default()
    }

    pub(crate) fn help(&self, name: &str) -> Option<&str> {
        self.help.get(name).map(String::as_str)
    }

    /// Naming preset for MongoDB diagnostic documents flattened with the
    /// `mongodb` prefix.
    pub fn mongodb() -> Self {
        let mut options = Self::new()
            .with_rename("mongodb_server_status", "mongodb_ss")
            .with_rename("mongodb_ss_wired_tiger", "mongodb_ss_wt")
            .with_rename("mongodb_ss_wt_transaction", "mongodb_ss_wt_txn")
            .with_rename("mongodb_repl_set_get_status", "mongodb_rs")
            .with_rename("mongodb_system_metrics", "mongodb_sys")
            .with_family("mongodb_ss_asserts", "assert_type")
            .with_family("mongodb_ss_connections", "conn_type")
            .with_family("mongodb_ss_opcounters", "legacy_op_type")
            .with_family("mongodb_ss_opcounters_repl", "legacy_op_type")
            .with_family("mongodb_ss_metrics_document", "doc_op_type")
            .with_family("mongodb_ss_metrics_cursor_open", "csr_type")
            .with_family("mongodb_ss_global_lock_current_queue", "count_type");

        for counter in [
            "mongodb_ss_asserts",
            "mongodb_ss_opcounters",
            "mongodb_ss_opcounters_repl",
            "mongodb_ss_metrics_document",
            "mongodb_ss_extra_info_page_faults",
            "mongodb_ss_network_bytes_in",
            "mongodb_ss_network_bytes_out",
            "mongodb_ss_network_num_requests",
        ] {
            options = options.with_counter(counter);
        }

        for gauge in [
            "mongodb_ss_connections",
            "mongodb_ss_metrics_cursor_open",
            "mongodb_ss_global_lock_current_queue",
            "mongodb_ss_uptime",
        ] {
            options = options.with_kind(gauge, ValueKind::Gauge);
        }

        options
            .with_help("mongodb_ss_asserts", "Number of assertions raised since the server started")
            .with_help("mongodb_ss_opcounters", "Database operations by type since the server started")
            .with_help("mongodb_ss_connections", "Incoming connections by state")
            .with_help("mongodb_ss_uptime", "Seconds since the server process started")
    }
}
