//! Legacy (v1 exporter) compatibility rules.
//!
//! Current names are the ones produced by the flattener with
//! [`FlattenOptions::mongodb`](crate::flatten::FlattenOptions::mongodb) and
//! the `mongodb` prefix; legacy names are the historical metric families
//! that existing dashboards query.

use super::locks::lock_rules;
use super::rules::{ConversionRule, RuleError, RuleTable};

impl RuleTable {
    /// The complete legacy compatibility table, including the explicit
    /// lock-metric rules.
    pub fn legacy() -> Result<Self, RuleError> {
        let mut rules = direct_rules();
        rules.extend(prefix_suffix_rules());
        rules.extend(lock_rules());
        Self::new(rules)
    }
}

fn direct_rules() -> Vec<ConversionRule> {
    use ConversionRule as R;

    vec![
        R::direct_labels("mongodb_asserts_total", "mongodb_ss_asserts", &[("assert_type", "type")], &[]),
        R::direct_labels("mongodb_connections", "mongodb_ss_connections", &[("conn_type", "state")], &[]),
        R::direct("mongodb_extra_info_page_faults_total", "mongodb_ss_extra_info_page_faults"),
        R::direct("mongodb_mongod_durability_journaled_megabytes", "mongodb_ss_dur_journaled_m_b"),
        R::direct("mongodb_mongod_durability_commits", "mongodb_ss_dur_commits"),
        R::direct(
            "mongodb_mongod_background_flushing_average_milliseconds",
            "mongodb_ss_background_flushing_average_ms",
        ),
        R::direct_labels(
            "mongodb_mongod_global_lock_current_queue",
            "mongodb_ss_global_lock_current_queue",
            &[("count_type", "type")],
            &[("readers", "reader"), ("writers", "writer")],
        ),
        R::direct("mongodb_instance_uptime_seconds", "mongodb_ss_uptime"),
        R::direct_labels(
            "mongodb_mongod_metrics_cursor_open",
            "mongodb_ss_metrics_cursor_open",
            &[("csr_type", "state")],
            &[],
        ),
        R::direct("mongodb_mongod_metrics_cursor_timed_out_total", "mongodb_ss_metrics_cursor_timed_out"),
        R::direct_labels(
            "mongodb_mongod_metrics_document_total",
            "mongodb_ss_metrics_document",
            &[("doc_op_type", "state")],
            &[],
        ),
        R::direct(
            "mongodb_mongod_metrics_get_last_error_wtime_num_total",
            "mongodb_ss_metrics_get_last_error_wtime_num",
        ),
        R::direct(
            "mongodb_mongod_metrics_get_last_error_wtime_total_milliseconds",
            "mongodb_ss_metrics_get_last_error_wtime_total_millis",
        ),
        R::direct(
            "mongodb_mongod_metrics_get_last_error_wtimeouts_total",
            "mongodb_ss_metrics_get_last_error_wtimeouts",
        ),
        R::direct("mongodb_mongod_metrics_record_moves_total", "mongodb_ss_metrics_record_moves"),
        R::direct(
            "mongodb_mongod_metrics_repl_apply_batches_num_total",
            "mongodb_ss_metrics_repl_apply_batches_num",
        ),
        R::direct(
            "mongodb_mongod_metrics_repl_apply_batches_total_milliseconds",
            "mongodb_ss_metrics_repl_apply_batches_total_millis",
        ),
        R::direct("mongodb_mongod_metrics_repl_apply_ops_total", "mongodb_ss_metrics_repl_apply_ops"),
        R::direct("mongodb_mongod_metrics_repl_buffer_count", "mongodb_ss_metrics_repl_buffer_count"),
        R::direct(
            "mongodb_mongod_metrics_repl_buffer_max_size_bytes",
            "mongodb_ss_metrics_repl_buffer_max_size_bytes",
        ),
        R::direct("mongodb_mongod_metrics_repl_buffer_size_bytes", "mongodb_ss_metrics_repl_buffer_size_bytes"),
        R::direct(
            "mongodb_mongod_metrics_repl_executor_unsignaled_events",
            "mongodb_ss_metrics_repl_executor_unsignaled_events",
        ),
        R::direct("mongodb_mongod_metrics_repl_network_bytes_total", "mongodb_ss_metrics_repl_network_bytes"),
        R::direct(
            "mongodb_mongod_metrics_repl_network_getmores_num_total",
            "mongodb_ss_metrics_repl_network_getmores_num",
        ),
        R::direct(
            "mongodb_mongod_metrics_repl_network_getmores_total_milliseconds",
            "mongodb_ss_metrics_repl_network_getmores_total_millis",
        ),
        R::direct("mongodb_mongod_metrics_repl_network_ops_total", "mongodb_ss_metrics_repl_network_ops"),
        R::direct(
            "mongodb_mongod_metrics_repl_network_readers_created_total",
            "mongodb_ss_metrics_repl_network_readers_created",
        ),
        R::direct(
            "mongodb_mongod_metrics_ttl_deleted_documents_total",
            "mongodb_ss_metrics_ttl_deleted_documents",
        ),
        R::direct("mongodb_mongod_metrics_ttl_passes_total", "mongodb_ss_metrics_ttl_passes"),
        R::direct("mongodb_network_metrics_num_requests_total", "mongodb_ss_network_num_requests"),
        R::direct_labels(
            "mongodb_mongod_op_counters_repl_total",
            "mongodb_ss_opcounters_repl",
            &[("legacy_op_type", "type")],
            &[],
        ),
        R::direct_labels("mongodb_op_counters_total", "mongodb_ss_opcounters", &[("legacy_op_type", "type")], &[]),
        R::direct("mongodb_mongod_wiredtiger_cache_max_bytes", "mongodb_ss_wt_cache_maximum_bytes_configured"),
        R::direct("mongodb_mongod_wiredtiger_cache_overhead_percent", "mongodb_ss_wt_cache_percentage_overhead"),
        R::direct(
            "mongodb_mongod_wiredtiger_session_open_sessions_total",
            "mongodb_ss_wt_session_open_session_count",
        ),
        R::direct(
            "mongodb_mongod_wiredtiger_transactions_running_checkpoints",
            "mongodb_ss_wt_txn_transaction_checkpoint_currently_running",
        ),
        R::direct(
            "mongodb_mongod_wiredtiger_transactions_checkpoint_milliseconds_total",
            "mongodb_ss_wt_txn_transaction_checkpoint_total_time_msecs",
        ),
    ]
}

/// Declaration order matters: every matching rule applies, in this order.
fn prefix_suffix_rules() -> Vec<ConversionRule> {
    use ConversionRule as R;

    vec![
        R::prefix_suffix_mapped(
            "mongodb_mongod_global_lock_client",
            "mongodb_ss_global_lock_active_clients",
            "type",
            &[("readers", "reader"), ("writers", "writer")],
        ),
        R::prefix_suffix("mongodb_memory", "mongodb_ss_mem", "type"),
        R::prefix_suffix_mapped(
            "mongodb_mongod_metrics_operation_total",
            "mongodb_ss_metrics_operation",
            "state",
            &[("scan_and_order", "scanAndOrder"), ("write_conflicts", "writeConflicts")],
        ),
        R::prefix_suffix("mongodb_mongod_metrics_query_executor_total", "mongodb_ss_metrics_query_executor", "state"),
        R::prefix_suffix("mongodb_mongod_metrics_repl_executor_queue", "mongodb_ss_metrics_repl_executor_queues", "type"),
        R::prefix_suffix_mapped(
            "mongodb_network_bytes_total",
            "mongodb_ss_network",
            "state",
            &[("bytes_in", "in_bytes"), ("bytes_out", "out_bytes")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_blockmanager_blocks_total",
            "mongodb_ss_wt_block_manager",
            "type",
            &[
                ("blocks_read", "read"),
                ("blocks_read_via_memory_map_api", "read_mapped"),
                ("blocks_pre_loaded", "pre_loaded"),
                ("blocks_written", "written"),
            ],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_blockmanager_bytes_total",
            "mongodb_ss_wt_block_manager",
            "type",
            &[
                ("bytes_read", "read"),
                ("bytes_read_via_memory_map_api", "read_mapped"),
                ("bytes_written", "written"),
            ],
        ),
        // The leaf-pages entry maps to " internal_pages" (leading space), so
        // internal and leaf page bytes are only told apart by that space.
        // Kept as is: dashboards built on the legacy exporter query these
        // exact label values.
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_cache_bytes",
            "mongodb_ss_wt_cache",
            "type",
            &[
                ("bytes_currently_in_the_cache", "total"),
                ("tracked_dirty_bytes_in_the_cache", "dirty"),
                ("tracked_bytes_belonging_to_internal_pages_in_the_cache", "internal_pages"),
                ("tracked_bytes_belonging_to_leaf_pages_in_the_cache", " internal_pages"),
            ],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_cache_bytes_total",
            "mongodb_ss_wt_cache",
            "type",
            &[("bytes_read_into_cache", "read"), ("bytes_written_from_cache", "written")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_cache_evicted_total",
            "mongodb_ss_wt_cache",
            "type",
            &[("modified_pages_evicted", "modified"), ("unmodified_pages_evicted", "unmodified")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_cache_pages",
            "mongodb_ss_wt_cache",
            "type",
            &[("pages_currently_held_in_the_cache", "total"), ("tracked_dirty_pages_in_the_cache", "dirty")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_cache_pages_total",
            "mongodb_ss_wt_cache",
            "type",
            &[("pages_read_into_cache", "read"), ("pages_written_from_cache", "written")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_concurrent_transactions_available_tickets",
            "mongodb_ss_wt_concurrent_transactions",
            "txn_rw",
            &[("read_available", "read"), ("write_available", "write")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_concurrent_transactions_out_tickets",
            "mongodb_ss_wt_concurrent_transactions",
            "txn_rw",
            &[("read_out", "read"), ("write_out", "write")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_concurrent_transactions_total_tickets",
            "mongodb_ss_wt_concurrent_transactions",
            "txn_rw",
            &[("read_total_tickets", "read"), ("write_total_tickets", "write")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_log_bytes_total",
            "mongodb_ss_wt_log",
            "type",
            &[("log_bytes_of_payload_data", "payload"), ("log_bytes_written", "written")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_log_operations_total",
            "mongodb_ss_wt_log",
            "type",
            &[
                ("log_read_operations", "read"),
                ("log_write_operations", "write"),
                ("log_scan_operations", "scan"),
                ("log_scan_records_requiring_two_reads", "scan_double"),
                ("log_sync_operations", "sync"),
                ("log_sync_dir_operations", "sync_dir"),
                ("log_flush_operations", "flush"),
            ],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_log_records_scanned_total",
            "mongodb_ss_wt_log",
            "type",
            &[("records_processed_by_log_scan", "scanned")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_log_records_total",
            "mongodb_ss_wt_log",
            "type",
            &[("log_records_compressed", "compressed"), ("log_records_not_compressed", "uncompressed")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_transactions_checkpoint_milliseconds",
            "mongodb_ss_wt_txn_transaction_checkpoint",
            "type",
            &[("min_time_msecs", "min"), ("max_time_msecs", "max")],
        ),
        R::prefix_suffix_mapped(
            "mongodb_mongod_wiredtiger_transactions_total",
            "mongodb_ss_wt_txn",
            "type",
            &[
                ("transaction_begins", "begins"),
                ("transaction_checkpoints", "checkpoints"),
                ("transactions_committed", "committed"),
                ("transactions_rolled_back", "rolled_back"),
            ],
        ),
    ]
}
