// crates/omf-sender-cli/src/summary.rs
// ============================================================================
// Module: Run Summary
// Description: JSON rendering of a finished run for stdout.
// Dependencies: omf-sender-core, serde_json
// ============================================================================

//! ## Overview
//! The summary is a single JSON object so scripts can inspect a run without
//! parsing the event log on stderr. `failure_count` is exact; `failures` holds
//! only the most recent failures the report retained.

use omf_sender_core::RunReport;
use serde_json::Value;
use serde_json::json;

/// Renders `report` as a JSON summary.
#[must_use]
pub fn report_summary(report: &RunReport) -> Value {
    let destinations: Vec<Value> = report
        .destinations
        .iter()
        .map(|destination| {
            let failures: Vec<Value> = destination
                .failures
                .iter()
                .map(|failure| {
                    json!({
                        "message_type": failure.message_type.as_str(),
                        "action": failure.action.as_str(),
                        "kind": failure.error.kind_label(),
                        "error": failure.error.to_string(),
                    })
                })
                .collect();
            json!({
                "name": destination.name.as_str(),
                "phase": destination.phase,
                "accepted": destination.accepted,
                "duplicates": destination.duplicates,
                "failure_count": destination.failure_count,
                "failures": failures,
                "cleanup_failures": destination.cleanup_failures,
            })
        })
        .collect();
    json!({
        "success": report.success(),
        "failed_destinations": report.failed_count(),
        "cycles_completed": report.cycles_completed,
        "cancelled": report.cancelled,
        "destinations": destinations,
    })
}
