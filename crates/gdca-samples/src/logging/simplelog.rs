//! Writing to and deleting a Cloud Logging log.

use gdca_gcp::logging::{LogEntry, LoggingClient};
use gdca_gcp::{GcpClient, GcpResult};
use serde_json::json;
use std::io::Write;

/// Log written by these samples.
pub const LOG_ID: &str = "my-log";

/// The entries written by [`write_entry`]: plain text at DEFAULT and ERROR.
fn text_entries() -> Vec<LogEntry> {
    vec![
        LogEntry::text("Anything"),
        LogEntry::text("The payload can be any type!").with_severity("ERROR"),
    ]
}

/// A JSON payload written by [`structured_write`].
fn structured_entry() -> LogEntry {
    LogEntry::json(json!({
        "name": "Bob",
        "count": 3,
    }))
    .with_severity("INFO")
}

pub async fn write_entry(client: &mut GcpClient, w: &mut impl Write, project_id: &str) -> GcpResult<()> {
    let entries = text_entries();
    LoggingClient::write_entries(client, project_id, LOG_ID, &entries)
        .await
        .map_err(|e| e.with_method("Logger.Log"))?;
    writeln!(w, "Wrote {} entries to {}", entries.len(), LOG_ID)?;
    Ok(())
}

pub async fn structured_write(client: &mut GcpClient, w: &mut impl Write, project_id: &str) -> GcpResult<()> {
    LoggingClient::write_entries(client, project_id, LOG_ID, &[structured_entry()])
        .await
        .map_err(|e| e.with_method("Logger.Log"))?;
    writeln!(w, "Wrote structured entry to {}", LOG_ID)?;
    Ok(())
}

/// Delete the log. Entries written moments ago may not be deletable yet;
/// callers retry.
pub async fn delete_log(client: &mut GcpClient, w: &mut impl Write, project_id: &str) -> GcpResult<()> {
    LoggingClient::delete_log(client, project_id, LOG_ID)
        .await
        .map_err(|e| e.with_method("DeleteLog"))?;
    writeln!(w, "Deleted log {}", LOG_ID)?;
    Ok(())
}
