//! Cloud Spanner client.
//!
//! Database administration plus the session / transaction / SQL surface
//! of the data API.
//!
//! API base: `https://spanner.googleapis.com/v1`

use crate::client::GcpClient;
use crate::error::{GcpError, GcpResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "spanner";
const V1: &str = "/v1";

// ── Admin types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub name: String,
    /// CREATING, READY, READY_OPTIMIZING
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

/// Long-running admin operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDatabaseRequest<'a> {
    create_statement: String,
    extra_statements: &'a [String],
}

// ── Data types ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Base64 transaction ID.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub read_timestamp: Option<String>,
}

/// Which transaction a statement runs in.
#[derive(Debug, Clone)]
pub enum TransactionSelector {
    /// A strong single-use read-only transaction.
    SingleUseReadOnly,
    /// A transaction started with `begin_transaction`.
    Id(String),
}

impl Serialize for TransactionSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            Self::SingleUseReadOnly => {
                serde_json::json!({ "singleUse": { "readOnly": { "strong": true } } })
            }
            Self::Id(id) => serde_json::json!({ "id": id }),
        };
        value.serialize(serializer)
    }
}

/// A SQL statement with typed parameters.
///
/// Spanner's JSON encoding sends INT64 as a decimal string and TIMESTAMP as
/// RFC 3339, so every parameter carries its type code.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub sql: String,
    params: serde_json::Map<String, serde_json::Value>,
    param_types: serde_json::Map<String, serde_json::Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    fn bind(mut self, name: &str, value: serde_json::Value, code: &str) -> Self {
        self.params.insert(name.to_string(), value);
        self.param_types
            .insert(name.to_string(), serde_json::json!({ "code": code }));
        self
    }

    pub fn bind_int64(self, name: &str, value: i64) -> Self {
        self.bind(name, serde_json::Value::String(value.to_string()), "INT64")
    }

    pub fn bind_string(self, name: &str, value: &str) -> Self {
        self.bind(name, serde_json::Value::String(value.to_string()), "STRING")
    }

    pub fn bind_timestamp(self, name: &str, value: chrono::DateTime<chrono::Utc>) -> Self {
        self.bind(
            name,
            serde_json::Value::String(value.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
            "TIMESTAMP",
        )
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteSqlRequest<'a> {
    transaction: &'a TransactionSelector,
    sql: &'a str,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    params: &'a serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    param_types: &'a serde_json::Map<String, serde_json::Value>,
    seqno: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchStatement<'a> {
    sql: &'a str,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    params: &'a serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    param_types: &'a serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteBatchDmlRequest<'a> {
    transaction: &'a TransactionSelector,
    statements: Vec<BatchStatement<'a>>,
    seqno: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteBatchDmlResponse {
    #[serde(default)]
    result_sets: Vec<ResultSet>,
    #[serde(default)]
    status: Option<RpcStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructType {
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetadata {
    #[serde(default)]
    pub row_type: Option<StructType>,
    #[serde(default)]
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetStats {
    /// DML: exact number of rows modified (decimal string).
    #[serde(default)]
    pub row_count_exact: Option<String>,
}

/// Result of `executeSql`: typed metadata plus rows of JSON values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    #[serde(default)]
    pub metadata: Option<ResultSetMetadata>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub stats: Option<ResultSetStats>,
}

impl ResultSet {
    /// Column position by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.metadata
            .as_ref()?
            .row_type
            .as_ref()?
            .fields
            .iter()
            .position(|f| f.name == name)
    }

    /// Rows modified by a DML statement (0 for queries).
    pub fn row_count(&self) -> i64 {
        self.stats
            .as_ref()
            .and_then(|s| s.row_count_exact.as_deref())
            .and_then(|c| c.parse().ok())
            .unwrap_or(0)
    }

    /// A cell as a string. INT64, TIMESTAMP and STRING all arrive as JSON strings.
    pub fn string(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_str()
    }

    /// A cell decoded as INT64.
    pub fn int64(&self, row: usize, column: usize) -> GcpResult<i64> {
        let raw = self
            .string(row, column)
            .ok_or_else(|| GcpError::decode(SERVICE, format!("no value at ({}, {})", row, column)))?;
        raw.parse()
            .map_err(|e| GcpError::decode(SERVICE, format!("INT64 {:?}: {}", raw, e)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

/// Split `projects/p/instances/i/databases/d` into instance and database ID.
pub fn parse_database_name(name: &str) -> GcpResult<(&str, &str)> {
    match name.rsplit_once("/databases/") {
        Some((instance, id))
            if instance.starts_with("projects/")
                && instance.contains("/instances/")
                && !id.is_empty()
                && !id.contains('/') =>
        {
            Ok((instance, id))
        }
        _ => Err(GcpError::config(&format!(
            "Invalid database id {:?}: expected projects/P/instances/I/databases/D",
            name
        ))),
    }
}

/// google.rpc.Code as its canonical name.
fn rpc_code_name(code: i32) -> &'static str {
    match code {
        1 => "CANCELLED",
        3 => "INVALID_ARGUMENT",
        4 => "DEADLINE_EXCEEDED",
        5 => "NOT_FOUND",
        6 => "ALREADY_EXISTS",
        7 => "PERMISSION_DENIED",
        8 => "RESOURCE_EXHAUSTED",
        9 => "FAILED_PRECONDITION",
        10 => "ABORTED",
        14 => "UNAVAILABLE",
        _ => "UNKNOWN",
    }
}

fn batch_row_counts(resp: ExecuteBatchDmlResponse) -> GcpResult<Vec<i64>> {
    if let Some(status) = resp.status.filter(|s| s.code != 0) {
        return Err(GcpError::new(
            SERVICE,
            0,
            rpc_code_name(status.code),
            &format!(
                "statement {} of batch failed: {}",
                resp.result_sets.len() + 1,
                status.message
            ),
        ));
    }
    Ok(resp.result_sets.iter().map(ResultSet::row_count).collect())
}

// ── Spanner Client ──────────────────────────────────────────────────────

pub struct SpannerClient;

impl SpannerClient {
    // ── Databases ───────────────────────────────────────────────────

    /// Start creating a database with the given DDL. Returns the operation.
    pub async fn create_database(
        client: &mut GcpClient,
        instance: &str,
        database_id: &str,
        extra_statements: &[String],
    ) -> GcpResult<Operation> {
        let path = format!("{}/{}/databases", V1, instance);
        let body = CreateDatabaseRequest {
            create_statement: format!("CREATE DATABASE `{}`", database_id),
            extra_statements,
        };
        client.post(SERVICE, &path, &body).await
    }

    /// Poll an admin operation until done.
    pub async fn wait_for_operation(
        client: &mut GcpClient,
        operation_name: &str,
        max_polls: u32,
        poll_interval: Duration,
    ) -> GcpResult<Operation> {
        let path = format!("{}/{}", V1, operation_name);
        let value = client
            .wait_for_operation(SERVICE, &path, max_polls, poll_interval)
            .await?;
        serde_json::from_value(value).map_err(|e| GcpError::decode(SERVICE, e))
    }

    pub async fn get_database(client: &mut GcpClient, name: &str) -> GcpResult<Database> {
        let path = format!("{}/{}", V1, name);
        client.get(SERVICE, &path, &[]).await
    }

    pub async fn drop_database(client: &mut GcpClient, name: &str) -> GcpResult<()> {
        let path = format!("{}/{}", V1, name);
        client.delete(SERVICE, &path, &[]).await?;
        Ok(())
    }

    // ── Sessions & transactions ─────────────────────────────────────

    pub async fn create_session(client: &mut GcpClient, database: &str) -> GcpResult<Session> {
        let path = format!("{}/{}/sessions", V1, database);
        client.post(SERVICE, &path, &serde_json::json!({})).await
    }

    pub async fn delete_session(client: &mut GcpClient, session: &str) -> GcpResult<()> {
        let path = format!("{}/{}", V1, session);
        client.delete(SERVICE, &path, &[]).await?;
        Ok(())
    }

    /// Begin a read-write transaction.
    pub async fn begin_transaction(client: &mut GcpClient, session: &str) -> GcpResult<Transaction> {
        let path = format!("{}/{}:beginTransaction", V1, session);
        let body = serde_json::json!({ "options": { "readWrite": {} } });
        client.post(SERVICE, &path, &body).await
    }

    /// Execute a query or DML statement. `seqno` must increase within a
    /// transaction so DML replays are detected.
    pub async fn execute_sql(
        client: &mut GcpClient,
        session: &str,
        transaction: &TransactionSelector,
        statement: &Statement,
        seqno: i64,
    ) -> GcpResult<ResultSet> {
        let path = format!("{}/{}:executeSql", V1, session);
        let body = ExecuteSqlRequest {
            transaction,
            sql: &statement.sql,
            params: &statement.params,
            param_types: &statement.param_types,
            seqno: seqno.to_string(),
        };
        client.post(SERVICE, &path, &body).await
    }

    /// Execute DML statements in order within one request. Stops at the
    /// first failing statement; returns the rows modified by each.
    pub async fn execute_batch_dml(
        client: &mut GcpClient,
        session: &str,
        transaction: &TransactionSelector,
        statements: &[Statement],
        seqno: i64,
    ) -> GcpResult<Vec<i64>> {
        let path = format!("{}/{}:executeBatchDml", V1, session);
        let body = ExecuteBatchDmlRequest {
            transaction,
            statements: statements
                .iter()
                .map(|s| BatchStatement {
                    sql: &s.sql,
                    params: &s.params,
                    param_types: &s.param_types,
                })
                .collect(),
            seqno: seqno.to_string(),
        };
        let resp: ExecuteBatchDmlResponse = client.post(SERVICE, &path, &body).await?;
        batch_row_counts(resp)
    }

    pub async fn commit(
        client: &mut GcpClient,
        session: &str,
        transaction_id: &str,
    ) -> GcpResult<CommitResponse> {
        let path = format!("{}/{}:commit", V1, session);
        let body = serde_json::json!({ "transactionId": transaction_id });
        client.post(SERVICE, &path, &body).await
    }

    pub async fn rollback(client: &mut GcpClient, session: &str, transaction_id: &str) -> GcpResult<()> {
        let path = format!("{}/{}:rollback", V1, session);
        let body = serde_json::json!({ "transactionId": transaction_id });
        client.post_text(SERVICE, &path, &body).await?;
        Ok(())
    }
}
