//! A game leaderboard on Cloud Spanner: players, their scores, and the
//! top-ten queries over them.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gdca_gcp::spanner::{
    parse_database_name, ResultSet, SpannerClient, Statement, TransactionSelector,
};
use gdca_gcp::{GcpClient, GcpError, GcpResult};
use rand::Rng;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

const PLAYERS_PER_BATCH: i64 = 100;
const SCORES_PER_PLAYER: usize = 4;
const OPERATION_POLLS: u32 = 60;
const OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

const TOP_TEN: &str = "SELECT p.PlayerId, p.PlayerName, s.Score, s.Timestamp \
    FROM Players p JOIN Scores s ON p.PlayerId = s.PlayerId \
    ORDER BY s.Score DESC LIMIT 10";

const TOP_TEN_WITHIN_TIMESPAN: &str = "SELECT p.PlayerId, p.PlayerName, s.Score, s.Timestamp \
    FROM Players p JOIN Scores s ON p.PlayerId = s.PlayerId \
    WHERE s.Timestamp > TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL @Timespan HOUR) \
    ORDER BY s.Score DESC LIMIT 10";

fn schema() -> Vec<String> {
    vec![
        "CREATE TABLE Players (
            PlayerId INT64 NOT NULL,
            PlayerName STRING(2048) NOT NULL
        ) PRIMARY KEY(PlayerId)"
            .to_string(),
        "CREATE TABLE Scores (
            PlayerId INT64 NOT NULL,
            Score INT64 NOT NULL,
            Timestamp TIMESTAMP NOT NULL OPTIONS(allow_commit_timestamp=true)
        ) PRIMARY KEY(PlayerId, Timestamp),
        INTERLEAVE IN PARENT Players ON DELETE NO ACTION"
            .to_string(),
    ]
}

// ── Commands ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CreateDatabase,
    InsertPlayers,
    InsertScores,
    Query,
    QueryWithTimespan,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::CreateDatabase,
        Command::InsertPlayers,
        Command::InsertScores,
        Command::Query,
        Command::QueryWithTimespan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::CreateDatabase => "createdatabase",
            Command::InsertPlayers => "insertplayers",
            Command::InsertScores => "insertscores",
            Command::Query => "query",
            Command::QueryWithTimespan => "querywithtimespan",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = GcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GcpError::config(&format!("Unknown command {:?}", s)))
    }
}

/// Run one leaderboard command against `database`
/// (`projects/P/instances/I/databases/D`). `timespan` is in hours and is
/// only used by [`Command::QueryWithTimespan`].
pub async fn run(
    client: &mut GcpClient,
    w: &mut impl Write,
    command: Command,
    database: &str,
    timespan: i64,
) -> GcpResult<()> {
    parse_database_name(database)?;
    match command {
        Command::CreateDatabase => create_database(client, w, database).await,
        Command::InsertPlayers => insert_players(client, w, database).await,
        Command::InsertScores => insert_scores(client, w, database).await,
        Command::Query => query(client, w, database).await,
        Command::QueryWithTimespan => {
            if timespan <= 0 {
                return Err(GcpError::config(
                    "querywithtimespan requires a positive timespan in hours",
                ));
            }
            query_with_timespan(client, w, database, timespan).await
        }
    }
}

// ── Samples ─────────────────────────────────────────────────────────

pub async fn create_database(client: &mut GcpClient, w: &mut impl Write, database: &str) -> GcpResult<()> {
    let (instance, database_id) = parse_database_name(database)?;
    let op = SpannerClient::create_database(client, instance, database_id, &schema())
        .await
        .map_err(|e| e.with_method("CreateDatabase"))?;
    SpannerClient::wait_for_operation(client, &op.name, OPERATION_POLLS, OPERATION_POLL_INTERVAL)
        .await
        .map_err(|e| e.with_method("CreateDatabase.Wait"))?;
    writeln!(w, "Created database [{}]", database)?;
    Ok(())
}

/// Insert the next hundred players, named after their ordinal.
pub async fn insert_players(client: &mut GcpClient, w: &mut impl Write, database: &str) -> GcpResult<()> {
    let inserted = in_read_write_transaction(client, database, |client, session, txn| {
        Box::pin(async move {
            let counted = SpannerClient::execute_sql(
                client,
                &session,
                &txn,
                &Statement::new("SELECT Count(PlayerId) as PlayerCount FROM Players"),
                1,
            )
            .await?;
            let existing = counted.int64(0, 0)?;

            let statements = player_statements(existing);
            let counts = SpannerClient::execute_batch_dml(client, &session, &txn, &statements, 2).await?;
            Ok(counts.iter().sum::<i64>())
        })
    })
    .await
    .map_err(|e| e.with_method("ReadWriteTransaction"))?;
    writeln!(w, "Inserted players count: {}", inserted)?;
    Ok(())
}

/// Give every player four random scores at random times in the past year.
pub async fn insert_scores(client: &mut GcpClient, w: &mut impl Write, database: &str) -> GcpResult<()> {
    let inserted = in_read_write_transaction(client, database, |client, session, txn| {
        Box::pin(async move {
            let players = SpannerClient::execute_sql(
                client,
                &session,
                &txn,
                &Statement::new("SELECT p.PlayerId FROM Players p"),
                1,
            )
            .await?;
            let statements = score_statements(&players, Utc::now())?;
            if statements.is_empty() {
                return Ok(0);
            }
            let counts = SpannerClient::execute_batch_dml(client, &session, &txn, &statements, 2).await?;
            Ok(counts.iter().sum::<i64>())
        })
    })
    .await
    .map_err(|e| e.with_method("ReadWriteTransaction"))?;
    writeln!(w, "Inserted scores count: {}", inserted)?;
    Ok(())
}

/// Four random scores for every player in `players`, timestamped within
/// the year before `now`.
fn score_statements(players: &ResultSet, now: DateTime<Utc>) -> GcpResult<Vec<Statement>> {
    let mut rng = rand::thread_rng();
    let mut statements = Vec::with_capacity(players.rows.len() * SCORES_PER_PLAYER);
    for row in 0..players.rows.len() {
        let player_id = players.int64(row, 0)?;
        for _ in 0..SCORES_PER_PLAYER {
            let score = rng.gen_range(1_000..1_000_001);
            let timestamp = now - ChronoDuration::seconds(rng.gen_range(1..365 * 24 * 3600));
            statements.push(
                Statement::new(
                    "INSERT INTO Scores (PlayerId, Score, Timestamp) VALUES (@playerID, @score, @timestamp)",
                )
                .bind_int64("playerID", player_id)
                .bind_int64("score", score)
                .bind_timestamp("timestamp", timestamp),
            );
        }
    }
    Ok(statements)
}

/// Players `existing + 1 ..= existing + 100` with random IDs.
fn player_statements(existing: i64) -> Vec<Statement> {
    let mut rng = rand::thread_rng();
    (1..=PLAYERS_PER_BATCH)
        .map(|n| {
            Statement::new("INSERT INTO Players (PlayerId, PlayerName) VALUES (@playerID, @playerName)")
                .bind_int64("playerID", rng.gen_range(1_000_000_000..i64::MAX))
                .bind_string("playerName", &format!("Player {}", existing + n))
        })
        .collect()
}

/// The ten highest scores of all time.
pub async fn query(client: &mut GcpClient, w: &mut impl Write, database: &str) -> GcpResult<()> {
    let rows = read_only_query(client, database, &Statement::new(TOP_TEN))
        .await
        .map_err(|e| e.with_method("Query"))?;
    write_scores(w, &rows)
}

/// The ten highest scores of the last `timespan` hours.
pub async fn query_with_timespan(
    client: &mut GcpClient,
    w: &mut impl Write,
    database: &str,
    timespan: i64,
) -> GcpResult<()> {
    let stmt = Statement::new(TOP_TEN_WITHIN_TIMESPAN).bind_int64("Timespan", timespan);
    let rows = read_only_query(client, database, &stmt)
        .await
        .map_err(|e| e.with_method("Query"))?;
    write_scores(w, &rows)
}

// ── Helpers ─────────────────────────────────────────────────────────

type TxnFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = GcpResult<T>> + 'a>>;

/// Run `body` in a read-write transaction on a fresh session, committing on
/// success and rolling back on failure. The session is always deleted.
async fn in_read_write_transaction<T, F>(client: &mut GcpClient, database: &str, body: F) -> GcpResult<T>
where
    F: for<'c> FnOnce(&'c mut GcpClient, String, TransactionSelector) -> TxnFuture<'c, T>,
{
    let session = SpannerClient::create_session(client, database).await?;
    let result = async {
        let txn = SpannerClient::begin_transaction(client, &session.name).await?;
        match body(client, session.name.clone(), TransactionSelector::Id(txn.id.clone())).await {
            Ok(value) => {
                SpannerClient::commit(client, &session.name, &txn.id).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = SpannerClient::rollback(client, &session.name, &txn.id).await {
                    log::warn!("rollback of {} failed: {}", session.name, rollback);
                }
                Err(e)
            }
        }
    }
    .await;
    if let Err(e) = SpannerClient::delete_session(client, &session.name).await {
        log::warn!("deleting session {} failed: {}", session.name, e);
    }
    result
}

async fn read_only_query(client: &mut GcpClient, database: &str, stmt: &Statement) -> GcpResult<ResultSet> {
    let session = SpannerClient::create_session(client, database).await?;
    let result =
        SpannerClient::execute_sql(client, &session.name, &TransactionSelector::SingleUseReadOnly, stmt, 1)
            .await;
    if let Err(e) = SpannerClient::delete_session(client, &session.name).await {
        log::warn!("deleting session {} failed: {}", session.name, e);
    }
    result
}

fn write_scores(w: &mut impl Write, rows: &ResultSet) -> GcpResult<()> {
    for row in 0..rows.rows.len() {
        let player_id = rows.int64(row, 0)?;
        let name = rows.string(row, 1).unwrap_or_default();
        let score = rows.int64(row, 2)?;
        let timestamp = rows.string(row, 3).unwrap_or_default();
        writeln!(
            w,
            "PlayerId: {}  PlayerName: {}  Score: {}  Timestamp: {}",
            player_id,
            name,
            with_commas(score),
            date_of(timestamp)
        )?;
    }
    Ok(())
}

/// `1234567` → `1,234,567`.
fn with_commas(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The calendar date of an RFC 3339 timestamp; unparseable input is echoed.
fn date_of(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
