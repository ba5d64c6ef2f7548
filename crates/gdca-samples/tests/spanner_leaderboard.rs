//! Leaderboard commands against a live Spanner instance. End-to-end only.

use gdca_gcp::spanner::SpannerClient;
use gdca_gcp::GcpClient;
use gdca_samples::spanner::leaderboard::{self, Command};
use gdca_testutil::context::ENV_SPANNER;
use gdca_testutil::{RetryPolicy, TestContext};
use std::time::Duration;

const STEP: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(1));

async fn run_step(client: &GcpClient, command: Command, database: &str, timespan: i64) -> String {
    STEP.run(|_| {
        let mut client = client.clone();
        async move {
            let mut out = Vec::new();
            leaderboard::run(&mut client, &mut out, command, database, timespan).await?;
            Ok::<_, gdca_gcp::GcpError>(String::from_utf8_lossy(&out).into_owned())
        }
    })
    .await
    .unwrap_or_else(|e| panic!("{}: {}", command, e))
}

#[tokio::test]
async fn leaderboard_commands() {
    let Some(tc) = TestContext::end_to_end() else { return };
    let Some(instance) = TestContext::env(ENV_SPANNER) else {
        log::info!("skipping leaderboard test: {} is not set", ENV_SPANNER);
        return;
    };
    assert!(
        instance.starts_with("projects/"),
        "{} must be projects/PROJECT_ID/instances/INSTANCE_ID",
        ENV_SPANNER
    );
    let database = format!("{}/databases/test-l-{}", instance, tc.project_id);
    let mut client = tc.client().unwrap();

    // Left over from an interrupted run.
    if let Ok(db) = SpannerClient::get_database(&mut client, &database).await {
        let dropped = SpannerClient::drop_database(&mut client, &database).await;
        log::info!("database {} exists in state {}; drop: {:?}", db.name, db.state, dropped);
    }

    let mut out = Vec::new();
    leaderboard::run(&mut client, &mut out, Command::CreateDatabase, &database, 0)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), format!("Created database [{}]\n", database));

    let players = run_step(&client, Command::InsertPlayers, &database, 0).await;
    assert!(players.contains("Inserted players count: 100"), "got {:?}", players);
    let scores = run_step(&client, Command::InsertScores, &database, 0).await;
    assert!(scores.contains("Inserted scores count: 400"), "got {:?}", scores);
    let top = run_step(&client, Command::Query, &database, 0).await;
    assert_eq!(top.lines().count(), 10);
    assert!(top.lines().all(|l| l.starts_with("PlayerId: ")));
    run_step(&client, Command::QueryWithTimespan, &database, 168).await;

    STEP.run(|_| {
        let mut client = client.clone();
        let database = database.clone();
        async move { SpannerClient::drop_database(&mut client, &database).await }
    })
    .await
    .unwrap();
}
