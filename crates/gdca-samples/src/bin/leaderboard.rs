//! Leaderboard sample on Cloud Spanner.
//!
//! ```text
//! leaderboard createdatabase projects/P/instances/I/databases/D
//! leaderboard querywithtimespan projects/P/instances/I/databases/D 168
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gdca_gcp::GcpClient;
use gdca_samples::spanner::leaderboard::{self, Command};

#[derive(Parser, Debug)]
#[command(name = "leaderboard", version, about, long_about = None)]
struct Cli {
    /// createdatabase, insertplayers, insertscores, query or querywithtimespan
    command: Command,

    /// projects/P/instances/I/databases/D
    database: String,

    /// Hours to look back for querywithtimespan.
    #[arg(default_value_t = 0)]
    timespan: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gdca_samples::init_tracing();

    let mut client = GcpClient::from_env().context("creating client")?;
    let mut out = std::io::stdout().lock();
    leaderboard::run(&mut client, &mut out, cli.command, &cli.database, cli.timespan)
        .await
        .with_context(|| format!("{} {}", cli.command, cli.database))?;
    Ok(())
}
