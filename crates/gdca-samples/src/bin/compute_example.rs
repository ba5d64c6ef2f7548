//! Lists the project's instances in every zone, then prints `SUCCESS`.

use anyhow::{Context, Result};
use clap::Parser;
use gdca_gcp::GcpClient;
use gdca_samples::compute::instances;
use std::io::Write;

#[derive(Parser, Debug)]
#[command(name = "compute-example", version, about, long_about = None)]
struct Cli {
    /// Project to list; defaults to the client's project.
    #[arg(long, env = "GDCA_SAMPLES_PROJECT_ID")]
    project: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gdca_samples::init_tracing();

    let mut client = GcpClient::from_env().context("creating client")?;
    let project = cli.project.unwrap_or_else(|| client.project_id().to_string());
    log::info!("listing instances of {}", project);

    let mut out = std::io::stdout().lock();
    instances::aggregated_list(&mut client, &mut out, &project).await?;
    writeln!(out, "SUCCESS")?;
    Ok(())
}
