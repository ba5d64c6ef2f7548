//! Lists the GKE clusters of a project in one location.

use anyhow::{Context, Result};
use clap::Parser;
use gdca_gcp::GcpClient;
use gdca_samples::container::listclusters;

#[derive(Parser, Debug)]
#[command(name = "listclusters", version, about, long_about = None)]
struct Cli {
    /// Project containing the clusters; defaults to the client's project.
    #[arg(long, env = "GDCA_SAMPLES_PROJECT_ID")]
    project: Option<String>,

    /// Zone or region; `-` lists every location.
    #[arg(long, short = 'z', default_value = "-")]
    zone: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gdca_samples::init_tracing();

    let mut client = GcpClient::from_env().context("creating client")?;
    let project = cli.project.unwrap_or_else(|| client.project_id().to_string());

    let mut out = std::io::stdout().lock();
    let clusters = listclusters::list_clusters(&mut client, &mut out, &project, &cli.zone).await?;
    log::info!("{} cluster(s) in {}", clusters.len(), cli.zone);
    Ok(())
}
