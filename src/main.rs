use anyhow::Result;
use clap::{Parser, Subcommand};
use cmk_client::CmkClient;
use cmk_config::CmkConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cmk")]
#[command(about = "CheckMK REST API diagnostics client", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the candidate API base URLs and print the detection trace
    Detect,

    /// Fetch the server version object
    Version,

    /// Perform a GET against an API path
    Get {
        /// Path relative to the detected API root, e.g. objects/host/h1
        path: String,

        /// Column to request; may be repeated
        #[arg(short, long)]
        columns: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    // Connection parameters come from CHECKMK_* environment variables
    let config = CmkConfig::from_env()?;
    info!("Using CheckMK server: {}", config.server_url);
    let client = CmkClient::new(config)?;

    match cli.command {
        Commands::Detect => {
            let detection = client.detection().await;
            for attempt in &detection.attempts {
                println!("{}: {}", attempt.candidate, attempt.outcome);
            }
            if detection.fallback {
                println!(
                    "No candidate answered, using fallback: {}",
                    detection.base_url
                );
            } else {
                println!("Detected API base URL: {}", detection.base_url);
            }
        }
        Commands::Version => {
            let envelope = client.get("version", None).await?;
            println!("{}", serde_json::to_string_pretty(&envelope.data)?);
        }
        Commands::Get { path, columns } => {
            let params = if columns.is_empty() {
                None
            } else {
                Some(vec![("columns".to_string(), serde_json::json!(columns))])
            };
            let envelope = client.get(&path, params).await?;
            println!("{}", serde_json::to_string_pretty(&envelope.data)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
