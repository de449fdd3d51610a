//! Cothority CLI entry point.
//!
//! Three verbs: bootstrap a roster and chain (`skipstart`), run one full
//! SAVE pipeline (`save`), and walk the chain for a prior artifact
//! (`retrieve`). Every node in the federation is simulated within this one
//! process (`spec.md` §1: tree-overlay messaging substrate, realized here
//! over [`cothority_transport::LoopbackOverlay`] rather than a real
//! `TcpOverlay`), so each subcommand bootstraps or reloads the whole
//! roster's state from `--storage-dir` before driving its protocol round.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod retrieve;
mod save;
mod skipstart;

#[derive(Parser)]
#[command(name = "cothority")]
#[command(about = "Censorship-resistant web archiving cothority", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit structured JSON logs instead of plain text.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Where per-node state (keys, run config, chain) lives.
    #[arg(long, global = true, default_value = ".cothority")]
    storage_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a roster of `nodes` servers, run Setup, and create the
    /// genesis chain block.
    Skipstart {
        /// Number of nodes in the simulated federation.
        #[arg(short, long, default_value_t = 4)]
        nodes: u16,
    },
    /// Fetch `url`, run the full Structured Consensus → Threshold Decrypt →
    /// Reconstruction → collective-signing pipeline, and append it to the
    /// chain.
    Save {
        url: String,
        /// MIME type recorded alongside the saved page.
        #[arg(long, default_value = "text/html")]
        content_type: String,
        /// Sub-resource urls to archive via Unstructured Consensus.
        #[arg(long = "sub-resource")]
        sub_resources: Vec<String>,
    },
    /// Retrieve the latest signed artifact for `url` as of `timestamp`
    /// (`YYYY/MM/DD HH:MM`, defaults to now).
    Retrieve {
        url: String,
        #[arg(short, long)]
        timestamp: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let result = match cli.command {
        Commands::Skipstart { nodes } => skipstart::run(&cli.storage_dir, nodes).await,
        Commands::Save { url, content_type, sub_resources } => {
            save::run(&cli.storage_dir, &url, &content_type, sub_resources).await
        }
        Commands::Retrieve { url, timestamp } => retrieve::run(&cli.storage_dir, &url, timestamp.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_skipstart_with_node_count() {
        let cli = Cli::try_parse_from(["cothority", "skipstart", "--nodes", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Skipstart { nodes: 5 }));
    }

    #[test]
    fn parses_save_with_sub_resources() {
        let cli = Cli::try_parse_from([
            "cothority",
            "save",
            "http://example.test/",
            "--sub-resource",
            "http://example.test/a.png",
            "--sub-resource",
            "http://example.test/b.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Save { url, sub_resources, .. } => {
                assert_eq!(url, "http://example.test/");
                assert_eq!(sub_resources.len(), 2);
            }
            _ => panic!("expected Save"),
        }
    }

    #[test]
    fn parses_retrieve_without_timestamp() {
        let cli = Cli::try_parse_from(["cothority", "retrieve", "http://example.test/"]).unwrap();
        match cli.command {
            Commands::Retrieve { url, timestamp } => {
                assert_eq!(url, "http://example.test/");
                assert!(timestamp.is_none());
            }
            _ => panic!("expected Retrieve"),
        }
    }
}
