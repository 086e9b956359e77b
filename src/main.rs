//! # Agentic RAG CLI (`arag`)
//!
//! ## Usage
//!
//! ```bash
//! arag --config ./config/arag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `arag serve` | Wipe session data and start the HTTP server |
//! | `arag ingest <paths...>` | Ingest files into the persistent store |
//! | `arag ask "<query>"` | Run one chat turn and print the answer |
//! | `arag reset` | Delete uploads and the database |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::warn;

use agentic_rag::config::{self, Config, DEFAULT_CONFIG_PATH};
use agentic_rag::extract::FileParser;
use agentic_rag::sqlite_store::SqliteStore;
use agentic_rag::{llm, logging, reset, server};
use agentic_rag_core::llm::LanguageModel;
use agentic_rag_core::store::VectorStore;
use agentic_rag_core::Session;

/// Agentic RAG: chat with your documents through a small team of agents.
#[derive(Parser)]
#[command(
    name = "arag",
    about = "Agentic RAG: chat with your documents through a small team of agents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Uploaded files and the database from any previous run are deleted
    /// first, so each server session starts with an empty knowledge base.
    Serve,

    /// Ingest files into the persistent store.
    Ingest {
        /// Files to parse, chunk, and store.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask one question against the persistent store.
    Ask {
        /// The question.
        query: String,
    },

    /// Delete uploaded files and the database.
    Reset,
}

/// Open the store and wire the standard agents around it.
async fn open_session(cfg: &Config) -> anyhow::Result<(Session, Arc<SqliteStore>)> {
    let store = Arc::new(SqliteStore::open(&cfg.data.db_path, &cfg.embedding).await?);
    let model = llm::create_model(&cfg.llm).unwrap_or_else(|e| -> Arc<dyn LanguageModel> {
        warn!(error = %e, "language model unavailable; answers will report it as not configured");
        Arc::new(llm::DisabledModel)
    });
    let session = Session::standard(
        Arc::new(FileParser),
        store.clone(),
        model,
        cfg.chunking.chunker(),
        cfg.retrieval.top_k,
    );
    Ok((session, store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            reset::clear_session_data(&cfg)?;
            let (session, store) = open_session(&cfg).await?;
            // A database file that survived the wipe still has last session's rows.
            store.reset().await?;
            server::run_server(&cfg, Arc::new(session)).await?;
        }
        Commands::Ingest { paths } => {
            let (session, store) = open_session(&cfg).await?;
            let outcome = session.ingest(paths).await?;
            println!(
                "Ingested {} chunk(s) ({} stored in total).",
                outcome.chunks_added,
                store.count().await?
            );
            store.close().await;
        }
        Commands::Ask { query } => {
            if query.trim().is_empty() {
                bail!("query must not be empty");
            }
            let (session, store) = open_session(&cfg).await?;
            let outcome = session.chat(query.trim()).await?;
            println!("{}", outcome.response.answer);
            if !outcome.response.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &outcome.response.sources {
                    println!("  - {}", source);
                }
            }
            store.close().await;
        }
        Commands::Reset => {
            reset::clear_session_data(&cfg)?;
            println!("Session data cleared.");
        }
    }

    Ok(())
}
