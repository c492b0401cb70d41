//! # lexrag CLI (`lexq`)
//!
//! The `lexq` binary is the interactive surface over the lexrag library.
//! It builds the vector index from a document folder and answers legal
//! questions against it, either one-shot or in a multi-turn chat.
//!
//! ## Usage
//!
//! ```bash
//! lexq --config ./config/lexrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lexq init <sources>` | Ingest a document folder and build the index |
//! | `lexq ask "<question>"` | Answer a single question |
//! | `lexq chat` | Interactive multi-turn session |
//! | `lexq search "<query>"` | Show the raw top-k retrieval for a query |

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lexrag::config::{load_config, Config};
use lexrag::embedding::create_embedder;
use lexrag::error::RagError;
use lexrag::generation::create_generator;
use lexrag::models::Turn;
use lexrag::pipeline::RagPipeline;

/// lexrag - conversational retrieval-augmented answering over a legal
/// document corpus.
#[derive(Parser)]
#[command(
    name = "lexq",
    about = "Ask questions against an indexed corpus of legal documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lexrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document folder and build the vector index.
    ///
    /// Scans the folder for PDF, markdown, and plain-text files, chunks
    /// and embeds them, and saves the index to `index.path`. A document
    /// that fails to parse is reported and skipped.
    Init {
        /// Folder containing the corpus documents.
        #[arg(default_value = "./data/docs")]
        sources: PathBuf,
    },

    /// Answer a single question in a fresh session.
    Ask {
        question: String,
    },

    /// Start an interactive multi-turn session. Type `exit` to leave.
    Chat,

    /// Show the raw top-k retrieval for a query, with scores.
    Search {
        query: String,

        /// Number of results to show (defaults to retrieval.top_k).
        #[arg(long)]
        k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexrag=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Init { sources } => run_init(config, &sources).await,
        Commands::Ask { question } => run_ask(config, &question).await,
        Commands::Chat => run_chat(config).await,
        Commands::Search { query, k } => run_search(config, &query, k).await,
    }
}

fn build_pipeline(config: Config) -> Result<RagPipeline> {
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.generation)?;
    Ok(RagPipeline::new(config, embedder, generator))
}

async fn run_init(config: Config, sources: &PathBuf) -> Result<()> {
    let index_path = config.index.path.clone();
    let pipeline = build_pipeline(config)?;

    let report = pipeline
        .initialize(sources)
        .await
        .with_context(|| format!("ingestion failed for {}", sources.display()))?;

    println!("ingest {}", sources.display());
    println!("  documents processed: {}", report.documents_processed);
    println!("  chunks created: {}", report.chunks_created);
    if !report.documents_failed.is_empty() {
        println!("  documents failed: {}", report.documents_failed.len());
        for failed in &report.documents_failed {
            println!("    - {}: {}", failed.id, failed.reason);
        }
    }
    println!("index saved: {}", index_path.display());
    println!("ok");
    Ok(())
}

async fn run_ask(config: Config, question: &str) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    if !pipeline.load_index().await? {
        println!("No index found. Run `lexq init <sources>` first.");
        return Ok(());
    }

    let session = pipeline.create_session();
    match pipeline.answer(&session, question).await {
        Ok(turn) => print_turn(&turn),
        Err(err) => print_answer_error(&err),
    }
    Ok(())
}

async fn run_chat(config: Config) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    if !pipeline.load_index().await? {
        println!("No index found. Run `lexq init <sources>` first.");
        return Ok(());
    }

    let session = pipeline.create_session();
    println!(
        "session {}. Type your question, `history` to review the conversation, `clear` to reset it, `exit` to leave",
        &session[..8]
    );

    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        if question == "clear" {
            pipeline.clear_session(&session)?;
            println!("conversation cleared");
            continue;
        }
        if question == "history" {
            let history = pipeline.get_history(&session)?;
            if history.is_empty() {
                println!("no turns yet");
            }
            for (i, turn) in history.iter().enumerate() {
                println!("{}. you> {}", i + 1, turn.question);
                println!("   lexq> {}", turn.answer);
            }
            continue;
        }

        match pipeline.answer(&session, question).await {
            Ok(turn) => print_turn(&turn),
            Err(err) => print_answer_error(&err),
        }
    }

    Ok(())
}

async fn run_search(config: Config, query: &str, k: Option<usize>) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.top_k);
    let pipeline = build_pipeline(config)?;
    if !pipeline.load_index().await? {
        println!("No index found. Run `lexq init <sources>` first.");
        return Ok(());
    }

    let hits = pipeline.search(query, k).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let excerpt: String = hit.chunk.text.chars().take(160).collect();
        println!("{}. [{:.3}] {}", i + 1, hit.score, hit.chunk.id);
        println!("    excerpt: \"{}\"", excerpt);
        println!();
    }
    Ok(())
}

fn print_turn(turn: &Turn) {
    println!("{}", turn.answer);
    if turn.evidence.is_empty() {
        println!();
        println!("(answered without retrieval support)");
    } else {
        println!();
        println!("sources: {}", turn.evidence.join(", "));
    }
}

fn print_answer_error(err: &RagError) {
    match err {
        RagError::Generation(reason) | RagError::Embedding(reason) => {
            eprintln!("could not generate an answer, please retry ({})", reason);
        }
        other => eprintln!("error: {}", other),
    }
}
