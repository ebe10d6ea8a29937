//! Folio CLI - Command-line interface
//!
//! Usage:
//!   folio ingest <path> [-o Data/Resume.json]
//!   folio upload [Data/Resume.json]
//!   folio search <question>
//!   folio ask <question> [--out reply.mp3]
//!   folio check
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_core::{AppConfig, Section, VectorProvider};
use folio_rag::AvatarPipeline;
use folio_vector::{create_embedder, create_vector_index, pinecone::PineconeControl};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Résumé ingestion and avatar tooling")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract résumé text and write the chunk file
    Ingest {
        /// PDF or text file, or a directory of them
        source: PathBuf,

        /// Chunk file to write
        #[arg(short, long, default_value = "Data/Resume.json")]
        output: PathBuf,

        /// Words per chunk [default: `rag.chunk_size` from the config]
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Embed a chunk file and upsert it into the vector index
    Upload {
        /// Chunk file produced by `ingest`
        #[arg(default_value = "Data/Resume.json")]
        chunks: PathBuf,
    },
    /// Show the chunks closest to a question
    Search {
        /// Question to embed
        question: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
    },
    /// Ask the avatar a question
    Ask {
        /// Question to ask
        question: String,

        /// Number of chunks used as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Write the spoken reply to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Describe the vector index and compare its dimension with the embedder
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        format!("folio={level},folio_parser={level},folio_vector={level},folio_rag={level}")
            .into()
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Ingest {
            source,
            output,
            chunk_size,
        } => ingest(&config, &source, &output, chunk_size)?,
        Commands::Upload { chunks } => upload(&config, &chunks).await?,
        Commands::Search { question, top_k } => search(&config, &question, top_k).await?,
        Commands::Ask {
            question,
            top_k,
            out,
        } => ask(&config, &question, top_k, out.as_deref()).await?,
        Commands::Check => check(&config).await?,
    }

    Ok(())
}

fn ingest(
    config: &AppConfig,
    source: &Path,
    output: &Path,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    let chunk_size = chunk_size.unwrap_or(config.rag.chunk_size);
    println!("Ingesting résumé from: {}", source.display());

    let report = folio_parser::ingest(source, chunk_size)?;
    for (path, reason) in &report.files_skipped {
        println!("  skipped {}: {}", path.display(), reason);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    folio_parser::write_chunks(output, &report.chunks)?;

    println!(
        "Wrote {} chunks ({} words from {} files) to {}",
        report.chunks.len(),
        report.word_count,
        report.files_read.len(),
        output.display()
    );
    Ok(())
}

async fn upload(config: &AppConfig, chunk_file: &Path) -> anyhow::Result<()> {
    config.require(&[Section::VectorIndex, Section::Embedding])?;

    let chunks = folio_parser::read_chunks(chunk_file)?;
    let embedder = create_embedder(&config.embedding, config.vector.dimension).await?;
    let index = create_vector_index(config).await?;

    println!(
        "Uploading {} chunks to {} with {}",
        chunks.len(),
        index.name(),
        embedder.model_name()
    );
    let count = folio_vector::upload_chunks(embedder.as_ref(), index.as_ref(), &chunks).await?;
    println!("Upserted {} vectors", count);
    Ok(())
}

async fn search(config: &AppConfig, question: &str, top_k: usize) -> anyhow::Result<()> {
    config.require(&[Section::VectorIndex, Section::Embedding])?;

    let embedder = create_embedder(&config.embedding, config.vector.dimension).await?;
    let index = create_vector_index(config).await?;

    let results =
        folio_vector::search(embedder.as_ref(), index.as_ref(), question, top_k).await?;
    if results.is_empty() {
        println!("No matches.");
    }
    for (rank, hit) in results.iter().enumerate() {
        println!("{}. [{}] {:.4}  {}", rank + 1, hit.id, hit.score, hit.text);
    }
    Ok(())
}

async fn ask(
    config: &AppConfig,
    question: &str,
    top_k: Option<usize>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    config.require(&[
        Section::VectorIndex,
        Section::Embedding,
        Section::Llm,
        Section::Speech,
    ])?;

    let pipeline = AvatarPipeline::from_config(config).await?;
    let reply = pipeline.chat(question, top_k).await?;

    println!("{}", reply.text);
    println!(
        "\n({} sources, {} ms)",
        reply.sources.len(),
        reply.processing_time_ms
    );

    if let Some(path) = out {
        if reply.audio.is_empty() {
            println!("No audio produced.");
        } else {
            std::fs::write(path, &reply.audio.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Audio ({}) written to {}", reply.audio.mime_type, path.display());
        }
    }
    Ok(())
}

async fn check(config: &AppConfig) -> anyhow::Result<()> {
    config.require(&[Section::VectorIndex])?;
    let expected = config.vector.dimension;

    let actual = if config.vector.provider == VectorProvider::Pinecone {
        let control = PineconeControl::from_config(&config.vector)?;
        let indexes = control.list_indexes().await?;
        println!("Pinecone indexes:");
        for index in &indexes {
            println!(
                "  {} (dimension {}, metric {})",
                index.name,
                index.dimension.map_or("?".to_string(), |d| d.to_string()),
                index.metric.as_deref().unwrap_or("?")
            );
        }

        let name = config.vector.pinecone_index.as_deref().unwrap_or_default();
        let description = control.describe_index(name).await?;
        println!("Using {} at {}", description.name, description.host);
        description.dimension
    } else {
        let index = create_vector_index(config).await?;
        let stats = index.stats().await?;
        println!("{}: {} vectors", index.name(), stats.vector_count);
        stats.dimension
    };

    match actual {
        Some(dim) if dim != expected => {
            tracing::warn!(
                "Index dimension {} differs from embedding dimension {}",
                dim,
                expected
            );
            println!("WARNING: index dimension {dim} != embedding dimension {expected}");
        }
        Some(dim) => println!("Dimension OK ({dim})"),
        None => println!("Index did not report a dimension"),
    }
    Ok(())
}
