use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use semsearch::embedder::openai::OpenAiEmbedder;
use semsearch::{embed_articles_file, list_article_files, FileOutcome, OUTPUT_SUBDIR};

#[derive(Parser, Debug)]
#[command(
    name = "semsearch-embedder",
    about = "Batch-embed article JSON files for semantic search"
)]
struct EmbedCli {
    /// Directory containing the source article JSON files
    #[arg(long, env = "SEMSEARCH_ARTICLES_DIR", default_value = "articles")]
    articles: PathBuf,

    /// OpenAI API key used for embedding calls
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: String,

    /// Embedding model identifier (e.g. text-embedding-3-small)
    #[arg(
        long,
        env = "SEMSEARCH_OPENAI_MODEL",
        default_value = "text-embedding-3-small"
    )]
    openai_model: String,

    /// Optional dimension override when supported by the model
    #[arg(long, env = "SEMSEARCH_OPENAI_DIMENSIONS")]
    openai_dimensions: Option<usize>,

    /// Base URL for the OpenAI-compatible API
    #[arg(
        long,
        env = "SEMSEARCH_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    openai_base_url: String,

    /// Max number of texts to send per embedding request
    #[arg(long, env = "SEMSEARCH_OPENAI_BATCH", default_value_t = 32)]
    batch_size: usize,

    /// Max seconds to wait for each embedding request
    #[arg(long, env = "SEMSEARCH_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    openai_timeout_secs: u64,

    /// Number of retries for rate limits or transient errors
    #[arg(long, env = "SEMSEARCH_OPENAI_MAX_RETRIES", default_value_t = 5)]
    max_retries: usize,
}

fn main() -> Result<()> {
    let cli = EmbedCli::parse();
    let embedder = OpenAiEmbedder::new(
        cli.openai_api_key,
        cli.openai_base_url,
        cli.openai_model,
        cli.openai_dimensions,
        Duration::from_secs(cli.openai_timeout_secs.max(1)),
        cli.max_retries.max(1),
        cli.batch_size.max(1),
    )?;

    let files = list_article_files(&cli.articles)?;
    if files.is_empty() {
        println!(
            "No .json article files found in {}; nothing to embed.",
            cli.articles.display()
        );
        return Ok(());
    }

    let mut files_processed = 0usize;
    let mut files_skipped = 0usize;
    let mut files_failed = 0usize;
    let mut articles_embedded = 0usize;

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        eprintln!("--- processing {name} ---");
        match embed_articles_file(&embedder, path) {
            Ok(FileOutcome::Written {
                output_path,
                total,
                embedded,
            }) => {
                files_processed += 1;
                articles_embedded += embedded;
                eprintln!(
                    "embedded {embedded} of {total} articles -> {}",
                    output_path.display()
                );
            }
            Ok(FileOutcome::SkippedMalformed) => {
                files_skipped += 1;
                eprintln!("skipping {name}: malformed JSON or not a top-level array");
            }
            Ok(FileOutcome::SkippedEmpty) => {
                files_skipped += 1;
                eprintln!("skipping {name}: no articles in file");
            }
            Ok(FileOutcome::SkippedNoText) => {
                files_skipped += 1;
                eprintln!("skipping {name}: no article carries embeddable text");
            }
            Err(err) => {
                files_failed += 1;
                eprintln!("failed {name}: {err:#}; continuing with remaining files");
            }
        }
    }

    println!(
        "Embedding complete: {files_processed} file(s) written, {files_skipped} skipped, \
         {files_failed} failed, {articles_embedded} article(s) embedded."
    );
    println!(
        "Embedded files are in {}.",
        cli.articles.join(OUTPUT_SUBDIR).display()
    );
    if articles_embedded == 0 {
        eprintln!("no articles qualified for embedding; check the input files if this is unexpected.");
    }
    Ok(())
}
