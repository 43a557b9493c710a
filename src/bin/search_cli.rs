use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use semsearch::embedder::openai::OpenAiEmbedder;
use semsearch::{ArticleIndex, SearchService, DEFAULT_TOP_K};

#[derive(Parser, Debug)]
#[command(
    name = "semsearch-cli",
    about = "One-shot semantic search over embedded articles"
)]
struct SearchCli {
    /// Query text to search for
    #[arg(long)]
    query: String,

    /// Number of results to print
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Directory containing the embedded article JSON files
    #[arg(
        long,
        env = "SEMSEARCH_EMBEDDED_DIR",
        default_value = "articles/embedded_articles"
    )]
    embedded_articles: PathBuf,

    /// OpenAI API key used for query embeddings
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: String,

    /// Embedding model identifier
    #[arg(
        long,
        env = "SEMSEARCH_OPENAI_MODEL",
        default_value = "text-embedding-3-small"
    )]
    openai_model: String,

    /// Optional embedding dimension override
    #[arg(long, env = "SEMSEARCH_OPENAI_DIMENSIONS")]
    openai_dimensions: Option<usize>,

    /// Base URL for OpenAI-compatible endpoints
    #[arg(
        long,
        env = "SEMSEARCH_OPENAI_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    openai_base_url: String,

    /// Seconds before embedding requests time out
    #[arg(long, env = "SEMSEARCH_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    openai_timeout_secs: u64,

    /// Retry attempts for transient embedding errors
    #[arg(long, env = "SEMSEARCH_OPENAI_MAX_RETRIES", default_value_t = 5)]
    max_retries: usize,
}

fn main() -> Result<()> {
    let cli = SearchCli::parse();
    let embedder = OpenAiEmbedder::new(
        cli.openai_api_key,
        cli.openai_base_url,
        cli.openai_model,
        cli.openai_dimensions,
        Duration::from_secs(cli.openai_timeout_secs.max(1)),
        cli.max_retries.max(1),
        1,
    )?;

    let (index, report) = ArticleIndex::load(&cli.embedded_articles)?;
    eprintln!(
        "Loaded {} embedded article(s) from {} file(s) ({} skipped).",
        report.articles_indexed, report.files_loaded, report.files_skipped
    );
    let service = SearchService::new(embedder, index)?;

    let hits = service.search(&cli.query, cli.top_k)?;
    println!("--- Search results for: '{}' ---", cli.query);
    if hits.is_empty() {
        println!("No relevant articles found.");
        return Ok(());
    }
    for (position, hit) in hits.iter().enumerate() {
        println!("Rank {}", position + 1);
        println!("Title: {}", hit.title().unwrap_or("N/A"));
        println!("Similarity: {:.4}", hit.similarity_score);
        println!("URL: {}", hit.url().unwrap_or("N/A"));
        println!("{}", "-".repeat(30));
    }
    Ok(())
}
