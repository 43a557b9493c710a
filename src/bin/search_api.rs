use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use lru::LruCache;
use semsearch::embedder::openai::OpenAiEmbedder;
use semsearch::{rank, ArticleIndex, SearchHit, SearchService, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Parser, Debug)]
#[command(
    name = "semsearch-api",
    about = "HTTP endpoint serving cosine-similarity search over embedded articles"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SEMSEARCH_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Directory containing the embedded article JSON files
    #[arg(
        long,
        env = "SEMSEARCH_EMBEDDED_DIR",
        default_value = "articles/embedded_articles"
    )]
    embedded_articles: PathBuf,

    /// Default top-k when the client does not override it
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    default_top_k: usize,

    /// Maximum top-k allowed per request
    #[arg(long, default_value_t = 100)]
    max_top_k: usize,

    /// Max cached query embeddings kept in-memory (0 disables caching)
    #[arg(long, default_value_t = 1024)]
    embedding_cache_size: usize,

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

    /// Max inputs per embedding request
    #[arg(long, env = "SEMSEARCH_OPENAI_BATCH", default_value_t = 32)]
    batch_size: usize,

    /// Seconds before embedding requests time out
    #[arg(long, env = "SEMSEARCH_OPENAI_TIMEOUT_SECS", default_value_t = 30)]
    openai_timeout_secs: u64,

    /// Retry attempts for transient embedding errors
    #[arg(long, env = "SEMSEARCH_OPENAI_MAX_RETRIES", default_value_t = 5)]
    max_retries: usize,
}

#[derive(Clone)]
struct AppState {
    service: Arc<SearchService<OpenAiEmbedder>>,
    default_top_k: usize,
    max_top_k: usize,
    embedding_cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ApiCli::parse();
    let embedder = OpenAiEmbedder::new(
        cli.openai_api_key,
        cli.openai_base_url,
        cli.openai_model,
        cli.openai_dimensions,
        Duration::from_secs(cli.openai_timeout_secs.max(1)),
        cli.max_retries.max(1),
        cli.batch_size.max(1),
    )?;

    let (index, report) = ArticleIndex::load(&cli.embedded_articles)?;
    println!(
        "Loaded {} embedded article(s) from {} file(s) ({} file(s) skipped, {} article(s) without a usable embedding).",
        report.articles_indexed, report.files_loaded, report.files_skipped, report.articles_excluded
    );
    // Fatal on model/index dimension mismatch: better to refuse to start than
    // to serve meaningless similarity scores. The probe uses the blocking
    // embedder, so it runs off the async runtime.
    let service = tokio::task::spawn_blocking(move || SearchService::new(embedder, index))
        .await
        .map_err(|err| anyhow!("startup task join error: {err}"))??;
    let service = Arc::new(service);

    let state = AppState {
        service,
        default_top_k: cli.default_top_k.max(1),
        max_top_k: cli.max_top_k.max(1),
        embedding_cache: build_cache(cli.embedding_cache_size),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::any());
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/semantic_search", post(search_handler))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    println!("semsearch-api listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, (StatusCode, Json<ErrorBody>)> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query text must not be empty"));
    }
    let top_k = request
        .top_k
        .unwrap_or(state.default_top_k)
        .clamp(1, state.max_top_k);
    if state.service.index().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let embedding = embed_query(&state, request.query)
        .await
        .map_err(internal_error)?;
    let hits = rank(&embedding, state.service.index(), top_k).map_err(internal_error)?;
    Ok(Json(hits))
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}

async fn embed_query(state: &AppState, query: String) -> Result<Vec<f32>> {
    if let Some(cache) = &state.embedding_cache {
        if let Some(hit) = {
            let mut guard = cache.lock().await;
            guard.get(&query).cloned()
        } {
            return Ok(hit);
        }
    }

    let service = state.service.clone();
    let query_clone = query.clone();
    let embedding = tokio::task::spawn_blocking(move || service.embed_query(&query_clone))
        .await
        .map_err(|err| anyhow!("embedding task join error: {err}"))??;

    if let Some(cache) = &state.embedding_cache {
        let mut guard = cache.lock().await;
        guard.put(query, embedding.clone());
    }
    Ok(embedding)
}

fn build_cache(size: usize) -> Option<Arc<Mutex<LruCache<String, Vec<f32>>>>> {
    NonZeroUsize::new(size).map(|capacity| Arc::new(Mutex::new(LruCache::new(capacity))))
}
