#![warn(missing_docs)]
//! Core library entry points for the semsearch article pipeline.

pub mod article;
pub mod batch;
pub mod codec;
pub mod embedder;
pub mod ranker;
pub mod service;
pub mod store;

pub use article::{ArticleRecord, SearchHit};
pub use batch::{embed_articles_file, list_article_files, FileOutcome, OUTPUT_SUBDIR};
pub use codec::{decode_embedding, encode_embedding, CodecError};
pub use embedder::TextEmbedder;
pub use ranker::{cosine_similarity, rank};
pub use service::{SearchService, DEFAULT_TOP_K};
pub use store::{ArticleIndex, IndexedArticle, LoadReport};

#[cfg(feature = "debug_logs")]
#[macro_export]
// This allows use of the `eprintln!` macro via `debug_log!` macro.
macro_rules! debug_log {
        ($($arg:tt)*) => {
            eprintln!($($arg)*);
        };
    }
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
// This effectively disables the `eprintln!` macro, effectively removing it from the code during
// compilation.
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}
