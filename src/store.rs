//! Loads embedded article files into the in-memory search index.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::article::ArticleRecord;
use crate::codec::decode_embedding;
use crate::debug_log;

/// An article admitted to the search candidate set.
#[derive(Debug, Clone)]
pub struct IndexedArticle {
    /// The full record as loaded from disk.
    pub record: ArticleRecord,
    /// Decoded embedding vector, length equal to the index dimension.
    pub embedding: Vec<f32>,
}

/// Read-only in-memory collection the ranker scans.
///
/// Built once at startup; never mutated afterwards, so it can be shared
/// freely across concurrent query handlers.
#[derive(Debug, Default)]
pub struct ArticleIndex {
    articles: Vec<IndexedArticle>,
    dimension: Option<usize>,
}

/// Counts surfaced by a load so silently excluded inputs stay observable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Files parsed successfully.
    pub files_loaded: usize,
    /// Files skipped because they were malformed or not a top-level array.
    pub files_skipped: usize,
    /// Articles admitted to the index.
    pub articles_indexed: usize,
    /// Articles excluded for a missing or malformed embedding.
    pub articles_excluded: usize,
}

impl ArticleIndex {
    /// Loads every `*.json` file in `dir`, in lexicographic file-name order.
    ///
    /// A malformed file is skipped and counted, never fatal. A record whose
    /// `embedding` is absent or rejected by the codec is excluded from the
    /// index and counted. A missing directory is an error: the query path
    /// must not start against nothing by accident.
    pub fn load(dir: &Path) -> Result<(Self, LoadReport)> {
        let mut index = ArticleIndex::default();
        let mut report = LoadReport::default();

        for path in sorted_json_files(dir)? {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let records: Vec<ArticleRecord> = match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(err) => {
                    debug_log!("skipping {}: {err}", path.display());
                    let _ = err;
                    report.files_skipped += 1;
                    continue;
                }
            };
            report.files_loaded += 1;
            for record in records {
                match &record.embedding {
                    Some(value) => match decode_embedding(value, index.dimension) {
                        Ok(vector) => {
                            index.dimension.get_or_insert(vector.len());
                            index.articles.push(IndexedArticle {
                                record,
                                embedding: vector,
                            });
                            report.articles_indexed += 1;
                        }
                        Err(err) => {
                            debug_log!(
                                "excluding article in {}: {err}",
                                path.display()
                            );
                            let _ = err;
                            report.articles_excluded += 1;
                        }
                    },
                    None => {
                        report.articles_excluded += 1;
                    }
                }
            }
        }

        Ok((index, report))
    }

    /// Articles in the candidate set, in load order.
    pub fn articles(&self) -> &[IndexedArticle] {
        &self.articles
    }

    /// Number of vector-bearing articles.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// True when no article carries a vector.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Collection-wide embedding dimension, `None` while empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[cfg(test)]
    pub(crate) fn from_articles(articles: Vec<IndexedArticle>) -> Self {
        let dimension = articles.first().map(|article| article.embedding.len());
        Self {
            articles,
            dimension,
        }
    }
}

/// `*.json` entries of `dir`, sorted by file name for deterministic loads.
pub(crate) fn sorted_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read article directory {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write fixture");
    }

    #[test]
    fn malformed_file_is_skipped_not_fatal() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "bad.json", "{ not json");
        write(
            dir.path(),
            "good.json",
            r#"[{"title": "A", "content": "B", "embedding": [1.0, 0.0]}]"#,
        );

        let (index, report) = ArticleIndex::load(dir.path()).expect("load");
        assert_eq!(index.len(), 1);
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.articles_indexed, 1);
    }

    #[test]
    fn non_array_top_level_is_skipped() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "object.json", r#"{"title": "A"}"#);

        let (index, report) = ArticleIndex::load(dir.path()).expect("load");
        assert!(index.is_empty());
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_loaded, 0);
    }

    #[test]
    fn records_without_vectors_are_excluded_but_counted() {
        let dir = tempdir().expect("tempdir");
        write(
            dir.path(),
            "mixed.json",
            r#"[
                {"title": "has vector", "content": "", "embedding": [1.0, 0.0]},
                {"title": "no vector", "content": ""},
                {"title": "bad vector", "content": "", "embedding": "oops"},
                {"title": "wrong length", "content": "", "embedding": [1.0, 0.0, 0.0]}
            ]"#,
        );

        let (index, report) = ArticleIndex::load(dir.path()).expect("load");
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), Some(2));
        assert_eq!(report.articles_excluded, 3);
    }

    #[test]
    fn files_load_in_name_order() {
        let dir = tempdir().expect("tempdir");
        write(
            dir.path(),
            "b.json",
            r#"[{"title": "second", "content": "", "embedding": [0.0, 1.0]}]"#,
        );
        write(
            dir.path(),
            "a.json",
            r#"[{"title": "first", "content": "", "embedding": [1.0, 0.0]}]"#,
        );

        let (index, _) = ArticleIndex::load(dir.path()).expect("load");
        let titles: Vec<&str> = index
            .articles()
            .iter()
            .map(|article| article.record.title())
            .collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(ArticleIndex::load(&missing).is_err());
    }
}
