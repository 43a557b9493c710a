//! Offline batch job: attach embedding vectors to article files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::article::ArticleRecord;
use crate::embedder::TextEmbedder;
use crate::store::sorted_json_files;

/// Subdirectory (under the source directory) that receives embedded output.
pub const OUTPUT_SUBDIR: &str = "embedded_articles";

/// Suffix inserted before the extension of each output file.
pub const OUTPUT_SUFFIX: &str = "_embedded";

/// What happened to a single input file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Output written; `embedded` of `total` records gained a vector.
    Written {
        /// Where the augmented collection landed.
        output_path: PathBuf,
        /// Record count (always equals the input count).
        total: usize,
        /// Records that passed the embeddable predicate.
        embedded: usize,
    },
    /// File was unparseable or not a top-level array; nothing written.
    SkippedMalformed,
    /// File parsed to zero records; nothing written.
    SkippedEmpty,
    /// File had records but none carried embeddable text; nothing written.
    SkippedNoText,
}

/// Sorted `*.json` work list for a source directory.
///
/// The output subdirectory never appears here, so re-runs do not re-embed
/// their own output.
pub fn list_article_files(dir: &Path) -> Result<Vec<PathBuf>> {
    sorted_json_files(dir)
}

/// Output location for `input`: `{base}_embedded{ext}` under
/// [`OUTPUT_SUBDIR`] next to the source file.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}{OUTPUT_SUFFIX}");
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(OUTPUT_SUBDIR)
        .join(name)
}

/// Embeds one article file and writes the augmented copy.
///
/// Non-embeddable records are carried through unchanged (no `embedding` key
/// added), so the output record count and order always match the input.
/// Malformed, empty, and text-free files are reported as skips, not errors;
/// a model failure is an `Err` so the caller can keep going with the rest of
/// the directory.
pub fn embed_articles_file(
    embedder: &dyn TextEmbedder,
    input: &Path,
) -> Result<FileOutcome> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut records: Vec<ArticleRecord> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(_) => return Ok(FileOutcome::SkippedMalformed),
    };
    if records.is_empty() {
        return Ok(FileOutcome::SkippedEmpty);
    }

    let mut texts = Vec::new();
    let mut embeddable = Vec::new();
    for (position, record) in records.iter().enumerate() {
        if let Some(text) = record.embedding_text() {
            texts.push(text);
            embeddable.push(position);
        }
    }
    if texts.is_empty() {
        return Ok(FileOutcome::SkippedNoText);
    }

    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let vectors = embedder
        .embed_batch(&inputs)
        .with_context(|| format!("embedding failed for {}", input.display()))?;
    anyhow::ensure!(
        vectors.len() == embeddable.len(),
        "model returned {} vectors for {} texts in {}",
        vectors.len(),
        embeddable.len(),
        input.display()
    );
    if let Some(first) = vectors.first() {
        let dimension = first.len();
        anyhow::ensure!(
            vectors.iter().all(|vector| vector.len() == dimension),
            "model returned vectors of mixed dimension for {}",
            input.display()
        );
    }

    let embedded = embeddable.len();
    for (position, vector) in embeddable.into_iter().zip(vectors.iter()) {
        records[position].set_embedding(vector);
    }

    let output_path = output_path_for(input);
    let output_dir = output_path
        .parent()
        .context("output path has no parent directory")?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let file = File::create(&output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(FileOutcome::Written {
        output_path,
        total: records.len(),
        embedded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::stub::StubEmbedder;
    use crate::store::ArticleIndex;
    use serde_json::Value;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write fixture");
        path
    }

    #[test]
    fn embeddable_records_gain_vectors_others_do_not() {
        let dir = tempdir().expect("tempdir");
        let input = write(
            dir.path(),
            "articles_page_1.json",
            r#"[
                {"title": "Budget", "content": "Tax changes.", "url": "a"},
                {"title": "  ", "content": "", "url": "b"},
                {"title": null, "content": "Body only.", "url": "c"}
            ]"#,
        );

        let embedder = StubEmbedder::new(3);
        let outcome = embed_articles_file(&embedder, &input).expect("embed file");
        let FileOutcome::Written {
            output_path,
            total,
            embedded,
        } = outcome
        else {
            panic!("expected written outcome");
        };
        assert_eq!(total, 3);
        assert_eq!(embedded, 2);
        assert_eq!(
            output_path,
            dir.path()
                .join(OUTPUT_SUBDIR)
                .join("articles_page_1_embedded.json")
        );

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output_path).expect("read output"))
                .expect("parse output");
        let rows = written.as_array().expect("array output");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["embedding"].as_array().expect("vector").len(), 3);
        assert!(rows[1].get("embedding").is_none());
        assert_eq!(rows[2]["embedding"].as_array().expect("vector").len(), 3);
        // Order and passthrough fields preserved.
        assert_eq!(rows[0]["url"], "a");
        assert_eq!(rows[1]["url"], "b");
        assert_eq!(rows[2]["url"], "c");
    }

    #[test]
    fn output_feeds_straight_back_into_the_loader() {
        let dir = tempdir().expect("tempdir");
        let input = write(
            dir.path(),
            "page.json",
            r#"[
                {"title": "A", "content": "a"},
                {"title": "", "content": ""}
            ]"#,
        );
        let embedder = StubEmbedder::new(4);
        embed_articles_file(&embedder, &input).expect("embed file");

        let (index, report) =
            ArticleIndex::load(&dir.path().join(OUTPUT_SUBDIR)).expect("load output");
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), Some(4));
        assert_eq!(report.articles_excluded, 1);
    }

    #[test]
    fn malformed_and_empty_inputs_are_skips_not_errors() {
        let dir = tempdir().expect("tempdir");
        let malformed = write(dir.path(), "bad.json", "[{");
        let empty = write(dir.path(), "empty.json", "[]");
        let no_text = write(
            dir.path(),
            "blank.json",
            r#"[{"title": "", "content": "  "}]"#,
        );

        let embedder = StubEmbedder::new(2);
        assert!(matches!(
            embed_articles_file(&embedder, &malformed).expect("malformed"),
            FileOutcome::SkippedMalformed
        ));
        assert!(matches!(
            embed_articles_file(&embedder, &empty).expect("empty"),
            FileOutcome::SkippedEmpty
        ));
        assert!(matches!(
            embed_articles_file(&embedder, &no_text).expect("no text"),
            FileOutcome::SkippedNoText
        ));
        assert!(!dir.path().join(OUTPUT_SUBDIR).exists());
    }

    #[test]
    fn model_failure_writes_nothing_and_surfaces_the_error() {
        let dir = tempdir().expect("tempdir");
        let input = write(
            dir.path(),
            "page.json",
            r#"[{"title": "A", "content": "a"}]"#,
        );
        let embedder = StubEmbedder::failing(2);
        assert!(embed_articles_file(&embedder, &input).is_err());
        assert!(!dir.path().join(OUTPUT_SUBDIR).exists());
    }

    #[test]
    fn work_list_is_sorted_and_ignores_previous_output() {
        let dir = tempdir().expect("tempdir");
        write(dir.path(), "b.json", "[]");
        write(dir.path(), "a.json", "[]");
        write(dir.path(), "notes.txt", "ignored");
        fs::create_dir_all(dir.path().join(OUTPUT_SUBDIR)).expect("mkdir");
        fs::write(
            dir.path().join(OUTPUT_SUBDIR).join("a_embedded.json"),
            "[]",
        )
        .expect("write output fixture");

        let files = list_article_files(dir.path()).expect("list");
        let names: Vec<String> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
    }
}
