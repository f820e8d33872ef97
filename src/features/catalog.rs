use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;

use crate::data::models::CatalogEntry;
use crate::data::repositories::QuestionRepository;
use crate::db::DbPool;

/// Parses the catalog file, dropping entries whose answer is not one of their options.
pub fn parse_catalog(content: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(content)?;

    Ok(entries
        .into_iter()
        .filter(|entry| {
            let usable = !entry.options.is_empty() && entry.options.contains(&entry.correct_answer);
            if !usable {
                log::warn!(
                    "skipping question {}: correct answer is not among its options",
                    entry.slug
                );
            }
            usable
        })
        .collect())
}

/// Imports the catalog at `path` into the store. A missing file is not an error.
pub fn load_catalog(pool: &DbPool, path: impl AsRef<Path>) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("question catalog {} not found, skipping import", path.display());
            return Ok(0);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }
    };

    let entries =
        parse_catalog(&content).with_context(|| format!("parsing {}", path.display()))?;
    let mut conn = pool.get().context("acquiring a connection for the catalog import")?;
    let written = QuestionRepository::upsert_catalog(&mut conn, &entries)
        .context("writing the question catalog")?;
    log::info!("imported {} question(s) from {}", written, path.display());
    Ok(written)
}
