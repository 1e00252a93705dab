//! JSON directory persister
//!
//! Layout, per framework:
//!
//! ```text
//! {root}/{framework}/index.json     url, title, word count per page
//! {root}/{framework}/page_1.json    full page record
//! {root}/{framework}/page_2.json
//! ...
//! ```

use super::traits::{OutputResult, PagePersister, ScrapedPage};
use crate::planner::PlanPriority;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry<'a> {
    url: &'a str,
    title: &'a str,
    word_count: usize,
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<PlanPriority>,
}

pub struct JsonDirectoryPersister {
    root: PathBuf,
}

impl JsonDirectoryPersister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that pages for `framework` are written to
    pub fn framework_dir(&self, framework: &str) -> PathBuf {
        self.root.join(directory_name(framework))
    }
}

#[async_trait]
impl PagePersister for JsonDirectoryPersister {
    async fn persist(&self, framework: &str, pages: &[ScrapedPage]) -> OutputResult<()> {
        let dir = self.framework_dir(framework);
        tokio::fs::create_dir_all(&dir).await?;

        let index: Vec<IndexEntry<'_>> = pages
            .iter()
            .enumerate()
            .map(|(i, page)| IndexEntry {
                url: &page.url,
                title: &page.title,
                word_count: page.word_count(),
                file: page_file_name(i),
                category: page.category.as_deref(),
                priority: page.priority,
            })
            .collect();
        write_json(&dir.join("index.json"), &index).await?;

        for (i, page) in pages.iter().enumerate() {
            write_json(&dir.join(page_file_name(i)), page).await?;
        }

        tracing::info!("Saved {} pages to {}", pages.len(), dir.display());
        Ok(())
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

fn page_file_name(index: usize) -> String {
    format!("page_{}.json", index + 1)
}

/// Lowercased framework name, safe to use as a single path component
fn directory_name(framework: &str) -> String {
    let name: String = framework
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let name = name.trim_start_matches('.');
    if name.is_empty() {
        "framework".to_string()
    } else {
        name.to_string()
    }
}
