//! Item sources: lazy, restartable sequences of work items.

use anyhow::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use url::Url;

use super::context::{SkippedItems, new_skipped_items, record_skipped};
use crate::{RemoteFile, WorkItem};

/// Produces work items. Every call to [`items`](ItemSource::items) starts a fresh traversal;
/// a traversal is never resumed.
pub trait ItemSource: Sync {
    type Item: WorkItem;

    fn items(&self) -> Box<dyn Iterator<Item = Self::Item> + '_>;

    /// Enumeration problems recorded so far, as `(identifier, reason)`.
    fn skipped(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Parse one list entry into a remote item. Only http(s) URLs are accepted.
pub fn parse_remote(line: &str) -> Result<RemoteFile> {
    let url = Url::parse(line)?;
    match url.scheme() {
        "http" | "https" => Ok(RemoteFile { url }),
        other => anyhow::bail!("unsupported scheme {other:?}"),
    }
}

enum UrlOrigin {
    File(PathBuf),
    Inline(Vec<String>),
}

/// URLs from a list file or from memory.
///
/// Text files are read lazily, one URL per line; blank lines and lines starting with `#` are
/// ignored. Files ending in `.json` must hold a JSON array of strings. Entries that are not
/// http(s) URLs are recorded as skipped and never reach the scheduler.
pub struct UrlListSource {
    origin: UrlOrigin,
    skipped: SkippedItems,
}

impl UrlListSource {
    /// List file at `path`. A missing file is a configuration error.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            anyhow::bail!("URL list {} not found", path.display());
        }
        Ok(Self {
            origin: UrlOrigin::File(path),
            skipped: new_skipped_items(),
        })
    }

    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origin: UrlOrigin::Inline(urls.into_iter().map(Into::into).collect()),
            skipped: new_skipped_items(),
        }
    }

    fn entry_to_item(&self, line: &str) -> Option<RemoteFile> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match parse_remote(line) {
            Ok(item) => Some(item),
            Err(e) => {
                record_skipped(&self.skipped, line.to_string(), format!("{e:#}"));
                None
            }
        }
    }

    fn file_lines<'a>(&'a self, path: &Path) -> Box<dyn Iterator<Item = String> + 'a> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            return match read_json_list(path) {
                Ok(urls) => Box::new(urls.into_iter()),
                Err(e) => {
                    record_skipped(&self.skipped, path.display().to_string(), format!("{e:#}"));
                    Box::new(std::iter::empty())
                }
            };
        }
        match File::open(path) {
            Ok(file) => {
                let display = path.display().to_string();
                Box::new(BufReader::new(file).lines().map_while(move |line| match line {
                    Ok(l) => Some(l),
                    Err(e) => {
                        record_skipped(&self.skipped, display.clone(), format!("read failed: {e}"));
                        None
                    }
                }))
            }
            Err(e) => {
                record_skipped(&self.skipped, path.display().to_string(), e.to_string());
                Box::new(std::iter::empty())
            }
        }
    }
}

fn read_json_list(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let urls: Vec<String> = serde_json::from_reader(BufReader::new(file))?;
    Ok(urls)
}

impl ItemSource for UrlListSource {
    type Item = RemoteFile;

    fn items(&self) -> Box<dyn Iterator<Item = RemoteFile> + '_> {
        match &self.origin {
            UrlOrigin::File(path) => Box::new(
                self.file_lines(path)
                    .filter_map(move |line| self.entry_to_item(&line)),
            ),
            UrlOrigin::Inline(urls) => {
                Box::new(urls.iter().filter_map(move |line| self.entry_to_item(line)))
            }
        }
    }

    fn skipped(&self) -> Vec<(String, String)> {
        self.skipped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
