//! Directory source: lazy depth-first walk yielding recognized files, skipping unreadable subtrees.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::context::{SkippedItems, new_skipped_items, record_skipped};
use super::source::ItemSource;
use crate::SourceFile;
use crate::engine::tools::{has_recognized_extension, path_relative_to, should_include_in_walk};

/// One result from a directory walk: a file, something to ignore (directory, special file),
/// or an error with optional path.
pub enum WalkOutcome {
    File(PathBuf),
    Other,
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) if entry.file_type().is_file() => WalkOutcome::File(entry.into_path()),
        Ok(_) => WalkOutcome::Other,
        Err(err) => WalkOutcome::Err {
            msg: match err.io_error() {
                Some(io) => io.to_string(),
                None => format!("{}", err),
            },
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Files under `root` whose extension is in the recognized set.
///
/// walkdir keeps its own stack of open directories, so depth does not grow the call stack, and
/// entries are yielded as they are read. Siblings are visited in file-name order.
pub struct DirSource {
    root: PathBuf,
    extensions: Vec<String>,
    exclude: Vec<String>,
    follow_links: bool,
    output_root: Option<PathBuf>,
    skipped: SkippedItems,
}

impl DirSource {
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, extensions: &[S]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            exclude: Vec::new(),
            follow_links: false,
            output_root: None,
            skipped: new_skipped_items(),
        }
    }

    /// Exclude patterns matched against file/dir names and full paths (`*` and `?`).
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Never descend into `output_root` (outputs may be written inside the input tree).
    pub fn excluding_output(mut self, output_root: &Path) -> Self {
        self.output_root = Some(output_root.to_path_buf());
        self
    }

    fn to_item(&self, path: PathBuf) -> Option<SourceFile> {
        if !has_recognized_extension(&path, &self.extensions) {
            return None;
        }
        let relative = path_relative_to(&path, &self.root)?;
        Some(SourceFile { path, relative })
    }
}

impl ItemSource for DirSource {
    type Item = SourceFile;

    fn items(&self) -> Box<dyn Iterator<Item = SourceFile> + '_> {
        let walker = WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                should_include_in_walk(e.path(), &self.root, &self.output_root, &self.exclude)
            });
        Box::new(walker.filter_map(move |r| match to_outcome_walkdir(r) {
            WalkOutcome::File(path) => self.to_item(path),
            WalkOutcome::Other => None,
            WalkOutcome::Err { msg, path } => {
                let at = path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("<under {}>", self.root.display()));
                record_skipped(&self.skipped, at, msg);
                None
            }
        }))
    }

    fn skipped(&self) -> Vec<(String, String)> {
        self.skipped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
