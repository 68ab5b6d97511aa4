//! Load `.bulkshift.toml` (CLI only). Library callers build [`Opts`] directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    batch_size: Option<usize>,
    concurrency: Option<usize>,
    skip_existing: Option<bool>,
    pause_ms: Option<u64>,
    error_log: Option<String>,
    verbose: Option<bool>,
    progress: Option<bool>,
    fail_on_error: Option<bool>,
    quality: Option<u8>,
    speed: Option<u8>,
    exclude: Option<Vec<String>>,
    follow_links: Option<bool>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
}

/// Parse settings from TOML text.
pub fn parse_settings(text: &str) -> Result<SettingsFile> {
    toml::from_str(text).context("parse settings")
}

/// Load settings. An explicit path must exist; the default `.bulkshift.toml` in `dir` is optional.
/// A file that exists but does not parse is an error either way.
pub fn load_settings_file(explicit: Option<&Path>, dir: &Path) -> Result<Option<SettingsFile>> {
    let (path, required): (PathBuf, bool) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (dir.join(PackagePaths::get().config_filename()), false),
    };
    if !path.is_file() {
        if required {
            anyhow::bail!("config file {} not found", path.display());
        }
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let file = parse_settings(&text).with_context(|| format!("config file {}", path.display()))?;
    log::debug!("Loaded settings from {}", path.display());
    Ok(Some(file))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &SettingsFile, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, batch_size => batch_size);
    if let Some(n) = sec.concurrency {
        opts.concurrency = Some(n);
    }
    apply_file_opt!(sec, opts, skip_existing => skip_existing);
    apply_file_opt!(sec, opts, pause_ms => pause_ms);
    if let Some(ref p) = sec.error_log {
        opts.error_log = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, verbose => verbose);
    apply_file_opt!(sec, opts, progress => progress);
    apply_file_opt!(sec, opts, fail_on_error => fail_on_error);
    apply_file_opt!(sec, opts, quality => quality);
    apply_file_opt!(sec, opts, speed => speed);
    apply_file_opt!(sec, opts, exclude => exclude);
    apply_file_opt!(sec, opts, follow_links => follow_links);
    apply_file_opt!(sec, opts, max_retries => max_retries);
    apply_file_opt!(sec, opts, timeout_secs => timeout_secs);
}
