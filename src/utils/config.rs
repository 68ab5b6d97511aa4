//! Application configuration constants.
//! Defaults and tuning in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    probe_filename: String,
    partial_suffix: &'static str,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                probe_filename: format!(".{pkg}_probe"),
                partial_suffix: ".part",
            }
        })
    }

    /// Settings file looked up in the current directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Scratch file written (and removed) to prove the output root is writable.
    pub fn probe_filename(&self) -> &str {
        &self.probe_filename
    }

    /// Suffix of the temporary file an output is written to before it is moved into place.
    pub fn partial_suffix(&self) -> &str {
        self.partial_suffix
    }
}

// ---- Pipeline ----

/// Defaults for the scheduler and the bundled processors.
pub struct Defaults;

impl Defaults {
    /// Items per batch.
    pub const BATCH_SIZE: usize = 50;
    /// Pause after each full batch, in milliseconds.
    pub const INTER_BATCH_PAUSE_MS: u64 = 50;
    /// Skip items whose output already exists.
    pub const SKIP_EXISTING: bool = true;
    /// AVIF quality (1-100).
    pub const AVIF_QUALITY: u8 = 70;
    /// AVIF encoder speed (0 = slowest/best, 10 = fastest).
    pub const AVIF_SPEED: u8 = 6;
    /// Download retries after the first attempt.
    pub const MAX_RETRIES: u32 = 2;
    /// Per-request timeout for downloads, in seconds.
    pub const TIMEOUT_SECS: u64 = 60;
}

/// Input extensions the converter recognizes (matched case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Extension of converted outputs.
pub const AVIF_EXTENSION: &str = "avif";

// ---- Downloads ----

/// Download tuning: sharding, hashing, streaming and backoff.
pub struct DownloadConsts;

impl DownloadConsts {
    /// Leading characters of the file name used as the shard directory.
    pub const SHARD_PREFIX_LEN: usize = 2;
    /// Hex digits of the blake3 URL hash used when a URL has no file name.
    pub const HASHED_NAME_LEN: usize = 16;
    /// Read buffer for streaming a response body to disk (bytes). 64 KB.
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
    /// First retry delay in milliseconds; doubles on each further retry.
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
    /// Upper bound for a single retry delay in milliseconds.
    pub const RETRY_MAX_DELAY_MS: u64 = 8_000;
    /// Granularity of cancellable sleeps (ms).
    pub const CANCEL_POLL_MS: u64 = 50;
}

// ---- Exit codes ----

/// Process exit codes for completed runs (configuration errors exit 1 via `main`).
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: i32 = 0;
    /// `--fail-on-error` was set and at least one item failed.
    pub const ITEM_FAILURES: i32 = 2;
    /// Run stopped by Ctrl+C.
    pub const CANCELLED: i32 = 130;
}
