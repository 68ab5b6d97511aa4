//! URL → local file downloader.
//!
//! Each URL is stored at `<output>/<first two chars of file name>/<file name>`. URLs without a
//! usable file name are named after a stable blake3 hash of the URL. Bodies are streamed to disk
//! in chunks; transient failures are retried according to [`RetryPolicy`].

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use url::Url;

use super::retry::{FailureKind, RetryDecision, RetryPolicy};
use crate::engine::tools::shard_prefix;
use crate::pipeline::ItemProcessor;
use crate::utils::config::DownloadConsts;
use crate::utils::tempfiles::ensure_writable_dir;
use crate::{CancelFlag, Interrupted, RemoteFile};

/// Why a single attempt failed.
#[derive(Debug)]
pub enum FetchError {
    /// Request could not be sent or timed out.
    Request(reqwest::Error),
    /// Non-success status.
    Status(StatusCode),
    /// Connection broke while reading the body.
    Body(std::io::Error),
    /// Writing the local file failed.
    Write(std::io::Error),
    Interrupted,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Request(e) => write!(f, "request failed: {e}"),
            FetchError::Status(s) => write!(f, "HTTP {s}"),
            FetchError::Body(e) => write!(f, "reading body failed: {e}"),
            FetchError::Write(e) => write!(f, "writing file failed: {e}"),
            FetchError::Interrupted => f.write_str("interrupted"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Request(e) => Some(e),
            FetchError::Body(e) | FetchError::Write(e) => Some(e),
            _ => None,
        }
    }
}

/// Transient vs permanent, for the retry policy.
pub fn classify(err: &FetchError) -> FailureKind {
    match err {
        FetchError::Request(e) if e.is_builder() => FailureKind::Permanent,
        FetchError::Request(_) | FetchError::Body(_) => FailureKind::Transient,
        FetchError::Status(s) if s.is_server_error() || *s == StatusCode::TOO_MANY_REQUESTS => {
            FailureKind::Transient
        }
        FetchError::Status(_) | FetchError::Write(_) | FetchError::Interrupted => {
            FailureKind::Permanent
        }
    }
}

/// Local file name for `url`: its last path segment, or a blake3-derived name when there is none.
pub fn file_name_for_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..");
    match segment {
        Some(s) => s.to_string(),
        None => {
            let hash = blake3::hash(url.as_str().as_bytes()).to_hex();
            hash.as_str()[..DownloadConsts::HASHED_NAME_LEN].to_string()
        }
    }
}

/// `<root>/<shard>/<name>` where shard is the first two characters of the file name.
pub fn local_path_for_url(root: &Path, url: &Url) -> PathBuf {
    let name = file_name_for_url(url);
    let shard = shard_prefix(&name, DownloadConsts::SHARD_PREFIX_LEN);
    root.join(shard).join(name)
}

pub struct UrlDownloader {
    output_root: PathBuf,
    client: Client,
    retry: RetryPolicy,
}

impl UrlDownloader {
    pub fn new(output_root: impl Into<PathBuf>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            output_root: output_root.into(),
            client,
            retry: RetryPolicy::new(max_retries),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One GET, body streamed to `dest` (truncated first, so a retry starts clean).
    fn fetch_once(&self, url: &Url, dest: &Path, cancel: &CancelFlag) -> Result<u64, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(FetchError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let mut file = File::create(dest).map_err(FetchError::Write)?;
        let mut buf = vec![0_u8; DownloadConsts::READ_CHUNK_SIZE];
        let mut written = 0_u64;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Interrupted);
            }
            let n = response.read(&mut buf).map_err(FetchError::Body)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(FetchError::Write)?;
            written += n as u64;
        }
        file.sync_all().map_err(FetchError::Write)?;
        Ok(written)
    }
}

/// Sleep for `delay`, waking early when the run is cancelled.
fn sleep_unless_cancelled(delay: Duration, cancel: &CancelFlag) -> bool {
    let deadline = Instant::now() + delay;
    let step = Duration::from_millis(DownloadConsts::CANCEL_POLL_MS);
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(step.min(deadline - now));
    }
    false
}

impl ItemProcessor for UrlDownloader {
    type Item = RemoteFile;

    fn prepare(&self) -> Result<()> {
        ensure_writable_dir(&self.output_root)
    }

    fn output_path(&self, item: &RemoteFile) -> Result<PathBuf> {
        Ok(local_path_for_url(&self.output_root, &item.url))
    }

    fn transform(&self, item: &RemoteFile, dest: &Path, cancel: &CancelFlag) -> Result<()> {
        let mut retries_done = 0_u32;
        loop {
            let err = match self.fetch_once(&item.url, dest, cancel) {
                Ok(bytes) => {
                    debug!("fetched {} ({} bytes)", item.url, bytes);
                    return Ok(());
                }
                Err(FetchError::Interrupted) => return Err(Interrupted.into()),
                Err(err) => err,
            };
            match self.retry.should_retry(classify(&err), retries_done) {
                RetryDecision::Retry { delay, retry } => {
                    warn!(
                        "{}: {} (retry {}/{} in {:?})",
                        item.url,
                        err,
                        retry,
                        self.retry.max_retries(),
                        delay
                    );
                    if !sleep_unless_cancelled(delay, cancel) {
                        return Err(Interrupted.into());
                    }
                    retries_done = retry;
                }
                RetryDecision::GiveUp => {
                    let attempts = retries_done + 1;
                    return Err(anyhow::Error::new(err)
                        .context(format!("giving up after {attempts} attempt(s)")));
                }
            }
        }
    }
}
