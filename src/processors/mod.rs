//! Bundled item processors.

pub mod avif;
pub mod download;
pub mod retry;

pub use avif::AvifConverter;
pub use download::{FetchError, UrlDownloader, classify, file_name_for_url, local_path_for_url};
pub use retry::{FailureKind, RetryDecision, RetryPolicy};
