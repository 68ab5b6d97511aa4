//! List download: fetch every URL of a list file into a sharded output directory.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::pipeline::{ProgressSink, RunStats, UrlListSource, run_pipeline};
use crate::processors::UrlDownloader;
use crate::{CancelFlag, Opts, PipelineOpts};

pub fn download_list(
    list: &Path,
    output: &Path,
    opts: &Opts,
    cancel: &CancelFlag,
    sink: &mut dyn ProgressSink,
) -> Result<RunStats> {
    let pipeline_opts = PipelineOpts::from(opts);
    pipeline_opts.validate()?;
    let source = UrlListSource::from_file(list)?;
    let downloader = UrlDownloader::new(
        output,
        Duration::from_secs(opts.timeout_secs),
        opts.max_retries,
    )?;
    log::info!(
        "Downloading {} -> {} (max {} retries)",
        list.display(),
        output.display(),
        opts.max_retries
    );
    run_pipeline(&source, &downloader, &pipeline_opts, cancel, sink)
}
