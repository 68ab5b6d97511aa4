//! Directory conversion: walk an image tree and re-encode it as AVIF.

use anyhow::{Context, Result};
use std::path::Path;

use crate::engine::tools::check_input_root;
use crate::pipeline::{DirSource, ProgressSink, RunStats, run_pipeline};
use crate::processors::AvifConverter;
use crate::utils::config::IMAGE_EXTENSIONS;
use crate::utils::tempfiles::ensure_writable_dir;
use crate::{CancelFlag, Opts, PipelineOpts};

/// Convert every recognized image under `input` to AVIF under `output`, mirroring the layout.
/// `output` may live inside `input`; it is never walked.
pub fn convert_dir(
    input: &Path,
    output: &Path,
    opts: &Opts,
    cancel: &CancelFlag,
    sink: &mut dyn ProgressSink,
) -> Result<RunStats> {
    let pipeline_opts = PipelineOpts::from(opts);
    pipeline_opts.validate()?;
    let input = check_input_root(input)?;
    ensure_writable_dir(output)?;
    let output = output
        .canonicalize()
        .with_context(|| format!("output root {}", output.display()))?;
    let converter = AvifConverter::new(&output)
        .with_quality(opts.quality)
        .with_speed(opts.speed);

    let source = DirSource::new(&input, IMAGE_EXTENSIONS)
        .with_exclude(opts.exclude.clone())
        .follow_links(opts.follow_links)
        .excluding_output(&output);
    log::info!(
        "Converting {} -> {} (quality {}, speed {})",
        input.display(),
        output.display(),
        opts.quality,
        opts.speed
    );
    run_pipeline(&source, &converter, &pipeline_opts, cancel, sink)
}
