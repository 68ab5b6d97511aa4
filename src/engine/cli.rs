//! CLI command handler: build options (defaults < config file < flags), run the job, map to an exit code.

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::engine::arg_parser::{Cli, Commands, CommonArgs};
use crate::engine::progress::Reporter;
use crate::pipeline::RunStats;
use crate::utils::config::ExitCodes;
use crate::utils::{apply_file_to_opts, load_settings_file, setup_logging};
use crate::{CancelFlag, Opts, convert, fetch};

/// Overwrite opts field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($args:expr, $opts:expr, $arg_field:ident => $opts_field:ident) => {
        if let Some(v) = $args.$arg_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

fn apply_common_args(common: &CommonArgs, opts: &mut Opts) {
    apply_cli_opt!(common, opts, batch_size => batch_size);
    if common.concurrency.is_some() {
        opts.concurrency = common.concurrency;
    }
    apply_cli_opt!(common, opts, pause_ms => pause_ms);
    apply_cli_opt!(common, opts, skip_existing => skip_existing);
    if common.error_log.is_some() {
        opts.error_log = common.error_log.clone();
    }
    apply_cli_opt!(common, opts, progress => progress);
    apply_cli_opt!(common, opts, verbose => verbose);
    apply_cli_opt!(common, opts, fail_on_error => fail_on_error);
}

/// Layer defaults, the settings file and the command line into one [`Opts`].
pub fn build_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();
    let common = cli.command.common();
    let cwd = std::env::current_dir().context("current directory")?;
    if let Some(file) = load_settings_file(common.config.as_deref(), &cwd)? {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_common_args(common, &mut opts);
    match &cli.command {
        Commands::Convert(args) => {
            apply_cli_opt!(args, opts, quality => quality);
            apply_cli_opt!(args, opts, speed => speed);
            apply_cli_opt!(args, opts, follow_links => follow_links);
            if !args.exclude.is_empty() {
                opts.exclude = args.exclude.clone();
            }
        }
        Commands::Download(args) => {
            apply_cli_opt!(args, opts, max_retries => max_retries);
            apply_cli_opt!(args, opts, timeout => timeout_secs);
        }
    }
    Ok(opts)
}

/// How a completed run ends, for the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Success,
    ItemFailures,
    Cancelled,
}

impl RunExit {
    /// Item failures only change the exit status when `fail_on_error` is set.
    pub fn from_run(stats: &RunStats, cancel: &CancelFlag, fail_on_error: bool) -> Self {
        if cancel.is_cancelled() {
            RunExit::Cancelled
        } else if fail_on_error && stats.errored > 0 {
            RunExit::ItemFailures
        } else {
            RunExit::Success
        }
    }

    pub fn code(self) -> i32 {
        match self {
            RunExit::Success => ExitCodes::SUCCESS,
            RunExit::ItemFailures => ExitCodes::ITEM_FAILURES,
            RunExit::Cancelled => ExitCodes::CANCELLED,
        }
    }
}

/// Ctrl+C sets the flag; the current batch drains and no further batch starts.
fn install_cancel_handler() -> Result<CancelFlag> {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.cancel();
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel)
}

/// Run the selected subcommand. Configuration errors are returned as `Err`; item failures are not.
pub fn handle_run(cli: &Cli) -> Result<RunExit> {
    let opts = build_opts(cli)?;
    setup_logging(opts.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let cancel = install_cancel_handler()?;

    let stats = match &cli.command {
        Commands::Convert(args) => {
            let mut reporter = Reporter::new("Converting", opts.progress);
            convert::convert_dir(&args.input, &args.output, &opts, &cancel, &mut reporter)?
        }
        Commands::Download(args) => {
            let mut reporter = Reporter::new("Downloading", opts.progress);
            fetch::download_list(&args.list, &args.output, &opts, &cancel, &mut reporter)?
        }
    };

    let exit = RunExit::from_run(&stats, &cancel, opts.fail_on_error);
    if exit == RunExit::ItemFailures {
        warn!("{} item(s) failed", stats.errored);
    }
    Ok(exit)
}
