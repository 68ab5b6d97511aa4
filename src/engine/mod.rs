//! Engine module: command line, progress reporting and path helpers

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, Commands, CommonArgs, ConvertArgs, DownloadArgs};
pub use cli::{RunExit, build_opts, handle_run};
pub use progress::{Reporter, progress_line, summary_lines};
pub use tools::{glob_match, has_recognized_extension, path_relative_to, should_include_in_walk};
