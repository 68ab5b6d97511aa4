pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod settings_toml;
pub mod tempfiles;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, cap_workers_by_fd_limit, max_open_fds, workers_for_fd_limit};
pub use logger::{Colors, setup_logging};
pub use settings_toml::{apply_file_to_opts, load_settings_file, parse_settings};
pub use tempfiles::{create_partial, ensure_writable_dir, persist_partial};
