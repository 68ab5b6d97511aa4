use colored::{Color, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Colors for outcome counts in progress and summary lines.
pub struct Colors;

impl Colors {
    pub const PROCESSED: Color = Color::Green;
    pub const SKIPPED: Color = Color::Yellow;
    pub const FAILED: Color = Color::Red;
    pub const CANCELLED: Color = Color::Magenta;

    pub fn colorize(color: Color, text: &str) -> String {
        text.color(color).to_string()
    }
}

/// `[bulkshift] msg` for info/debug, `[bulkshift WARN target] msg` for warnings and errors.
fn format_record(record: &log::Record<'_>) -> String {
    let name = env!("CARGO_PKG_NAME").cyan();
    let level = match record.level() {
        Level::Error => "ERROR".red(),
        Level::Warn => "WARN".yellow(),
        _ => return format!("[{}] {}", name, record.args()),
    };
    format!(
        "[{} {} {}] {}",
        name,
        level,
        record.target().white(),
        record.args()
    )
}

/// Install the global logger: our crate at Info (Debug with `verbose`), dependencies at Warn,
/// `RUST_LOG` on top. Safe to call more than once; later calls are ignored.
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| writeln!(buf, "{}", format_record(record)))
        .try_init();
}
