use log::{debug, warn};

/// Report enumeration problems collected by the source: a warning with the count,
/// and each entry at debug level (shown with `--verbose`).
pub fn check_for_skipped_items(skipped: &[(String, String)]) {
    if skipped.is_empty() {
        return;
    }
    warn!(
        "Skipped {} entries the source could not read (unreadable directories or invalid list lines)",
        skipped.len()
    );
    for (identifier, reason) in skipped {
        debug!("  skipped: {} ({})", identifier, reason);
    }
}
