//! Process-wide logging setup for merchantdesk binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide observability using the format selected by
/// `MERCHANTDESK_LOG_FORMAT` (`json` or `pretty`, default `pretty`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init(LogFormat::from_env());
}
