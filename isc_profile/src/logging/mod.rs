//! Global logging module for ISC
//!
//! Code-tagged logging macros over the `log` facade, with an `env_logger`
//! backend installed once per process.

pub mod codes;
pub mod macros;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

pub use codes::Code;

/// Environment variable holding an `env_logger` filter spec
pub const LOG_FILTER_ENV: &str = "ISC_LOG";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    fn to_log_level(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize global logging system
///
/// `ISC_LOG` overrides the default filter (`info`, or `debug` when verbose).
pub fn init_global_logging(verbose: bool) -> Result<(), String> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err("Global logger already initialized".to_string());
    }

    let default_filter = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().filter_or(LOG_FILTER_ENV, default_filter);

    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    log_success_with_context(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
        vec![("verbose", if verbose { "true" } else { "false" })],
    );

    Ok(())
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

/// Render context pairs as a `key=value` suffix
pub fn format_context(context: &[(&str, &str)]) -> String {
    context
        .iter()
        .map(|(key, value)| {
            if value.contains(char::is_whitespace) {
                format!("{}={:?}", key, value)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(prefix: Option<Code>, message: &str, context: &[(&str, &str)]) -> String {
    let mut line = match prefix {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    };
    if !context.is_empty() {
        line.push(' ');
        line.push_str(&format_context(context));
    }
    line
}

/// Error lines also name the code's category
fn render_error(code: Code, message: &str, mut context: Vec<(&str, &str)>) -> String {
    context.push(("kind", codes::get_description(code.as_str())));
    render(Some(code), message, &context)
}

/// Log error with context (used by log_error! macro)
pub fn log_error_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    log::log!(target: "isc", log::Level::Error, "{}", render_error(code, message, context));
}

/// Log success with context (used by log_success! macro)
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    log::log!(target: "isc", log::Level::Info, "{}", render(Some(code), message, &context));
}

/// Log at a level without a code (used by log_info!, log_warning!, log_debug!)
pub fn log_with_context(level: LogLevel, message: &str, context: Vec<(&str, &str)>) {
    let level = level.to_log_level();
    if log::log_enabled!(target: "isc", level) {
        log::log!(target: "isc", level, "{}", render(None, message, &context));
    }
}
