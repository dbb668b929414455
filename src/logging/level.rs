use crate::error::{NomosError, Result};
use tracing::Level;

/// Parse a configured level name; `WARNING` is accepted as an alias for `WARN`
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.trim().to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" => Ok(Level::ERROR),
        _ => Err(NomosError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// The more verbose of two levels (`tracing` orders TRACE above ERROR)
pub fn most_verbose(a: Level, b: Level) -> Level {
    a.max(b)
}

/// Resolve an optional per-sink level, falling back to the base level
pub fn resolve_level(specific: Option<&str>, base: Level) -> Level {
    specific
        .and_then(|s| parse_log_level(s).ok())
        .unwrap_or(base)
}
