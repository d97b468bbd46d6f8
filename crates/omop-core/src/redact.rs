//! PHI redaction gate for row-level log output.
//!
//! Source cells and raw person identifiers are patient data. Trace-level
//! logging of such values routes through [`redact_value`], which replaces
//! them with a fixed token unless row-level logging was explicitly enabled
//! at startup.

use std::sync::atomic::{AtomicBool, Ordering};

static LOG_DATA_ENABLED: AtomicBool = AtomicBool::new(false);

/// Placeholder used when row-level logging is disabled.
pub const REDACTED_VALUE: &str = "[REDACTED]";

/// Enable or disable row-level value logging. Called once at startup.
pub fn set_log_data(enabled: bool) {
    LOG_DATA_ENABLED.store(enabled, Ordering::Release);
}

/// Returns true if row-level logging is explicitly enabled.
pub fn log_data_enabled() -> bool {
    LOG_DATA_ENABLED.load(Ordering::Relaxed)
}

/// Returns the input value when PHI logging is enabled, otherwise a
/// redacted token.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() {
        value
    } else {
        REDACTED_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_controls_redaction() {
        set_log_data(false);
        assert_eq!(redact_value("patient-007"), REDACTED_VALUE);
        set_log_data(true);
        assert_eq!(redact_value("patient-007"), "patient-007");
        set_log_data(false);
    }
}
