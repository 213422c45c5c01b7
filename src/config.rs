//! Environment configuration.

use std::env;
use std::time::Duration;

const DEFAULT_ESC_TIMEOUT_MS: u64 = 250;
const DEFAULT_IDLE_CAP_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Place new non-centered windows with the overlap-minimizing search.
    pub smart_placement: bool,
    /// How long a lone ESC waits for the rest of a sequence.
    pub escape_timeout: Duration,
    /// Upper bound on a single run-loop sleep.
    pub idle_cap: Duration,
    pub log_filter: Option<String>,
    pub log_file: Option<String>,
    /// Raw terminal output capture (process terminal only).
    pub write_log: Option<String>,
    pub signal_handlers: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            smart_placement: true,
            escape_timeout: Duration::from_millis(DEFAULT_ESC_TIMEOUT_MS),
            idle_cap: Duration::from_millis(DEFAULT_IDLE_CAP_MS),
            log_filter: None,
            log_file: None,
            write_log: None,
            signal_handlers: true,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            smart_placement: env_string_opt("TAPE_DESKTOP_SMART_PLACEMENT").as_deref() != Some("0"),
            escape_timeout: Duration::from_millis(env_u64(
                "TAPE_DESKTOP_ESC_TIMEOUT_MS",
                DEFAULT_ESC_TIMEOUT_MS,
            )),
            idle_cap: Duration::from_millis(env_u64("TAPE_DESKTOP_IDLE_CAP_MS", DEFAULT_IDLE_CAP_MS)),
            log_filter: env_string_opt("TAPE_DESKTOP_LOG"),
            log_file: env_string_opt("TAPE_DESKTOP_LOG_FILE"),
            write_log: env_string_opt("TAPE_DESKTOP_WRITE_LOG"),
            signal_handlers: !env_flag("TAPE_DESKTOP_NO_SIGNALS"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string_opt(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
