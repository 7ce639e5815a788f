//! Runtime configuration.
//!
//! The recovery mode is set via the `TRANSPUT_RECOVERY` environment variable:
//! - `strict` (default): value errors follow the file's `on_value_error`
//!   hook. A declined error aborts the statement.
//! - `lenient`: a declined value error is still counted and traced, but the
//!   placeholder (write) or `0` substitution (read) stands and the statement
//!   continues.
//!
//! `TRANSPUT_ERROR_CHAR` and `TRANSPUT_MAX_FRAME_DEPTH` override the
//! corresponding [`TransputConfig`] fields in [`TransputConfig::from_env`].

use std::sync::OnceLock;

/// How declined value errors are treated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryMode {
    /// Declined value errors abort the statement.
    #[default]
    Strict,
    /// Declined value errors are recovered in place.
    Lenient,
}

impl RecoveryMode {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" | "recover" | "heal" | "relaxed" => Self::Lenient,
            _ => Self::Strict,
        }
    }

    /// Returns true if declined value errors are recovered in place.
    #[must_use]
    pub const fn recovers(self) -> bool {
        matches!(self, Self::Lenient)
    }
}

static GLOBAL_RECOVERY: OnceLock<RecoveryMode> = OnceLock::new();

/// Get the configured recovery mode (reads env var on first call, caches thereafter).
#[must_use]
pub fn recovery_mode() -> RecoveryMode {
    *GLOBAL_RECOVERY.get_or_init(|| {
        std::env::var("TRANSPUT_RECOVERY")
            .map(|v| RecoveryMode::from_str_loose(&v))
            .unwrap_or_default()
    })
}

/// Per-channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransputConfig {
    /// Character repeated across a field that could not be rendered.
    pub error_char: char,
    pub recovery: RecoveryMode,
    /// Upper bound on nested embedded-format frames within one call.
    pub max_frame_depth: usize,
    /// Significant digits of the standard real representation.
    pub real_width: usize,
    /// Exponent digits of the standard real representation.
    pub exp_width: usize,
    pub flip: char,
    pub flop: char,
}

impl Default for TransputConfig {
    fn default() -> Self {
        Self {
            error_char: '*',
            recovery: RecoveryMode::Strict,
            max_frame_depth: 64,
            real_width: 15,
            exp_width: 3,
            flip: 'T',
            flop: 'F',
        }
    }
}

impl TransputConfig {
    /// Defaults overlaid with the `TRANSPUT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            recovery: recovery_mode(),
            ..Self::default()
        };
        if let Some(ch) = std::env::var("TRANSPUT_ERROR_CHAR")
            .ok()
            .and_then(|v| v.chars().next())
        {
            config.error_char = ch;
        }
        if let Some(depth) = std::env::var("TRANSPUT_MAX_FRAME_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&d| d > 0)
        {
            config.max_frame_depth = depth;
        }
        config
    }

    /// Width of the standard (unformatted) real representation.
    #[must_use]
    pub const fn standard_real_width(&self) -> usize {
        self.real_width + self.exp_width + 4
    }

    /// A run of error characters filling a field of `width` positions.
    #[must_use]
    pub fn placeholder(&self, width: usize) -> String {
        std::iter::repeat_n(self.error_char, width.max(1)).collect()
    }
}
