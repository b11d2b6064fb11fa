// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions,
//! trimmed to the subset canonada's own error taxonomy actually produces
//! plus the two signal codes a `run` in progress can be interrupted by.

use std::fmt;

use canonada_core::CoreError;

/// Exit codes following Unix conventions (BSD sysexits.h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,
    /// General, unclassified error (1)
    Error = 1,
    /// Command line usage error (64)
    UsageError = 64,
    /// Data format error: an arity mismatch or malformed config file (65)
    DataError = 65,
    /// Cannot open input: a missing dataset item or catalog entry (66)
    NoInput = 66,
    /// Required service unavailable (69)
    Unavailable = 69,
    /// Internal software error: a planner ConfigError or internal fault (70)
    Software = 70,
    /// Cannot create output file during project scaffolding (73)
    CantCreate = 73,
    /// I/O error (74)
    IoError = 74,
    /// Permission denied (77)
    NoPerm = 77,
    /// Configuration error (78)
    Config = 78,
    /// Interrupted by SIGINT (130)
    Interrupted = 130,
    /// Terminated by SIGTERM (143)
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps canonada's own error taxonomy directly: `Config` → 78,
    /// `NotFound` → 66, `ArityMismatch` → 65, `Internal` → 70.
    pub fn from_core_error(error: &CoreError) -> Self {
        match error {
            CoreError::Config(_) => ExitCode::Config,
            CoreError::NotFound(_) => ExitCode::NoInput,
            CoreError::ArityMismatch(_) => ExitCode::DataError,
            CoreError::Internal(_) => ExitCode::Software,
        }
    }

    /// Falls back to string sniffing for CLI-only failures (project
    /// scaffolding I/O, usage errors) that never pass through
    /// [`CoreError`]; prefers the precise mapping whenever the error chain
    /// actually contains one.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        if let Some(core) = error.downcast_ref::<CoreError>() {
            return Self::from_core_error(core);
        }
        let text = error.to_string().to_lowercase();
        if text.contains("permission") || text.contains("access denied") {
            ExitCode::NoPerm
        } else if text.contains("not found") || text.contains("no such") {
            ExitCode::NoInput
        } else if text.contains("no subcommand") || text.contains("usage") {
            ExitCode::UsageError
        } else if text.contains("already exists") || text.contains("cannot create") {
            ExitCode::CantCreate
        } else if text.contains("io error") || text.contains("read") || text.contains("write") {
            ExitCode::IoError
        } else {
            ExitCode::Error
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::Error => "General error",
            ExitCode::UsageError => "Command line usage error",
            ExitCode::DataError => "Data format error",
            ExitCode::NoInput => "Cannot open input",
            ExitCode::Unavailable => "Service unavailable",
            ExitCode::Software => "Internal software error",
            ExitCode::CantCreate => "Cannot create output file",
            ExitCode::IoError => "I/O error",
            ExitCode::NoPerm => "Permission denied",
            ExitCode::Config => "Configuration error",
            ExitCode::Interrupted => "Interrupted by signal (SIGINT)",
            ExitCode::Terminated => "Terminated by signal (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_error(self) -> bool {
        !self.is_success()
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_core_error_variant() {
        assert_eq!(ExitCode::from_core_error(&CoreError::config("x")), ExitCode::Config);
        assert_eq!(ExitCode::from_core_error(&CoreError::not_found("x")), ExitCode::NoInput);
        assert_eq!(ExitCode::from_core_error(&CoreError::arity_mismatch("x")), ExitCode::DataError);
        assert_eq!(ExitCode::from_core_error(&CoreError::internal("x")), ExitCode::Software);
    }

    #[test]
    fn anyhow_prefers_the_wrapped_core_error() {
        let err = anyhow::Error::new(CoreError::not_found("dataset 'd'"));
        assert_eq!(ExitCode::from_anyhow(&err), ExitCode::NoInput);
    }

    #[test]
    fn anyhow_falls_back_to_string_sniffing() {
        let err = anyhow::anyhow!("project directory already exists");
        assert_eq!(ExitCode::from_anyhow(&err), ExitCode::CantCreate);
    }

    #[test]
    fn is_signal_is_true_only_for_the_two_signal_codes() {
        assert!(ExitCode::Interrupted.is_signal());
        assert!(ExitCode::Terminated.is_signal());
        assert!(!ExitCode::Success.is_signal());
    }

    #[test]
    fn conversion_to_i32_matches_sysexits() {
        let code: i32 = ExitCode::Config.into();
        assert_eq!(code, 78);
    }
}
