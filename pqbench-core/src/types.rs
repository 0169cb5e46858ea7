// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Algorithm names end up unquoted inside shell commands, so they are
//! validated once at construction and can be trusted everywhere after.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum accepted algorithm identifier length.
const MAX_ALGORITHM_LEN: usize = 64;

/// NIST security strength category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NistLevel(u8);

impl NistLevel {
    /// The three standardized levels in ascending order.
    pub const ALL: [NistLevel; 3] = [NistLevel(1), NistLevel(3), NistLevel(5)];

    /// Create a new NistLevel with validation.
    pub fn new(level: u8) -> Result<Self, HardValidationError> {
        match level {
            1 | 3 | 5 => Ok(Self(level)),
            _ => Err(HardValidationError::InvalidNistLevel { level }),
        }
    }

    /// Built-in table entry; checked by the config tests instead of at runtime.
    pub(crate) fn builtin(level: u8) -> Self {
        Self(level)
    }

    /// Get the inner level value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for NistLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for NistLevel {
    type Error = HardValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NistLevel> for u8 {
    fn from(level: NistLevel) -> Self {
        level.0
    }
}

/// Validated algorithm identifier as understood by the external tooling,
/// e.g. `mlkem768`, `rsa:3072`, `ML-KEM-512`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlgorithmName(String);

impl AlgorithmName {
    /// Create a new AlgorithmName with validation.
    ///
    /// Only `[A-Za-z0-9_.:+-]` is accepted; anything else could be
    /// interpreted by the shell.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(HardValidationError::InvalidAlgorithm {
                name,
                reason: "Algorithm name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_ALGORITHM_LEN {
            let reason = format!(
                "Algorithm name too long: {} chars (max {})",
                name.len(),
                MAX_ALGORITHM_LEN
            );
            return Err(HardValidationError::InvalidAlgorithm { name, reason });
        }

        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+')))
        {
            return Err(HardValidationError::InvalidAlgorithm {
                reason: format!("Character {:?} is not allowed", bad),
                name,
            });
        }

        Ok(Self(name))
    }

    /// Built-in table entry; checked by the config tests instead of at runtime.
    pub(crate) fn builtin(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlgorithmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AlgorithmName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AlgorithmName> for String {
    fn from(name: AlgorithmName) -> Self {
        name.0
    }
}

/// One (NIST level, KEM, SIG) tuple under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmCombination {
    pub nist_level: NistLevel,
    pub kem: AlgorithmName,
    pub sig: AlgorithmName,
}

impl fmt::Display for AlgorithmCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} ({} | {})", self.nist_level, self.kem, self.sig)
    }
}
