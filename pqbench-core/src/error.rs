//! Custom error types for pqbench.
//!
//! All errors are explicit enum variants. The sweep controller inspects
//! [`BenchError::kind`] to decide whether a failure skips one row or aborts
//! the whole run.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the benchmark run controller.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Preflight Errors - Existing Results Are Never Touched
    // =========================================================================
    #[error("Result file already exists: {path} - move or delete it before running")]
    ResultFileExists { path: PathBuf },

    // =========================================================================
    // External Tool Errors
    // =========================================================================
    #[error("Certificate creation for {sig_alg} failed ({status}): {stderr}")]
    CertificateTool {
        sig_alg: String,
        status: String,
        stderr: String,
        /// Paths the tool was asked to write; they may be missing or stale.
        certificate: crate::process::ProvisionedCertificate,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    ToolSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Server Lifecycle Errors
    // =========================================================================
    #[error("Server for {kem_alg} did not accept connections on {address} within {waited_ms}ms")]
    ServerNotReady {
        kem_alg: String,
        address: String,
        waited_ms: u64,
    },

    #[error("Server for {kem_alg} exited before becoming ready: {status}")]
    ServerExited { kem_alg: String, status: String },

    // =========================================================================
    // Measurement Errors - Malformed Readings Invalidate the Run
    // =========================================================================
    #[error("Measurement parse error: {0}")]
    Parse(#[from] ParseError),

    // =========================================================================
    // Summary Errors
    // =========================================================================
    #[error("Malformed result file {path} at line {line}: {reason}")]
    MalformedResults {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Sweep interrupted")]
    Interrupted,
}

/// Hard validation errors reject a configuration before anything runs.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid NIST level: {level} (expected 1, 3 or 5)")]
    InvalidNistLevel { level: u8 },

    #[error("Duplicate NIST level: {level}")]
    DuplicateNistLevel { level: u8 },

    #[error("Invalid algorithm name '{name}': {reason}")]
    InvalidAlgorithm { name: String, reason: String },
}

/// Errors extracting numbers from tool output.
///
/// Both variants carry the complete raw output so the log holds enough
/// context to diagnose the run without repeating it.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no connections/s figure found in load generator output")]
    NoThroughput { output: String },

    #[error("expected 3 rate fields for {algorithm}, found {found}")]
    FieldCount {
        algorithm: String,
        found: usize,
        output: String,
    },
}

impl ParseError {
    /// Raw tool output the parse was attempted on.
    pub fn output(&self) -> &str {
        match self {
            ParseError::NoThroughput { output } => output,
            ParseError::FieldCount { output, .. } => output,
        }
    }
}

/// Coarse classification used by the failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Certificate tool returned non-zero.
    Provisioning,
    /// Server never became reachable or died during startup.
    Readiness,
    /// Tool output did not match the expected shape.
    Parse,
    /// Everything else: config, preflight, spawn, IO, interrupt.
    Fatal,
}

impl BenchError {
    /// Classify this error for the sweep controller.
    pub fn kind(&self) -> FailureKind {
        match self {
            BenchError::CertificateTool { .. } => FailureKind::Provisioning,
            BenchError::ServerNotReady { .. } | BenchError::ServerExited { .. } => {
                FailureKind::Readiness
            }
            BenchError::Parse(_) => FailureKind::Parse,
            _ => FailureKind::Fatal,
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
