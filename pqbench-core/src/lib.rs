//! pqbench Core Library
//!
//! Benchmark run controller for post-quantum and classical TLS handshakes.
//! Sweeps every configured (NIST level, KEM, SIG) combination against a
//! freshly provisioned server, runs KEM/SIG micro-benchmarks, and appends
//! every reading to CSV result files. Also aggregates finished runs.

pub mod command;
pub mod config;
pub mod error;
pub mod measure;
pub mod process;
pub mod report;
pub mod results;
pub mod sweep;
pub mod types;

// Re-export commonly used types
pub use config::{BenchConfig, ConfigLoader, Disposition, FailurePolicy, Readiness};
pub use error::{BenchError, BenchResult, FailureKind, HardValidationError, ParseError};
pub use report::SummaryReport;
pub use sweep::{CancelFlag, SweepController, SweepPlan, SweepReport};
pub use types::{AlgorithmCombination, AlgorithmName, NistLevel};
