// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Measurement runner.
//!
//! Invokes the TLS load generator or the primitive micro-benchmark and
//! pulls the numbers out of their human-readable output.

use std::fmt;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::command::ShellCommand;
use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult, ParseError};
use crate::types::AlgorithmName;

/// First decimal number followed by one whitespace character.
const THROUGHPUT_PATTERN: &str = r"\d+\.\d+\s";

/// Trailing run of digits, dots and whitespace.
const TRAILING_RATES_PATTERN: &str = r"[0-9.\s]*$";

fn throughput_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(THROUGHPUT_PATTERN).expect("throughput pattern compiles"))
}

fn trailing_rates_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TRAILING_RATES_PATTERN).expect("rates pattern compiles"))
}

/// TLS connections per second as printed by the load generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsThroughput {
    raw: String,
}

impl TlsThroughput {
    /// The matched text, including its trailing whitespace character.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The number without surrounding whitespace.
    pub fn value(&self) -> &str {
        self.raw.trim()
    }
}

impl fmt::Display for TlsThroughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Keygen rate plus the two operation rates of one primitive
/// (encaps/decaps for a KEM, sign/verify for a signature scheme).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmRates {
    pub keygen: String,
    pub op1: String,
    pub op2: String,
}

impl fmt::Display for AlgorithmRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.keygen, self.op1, self.op2)
    }
}

/// Extract the connections/s figure from load generator output.
pub fn parse_throughput(output: &str) -> Result<TlsThroughput, ParseError> {
    throughput_regex()
        .find(output)
        .map(|m| TlsThroughput {
            raw: m.as_str().to_string(),
        })
        .ok_or_else(|| ParseError::NoThroughput {
            output: output.to_string(),
        })
}

/// Extract exactly three rates from the tail of micro-benchmark output.
pub fn parse_rates(algorithm: &str, output: &str) -> Result<AlgorithmRates, ParseError> {
    let tail = trailing_rates_regex()
        .find(output)
        .map(|m| m.as_str())
        .unwrap_or_default();

    let fields: Vec<&str> = tail.split_whitespace().collect();
    match fields.as_slice() {
        [keygen, op1, op2] => Ok(AlgorithmRates {
            keygen: keygen.to_string(),
            op1: op1.to_string(),
            op2: op2.to_string(),
        }),
        _ => Err(ParseError::FieldCount {
            algorithm: algorithm.to_string(),
            found: fields.len(),
            output: output.to_string(),
        }),
    }
}

/// Runs the load generator and the micro-benchmark tool.
#[derive(Debug, Clone)]
pub struct MeasurementRunner {
    tls_client: String,
    algorithm_benchmark: String,
    test_time_secs: u64,
    use_alt_provider: bool,
}

impl MeasurementRunner {
    pub fn new(
        tls_client: impl Into<String>,
        algorithm_benchmark: impl Into<String>,
        test_time_secs: u64,
        use_alt_provider: bool,
    ) -> Self {
        Self {
            tls_client: tls_client.into(),
            algorithm_benchmark: algorithm_benchmark.into(),
            test_time_secs,
            use_alt_provider,
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(
            &config.tools.tls_client,
            &config.tools.algorithm_benchmark,
            config.test_time_secs,
            config.use_alt_provider,
        )
    }

    pub fn tls_command(&self) -> ShellCommand {
        ShellCommand::new(&self.tls_client)
            .env("TEST_TIME", self.test_time_secs)
            .flag("USE_ALT_PROVIDER", self.use_alt_provider)
    }

    pub fn algorithm_command(&self, algorithm: &AlgorithmName) -> ShellCommand {
        ShellCommand::new(&self.algorithm_benchmark)
            .env("ALG", algorithm)
            .env("TEST_TIME", self.test_time_secs)
            .flag("USE_ALT_PROVIDER", self.use_alt_provider)
    }

    /// Run the load generator against the live server.
    ///
    /// # Errors
    /// `Parse(NoThroughput)` if the output holds no decimal figure.
    pub fn run_tls_measurement(&self) -> BenchResult<TlsThroughput> {
        let command = self.tls_command();
        tracing::info!("Running performance test");
        tracing::debug!(command = %command, "Test command");

        let output = self.capture(&command)?;
        parse_throughput(&output).map_err(|e| {
            tracing::error!("Could not parse TLS measurement output. Full output:\n{}", output);
            e.into()
        })
    }

    /// Run the micro-benchmark for one algorithm.
    ///
    /// # Errors
    /// `Parse(FieldCount)` unless the tail holds exactly three numbers.
    /// The full output is logged first.
    pub fn run_algorithm_measurement(&self, algorithm: &AlgorithmName) -> BenchResult<AlgorithmRates> {
        let command = self.algorithm_command(algorithm);
        tracing::info!(algorithm = %algorithm, "Running algorithm performance test");
        tracing::debug!(command = %command, "Algorithm test command");

        let output = self.capture(&command)?;
        parse_rates(algorithm.as_str(), &output).map_err(|e| {
            tracing::error!(
                algorithm = %algorithm,
                "Could not parse algorithm performance output. Full output:\n{}",
                output
            );
            e.into()
        })
    }

    /// Run `command` to completion and return stdout with stderr folded in.
    fn capture(&self, command: &ShellCommand) -> BenchResult<String> {
        let output = command
            .to_merged_process()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BenchError::ToolSpawn {
                command: command.render(),
                source: e,
            })?;

        if !output.status.success() {
            tracing::warn!(
                status = %output.status,
                command = %command,
                "Measurement tool exited unsuccessfully"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
