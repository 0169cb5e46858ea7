// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sweep controller.
//!
//! Drives the run strictly in order: preflight, TLS sweep, KEM
//! micro-benchmarks, SIG micro-benchmarks. Exactly one external process
//! is in flight at a time and a server is always reaped before the next
//! one starts. Every step returns a `Result`; the controller alone decides,
//! through the configured [`FailurePolicy`](crate::config::FailurePolicy),
//! whether a failure skips a row or ends the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{BenchConfig, Disposition, Stages};
use crate::error::{BenchError, BenchResult};
use crate::measure::MeasurementRunner;
use crate::process::ServerLauncher;
use crate::results::{AlgorithmRow, ResultFile, ResultSet, TlsRow};
use crate::types::{AlgorithmCombination, AlgorithmName};

/// Shared flag tripped by a signal handler to stop the sweep.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A data point that was dropped under the failure policy.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub subject: String,
    pub reason: String,
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub tls_rows: usize,
    pub kem_rows: usize,
    pub sig_rows: usize,
    pub skipped: Vec<SkippedRow>,
    pub elapsed: Duration,
}

impl SweepReport {
    /// True when no data point was dropped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Process exit code: a sweep with skipped rows left the matrix
    /// incomplete and reports failure.
    pub fn exit_code(&self) -> i32 {
        if self.is_complete() {
            0
        } else {
            1
        }
    }
}

/// Everything a run would do, without running it.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPlan {
    pub combinations: Vec<AlgorithmCombination>,
    pub kem_algorithms: Vec<AlgorithmName>,
    pub sig_algorithms: Vec<AlgorithmName>,
    pub stages: Stages,
    pub test_time_secs: u64,
}

/// Primitive family of a micro-benchmark stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrimitiveStage {
    Kem,
    Sig,
}

impl PrimitiveStage {
    fn label(&self) -> &'static str {
        match self {
            PrimitiveStage::Kem => "kem",
            PrimitiveStage::Sig => "sig",
        }
    }
}

/// The benchmark run controller.
pub struct SweepController {
    config: BenchConfig,
    cancel: CancelFlag,
}

impl SweepController {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn plan(&self) -> SweepPlan {
        SweepPlan {
            combinations: self.config.combinations(),
            kem_algorithms: self.config.kem_performance.clone(),
            sig_algorithms: self.config.sig_performance.clone(),
            stages: self.config.stages,
            test_time_secs: self.config.test_time_secs,
        }
    }

    /// Run the full sweep.
    ///
    /// # Errors
    /// `ResultFileExists` before any work if a result file is present;
    /// otherwise the first error the failure policy says to abort on, or
    /// `Interrupted` once the cancellation flag is set.
    pub fn run(&self) -> BenchResult<SweepReport> {
        let start = Instant::now();
        let results = ResultSet::preflight(&self.config.output)?;
        let mut report = SweepReport::default();

        tracing::info!(
            output_dir = %self.config.output.dir.display(),
            alt_provider = self.config.use_alt_provider,
            "Result files created"
        );

        if self.config.stages.tls {
            self.run_tls_sweep(&results.tls, &mut report)?;
            tracing::info!(
                rows = report.tls_rows,
                path = %results.tls.path().display(),
                "All tls-connections/s tests completed"
            );
        }

        if self.config.stages.kem {
            report.kem_rows =
                self.run_primitive_sweep(PrimitiveStage::Kem, &results.kem, &mut report.skipped)?;
        }

        if self.config.stages.sig {
            report.sig_rows =
                self.run_primitive_sweep(PrimitiveStage::Sig, &results.sig, &mut report.skipped)?;
        } else {
            tracing::info!(
                path = %results.sig.path().display(),
                "SIG micro-benchmark stage disabled, leaving header-only file"
            );
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }

    fn run_tls_sweep(&self, file: &ResultFile, report: &mut SweepReport) -> BenchResult<()> {
        let launcher = ServerLauncher::from_config(&self.config);
        let runner = MeasurementRunner::from_config(&self.config);

        for combination in self.config.combinations() {
            self.check_cancelled()?;
            tracing::info!(
                level = %combination.nist_level,
                "Testing (KEM | SIG): ({} | {})",
                combination.kem,
                combination.sig
            );

            let outcome = launcher.with_server(&combination.kem, &combination.sig, |_server| {
                let measurement = runner.run_tls_measurement();
                // an interrupt also kills the load generator; report it as such
                self.check_cancelled()?;
                measurement
            });

            match outcome {
                Ok(throughput) => {
                    tracing::info!("  Result: {} connections/s", throughput);
                    file.append(&TlsRow {
                        combination: &combination,
                        test_time_secs: self.config.test_time_secs,
                        throughput: &throughput,
                    })?;
                    report.tls_rows += 1;
                }
                Err(err) => self.handle_failure(err, combination.to_string(), &mut report.skipped)?,
            }
        }

        Ok(())
    }

    fn run_primitive_sweep(
        &self,
        stage: PrimitiveStage,
        file: &ResultFile,
        skipped: &mut Vec<SkippedRow>,
    ) -> BenchResult<usize> {
        let runner = MeasurementRunner::from_config(&self.config);
        let algorithms = match stage {
            PrimitiveStage::Kem => &self.config.kem_performance,
            PrimitiveStage::Sig => &self.config.sig_performance,
        };

        tracing::info!(stage = stage.label(), "Getting algorithm performance");

        let mut rows = 0;
        for algorithm in algorithms {
            self.check_cancelled()?;

            let measurement = runner.run_algorithm_measurement(algorithm);
            self.check_cancelled()?;

            match measurement {
                Ok(rates) => {
                    tracing::info!("  Algorithm {} performance: {}", algorithm, rates);
                    file.append(&AlgorithmRow {
                        test_time_secs: self.config.test_time_secs,
                        algorithm,
                        rates: &rates,
                    })?;
                    rows += 1;
                }
                Err(err) => self.handle_failure(err, algorithm.to_string(), skipped)?,
            }
        }

        tracing::info!(
            stage = stage.label(),
            rows,
            path = %file.path().display(),
            "All algorithm performance tests completed"
        );
        Ok(rows)
    }

    /// Apply the failure policy: `Ok` means the row is dropped and the
    /// sweep goes on.
    fn handle_failure(
        &self,
        err: BenchError,
        subject: String,
        skipped: &mut Vec<SkippedRow>,
    ) -> BenchResult<()> {
        match self.config.on_failure.decide(&err) {
            Disposition::Abort => {
                tracing::error!(subject = %subject, error = %err, "Aborting sweep");
                Err(err)
            }
            Disposition::SkipRow | Disposition::Continue => {
                tracing::warn!(subject = %subject, error = %err, "Skipping data point");
                skipped.push(SkippedRow {
                    subject,
                    reason: err.to_string(),
                });
                Ok(())
            }
        }
    }

    fn check_cancelled(&self) -> BenchResult<()> {
        if self.cancel.is_cancelled() {
            return Err(BenchError::Interrupted);
        }
        Ok(())
    }
}
