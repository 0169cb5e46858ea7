// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pqbench run` command - Run the benchmark sweep.
//!
//! The sweep is blocking and runs on its own thread. Ctrl+C or SIGTERM
//! trips the cancellation flag; the sweep then tears down the live server
//! and returns, and the process exits with code 130.

use pqbench_core::{BenchError, CancelFlag, SweepController, SweepReport};
use tokio::signal::unix::{signal, SignalKind};

use super::load_config_or_exit;

pub async fn execute(
    config_path: Option<&str>,
    alt_provider: bool,
    output_dir: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_exit(config_path).with_alt_provider(alt_provider);
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }

    tracing::info!(
        combinations = config.combinations().len(),
        output_dir = %config.output.dir.display(),
        alt_provider = alt_provider,
        "Starting benchmark sweep"
    );

    let cancel = CancelFlag::new();
    let controller = SweepController::new(config).with_cancel_flag(cancel.clone());
    let mut sweep = tokio::task::spawn_blocking(move || controller.run());
    let mut sigterm = signal(SignalKind::terminate())?;

    let outcome = tokio::select! {
        joined = &mut sweep => joined?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupt received, stopping after teardown");
            cancel.cancel();
            sweep.await?
        }
        _ = sigterm.recv() => {
            tracing::warn!("SIGTERM received, stopping after teardown");
            cancel.cancel();
            sweep.await?
        }
    };

    match outcome {
        Ok(report) => {
            print_report(&report);
            if !report.is_complete() {
                tracing::error!(skipped = report.skipped.len(), "Sweep finished with an incomplete matrix");
                std::process::exit(report.exit_code());
            }
            Ok(())
        }
        Err(e) => {
            // a signalled tool usually fails before the flag is seen
            let e = if cancel.is_cancelled() && !matches!(e, BenchError::Interrupted) {
                tracing::debug!(error = %e, "Error after cancellation");
                BenchError::Interrupted
            } else {
                e
            };
            fail(&e);
            std::process::exit(e.exit_code());
        }
    }
}

fn fail(err: &BenchError) {
    match err {
        BenchError::Interrupted => {
            tracing::warn!("Sweep interrupted, partial results kept");
            eprintln!("✗ Sweep interrupted");
        }
        _ => {
            tracing::error!(error = %err, "Sweep aborted");
            eprintln!("✗ Sweep aborted:");
            eprintln!("  {}", err);
        }
    }
}

fn print_report(report: &SweepReport) {
    println!();
    if report.is_complete() {
        println!("✓ Sweep completed in {:.1}s", report.elapsed.as_secs_f64());
    } else {
        println!("✗ Sweep incomplete after {:.1}s", report.elapsed.as_secs_f64());
    }
    println!("  TLS rows:        {}", report.tls_rows);
    println!("  KEM rows:        {}", report.kem_rows);
    println!("  SIG rows:        {}", report.sig_rows);

    if !report.skipped.is_empty() {
        println!();
        println!("Skipped ({}):", report.skipped.len());
        for row in &report.skipped {
            println!("  - {}: {}", row.subject, row.reason);
        }
    }
}
