// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pqbench summarize` command - Aggregate repeated runs.

use std::path::PathBuf;

use pqbench_core::report::AlgorithmSummaryEntry;
use pqbench_core::SummaryReport;

pub async fn execute(dirs: &[String], json: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let dirs: Vec<PathBuf> = dirs.iter().map(PathBuf::from).collect();
    tracing::info!(runs = dirs.len(), "Summarizing result directories");

    let report = match SummaryReport::from_run_dirs(&dirs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ Could not summarize results:");
            eprintln!("  {}", e);
            std::process::exit(e.exit_code());
        }
    };

    println!(
        "{:<10} {:<6} {:<28} {:>4} {:>12} {:>10}",
        "PROVIDER", "LEVEL", "KEM | SIG", "N", "MEAN/s", "STD"
    );
    for entry in &report.tls {
        println!(
            "{:<10} {:<6} {:<28} {:>4} {:>12.2} {:>10.2}",
            entry.provider,
            format!("L{}", entry.nist_level),
            entry.label,
            entry.connections_per_sec.count,
            entry.connections_per_sec.mean,
            entry.connections_per_sec.std_dev
        );
    }

    print_algorithms("KEM", ["KEYGEN/s", "ENCAPS/s", "DECAPS/s"], &report.kem);
    print_algorithms("SIG", ["KEYGEN/s", "SIGN/s", "VERIFY/s"], &report.sig);

    if let Some(path) = json {
        report.save_json(path)?;
        println!();
        println!("✓ Summary written to {}", path);
    }

    Ok(())
}

fn print_algorithms(kind: &str, columns: [&str; 3], entries: &[AlgorithmSummaryEntry]) {
    if entries.is_empty() {
        return;
    }

    println!();
    println!(
        "{:<10} {:<16} {:>4} {:>14} {:>14} {:>14}",
        "PROVIDER", kind, "N", columns[0], columns[1], columns[2]
    );
    for entry in entries {
        println!(
            "{:<10} {:<16} {:>4} {:>14.1} {:>14.1} {:>14.1}",
            entry.provider,
            entry.algorithm,
            entry.keygens_per_sec.count,
            entry.keygens_per_sec.mean,
            entry.op1_per_sec.mean,
            entry.op2_per_sec.mean
        );
    }
}
