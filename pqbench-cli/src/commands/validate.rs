// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pqbench validate` command - Validate configuration file.

use pqbench_core::{ConfigLoader, Readiness};

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Sweep Settings:");
            println!("  Test Time:          {}s", config.test_time_secs);
            println!("  Output Directory:   {}", config.output.dir.display());
            match &config.readiness {
                Readiness::Grace(grace) => {
                    println!("  Readiness:          grace period {}ms", grace.as_millis())
                }
                Readiness::Probe {
                    address,
                    timeout,
                    interval,
                } => println!(
                    "  Readiness:          probe {} (timeout: {}ms, interval: {}ms)",
                    address,
                    timeout.as_millis(),
                    interval.as_millis()
                ),
            }
            println!(
                "  On Failure:         certificate={:?} readiness={:?} parse={:?}",
                config.on_failure.certificate, config.on_failure.readiness, config.on_failure.parse
            );
            println!();
            println!("Levels ({}):", config.levels.len());
            for table in &config.levels {
                println!(
                    "  - L{} (kem: {}, sig: {})",
                    table.level,
                    join(&table.kem),
                    join(&table.sig)
                );
            }
            println!();
            println!("KEM Performance: {}", join(&config.kem_performance));
            println!(
                "SIG Performance: {}{}",
                join(&config.sig_performance),
                if config.stages.sig { "" } else { " (stage disabled)" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn join(names: &[pqbench_core::AlgorithmName]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
