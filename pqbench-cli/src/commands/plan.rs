// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pqbench plan` command - Show what a run would measure.

use pqbench_core::SweepController;

use super::load_config_or_exit;

pub async fn execute(config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let controller = SweepController::new(load_config_or_exit(config_path));
    let plan = controller.plan();
    let config = controller.config();

    println!("Test time: {}s per measurement", plan.test_time_secs);
    println!("Output:    {}", config.output.dir.display());
    println!();

    if plan.stages.tls {
        println!("TLS handshakes ({}):", plan.combinations.len());
        for combination in &plan.combinations {
            println!("  - {}", combination);
        }
    } else {
        println!("TLS handshakes: disabled");
    }
    println!();

    print_stage("KEM micro-benchmarks", plan.stages.kem, &plan.kem_algorithms);
    print_stage("SIG micro-benchmarks", plan.stages.sig, &plan.sig_algorithms);

    Ok(())
}

fn print_stage(title: &str, enabled: bool, algorithms: &[pqbench_core::AlgorithmName]) {
    if !enabled {
        println!("{}: disabled", title);
        return;
    }
    println!("{} ({}):", title, algorithms.len());
    for algorithm in algorithms {
        println!("  - {}", algorithm);
    }
}
