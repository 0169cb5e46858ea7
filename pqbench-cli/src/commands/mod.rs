// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod plan;
pub mod run;
pub mod summarize;
pub mod validate;

use pqbench_core::{BenchConfig, BenchResult, ConfigLoader};

/// Load `path`, or fall back to the built-in matrix when no file is given.
pub fn load_config(path: Option<&str>) -> BenchResult<BenchConfig> {
    match path {
        Some(path) => {
            tracing::debug!(config = %path, "Loading configuration");
            ConfigLoader::load_file(path)
        }
        None => {
            tracing::debug!("No configuration file given, using built-in matrix");
            Ok(BenchConfig::default())
        }
    }
}

/// Load the configuration or exit with the error's code.
pub fn load_config_or_exit(path: Option<&str>) -> BenchConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
