// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Aggregation of finished runs.
//!
//! Repeated runs are stored one per directory, named `<provider>_<n>`.
//! The summary groups rows from all of them by provider, NIST level and
//! `KEM | SIG` label and reports mean and standard deviation of
//! connections/s. Micro-benchmark files are aggregated per algorithm.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{BenchError, BenchResult};
use crate::results::ResultSchema;

/// Count, mean and sample standard deviation of a set of readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    /// Zero for fewer than two readings.
    pub std_dev: f64,
}

impl Stats {
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let variance = values
                .iter()
                .map(|&x| {
                    let diff = x - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        };

        Self {
            count,
            mean,
            std_dev,
        }
    }
}

/// Aggregated TLS throughput of one combination for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct TlsSummaryEntry {
    pub provider: String,
    pub nist_level: u8,
    /// `KEM | SIG`
    pub label: String,
    pub connections_per_sec: Stats,
}

/// Aggregated micro-benchmark rates of one algorithm for one provider.
#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmSummaryEntry {
    pub provider: String,
    pub algorithm: String,
    pub keygens_per_sec: Stats,
    /// Encaps/s for a KEM, signs/s for a signature scheme.
    pub op1_per_sec: Stats,
    /// Decaps/s for a KEM, verify/s for a signature scheme.
    pub op2_per_sec: Stats,
}

/// One run directory that contributed to the summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSource {
    pub path: PathBuf,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub runs: Vec<RunSource>,
    pub tls: Vec<TlsSummaryEntry>,
    pub kem: Vec<AlgorithmSummaryEntry>,
    pub sig: Vec<AlgorithmSummaryEntry>,
}

type TlsKey = (String, u8, String);
type AlgorithmKey = (String, String);

#[derive(Default)]
struct AlgorithmSamples {
    keygen: Vec<f64>,
    op1: Vec<f64>,
    op2: Vec<f64>,
}

impl SummaryReport {
    /// Aggregate the result files of every directory in `dirs`.
    ///
    /// `results_tls.csv` must exist in each directory; the micro-benchmark
    /// files are optional. File names are the default ones.
    pub fn from_run_dirs(dirs: &[PathBuf]) -> BenchResult<Self> {
        let mut runs = Vec::with_capacity(dirs.len());
        let mut tls: BTreeMap<TlsKey, Vec<f64>> = BTreeMap::new();
        let mut kem: BTreeMap<AlgorithmKey, AlgorithmSamples> = BTreeMap::new();
        let mut sig: BTreeMap<AlgorithmKey, AlgorithmSamples> = BTreeMap::new();

        for dir in dirs {
            let provider = provider_name(dir);
            tracing::debug!(dir = %dir.display(), provider = %provider, "Reading run directory");

            let tls_path = dir.join("results_tls.csv");
            for (line, fields) in read_rows(&tls_path, ResultSchema::Tls)? {
                let level = fields[0]
                    .parse::<u8>()
                    .map_err(|e| malformed(&tls_path, line, e))?;
                let value = parse_rate(&tls_path, line, &fields[4])?;
                tls.entry((provider.clone(), level, format!("{} | {}", fields[2], fields[3])))
                    .or_default()
                    .push(value);
            }

            for (file, schema, target) in [
                ("results_kem_alg.csv", ResultSchema::KemAlgorithm, &mut kem),
                ("results_sig_alg.csv", ResultSchema::SigAlgorithm, &mut sig),
            ] {
                let path = dir.join(file);
                if !path.exists() {
                    continue;
                }
                for (line, fields) in read_rows(&path, schema)? {
                    let samples = target.entry((provider.clone(), fields[1].clone())).or_default();
                    samples.keygen.push(parse_rate(&path, line, &fields[2])?);
                    samples.op1.push(parse_rate(&path, line, &fields[3])?);
                    samples.op2.push(parse_rate(&path, line, &fields[4])?);
                }
            }

            runs.push(RunSource {
                path: dir.clone(),
                provider,
            });
        }

        Ok(Self {
            generated_at: Utc::now(),
            runs,
            tls: tls
                .into_iter()
                .map(|((provider, nist_level, label), values)| TlsSummaryEntry {
                    provider,
                    nist_level,
                    label,
                    connections_per_sec: Stats::from_values(&values),
                })
                .collect(),
            kem: algorithm_entries(kem),
            sig: algorithm_entries(sig),
        })
    }

    /// Write the summary as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> BenchResult<()> {
        let file = File::create(path.as_ref()).map_err(|e| BenchError::Io {
            context: "creating summary file",
            source: e,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Provider a run directory belongs to: its name without a trailing
/// `_<n>` repetition suffix.
pub fn provider_name(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    match name.rsplit_once('_') {
        Some((prefix, suffix))
            if !prefix.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            prefix.to_string()
        }
        _ => name,
    }
}

fn algorithm_entries(samples: BTreeMap<AlgorithmKey, AlgorithmSamples>) -> Vec<AlgorithmSummaryEntry> {
    samples
        .into_iter()
        .map(|((provider, algorithm), s)| AlgorithmSummaryEntry {
            provider,
            algorithm,
            keygens_per_sec: Stats::from_values(&s.keygen),
            op1_per_sec: Stats::from_values(&s.op1),
            op2_per_sec: Stats::from_values(&s.op2),
        })
        .collect()
}

/// Data rows of a result file as (1-based line number, fields).
fn read_rows(path: &Path, schema: ResultSchema) -> BenchResult<Vec<(usize, Vec<String>)>> {
    let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
        context: "reading result file",
        source: e,
    })?;

    let mut lines = content.lines();
    match lines.next() {
        Some(header) if header.trim() == schema.header() => {}
        other => {
            return Err(malformed(
                path,
                1,
                format!("expected header '{}', found '{}'", schema.header(), other.unwrap_or("")),
            ))
        }
    }

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let line_no = index + 2;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
        if fields.len() != 5 {
            return Err(malformed(path, line_no, format!("expected 5 fields, found {}", fields.len())));
        }
        rows.push((line_no, fields));
    }

    Ok(rows)
}

fn parse_rate(path: &Path, line: usize, field: &str) -> BenchResult<f64> {
    field.parse::<f64>().map_err(|e| malformed(path, line, e))
}

fn malformed(path: &Path, line: usize, reason: impl ToString) -> BenchError {
    BenchError::MalformedResults {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}
