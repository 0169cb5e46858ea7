// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CSV result files.
//!
//! Three append-only files, each created with its header at sweep start.
//! A file that already exists is never opened for writing: the preflight
//! check refuses the whole run instead.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{BenchError, BenchResult};
use crate::measure::{AlgorithmRates, TlsThroughput};
use crate::types::{AlgorithmCombination, AlgorithmName};

/// Which of the three result schemas a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSchema {
    Tls,
    KemAlgorithm,
    SigAlgorithm,
}

impl ResultSchema {
    pub fn header(&self) -> &'static str {
        match self {
            ResultSchema::Tls => "nist_level,test_time,KEM,SIG,connections/s",
            ResultSchema::KemAlgorithm => "test_time,kem-algorithm,keygens/s,encaps/s,decaps/s",
            ResultSchema::SigAlgorithm => "test_time,sig-algorithm,keygens/s,signs/s,verify/s",
        }
    }
}

/// A row that can be appended to a result file.
pub trait CsvRow {
    fn to_csv(&self) -> String;
}

/// One TLS handshake throughput data point.
#[derive(Debug, Clone)]
pub struct TlsRow<'a> {
    pub combination: &'a AlgorithmCombination,
    pub test_time_secs: u64,
    pub throughput: &'a TlsThroughput,
}

impl CsvRow for TlsRow<'_> {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.combination.nist_level,
            self.test_time_secs,
            self.combination.kem,
            self.combination.sig,
            self.throughput.value()
        )
    }
}

/// One primitive micro-benchmark data point.
#[derive(Debug, Clone)]
pub struct AlgorithmRow<'a> {
    pub test_time_secs: u64,
    pub algorithm: &'a AlgorithmName,
    pub rates: &'a AlgorithmRates,
}

impl CsvRow for AlgorithmRow<'_> {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.test_time_secs, self.algorithm, self.rates.keygen, self.rates.op1, self.rates.op2
        )
    }
}

/// Append-only CSV file with a fixed header.
#[derive(Debug, Clone)]
pub struct ResultFile {
    path: PathBuf,
    schema: ResultSchema,
}

impl ResultFile {
    /// Create `path` with the schema header. Fails if it already exists.
    fn create(path: PathBuf, schema: ResultSchema) -> BenchResult<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => BenchError::ResultFileExists { path: path.clone() },
                _ => BenchError::Io {
                    context: "creating result file",
                    source: e,
                },
            })?;

        writeln!(file, "{}", schema.header()).map_err(|e| BenchError::Io {
            context: "writing result header",
            source: e,
        })?;

        Ok(Self { path, schema })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> ResultSchema {
        self.schema
    }

    /// Open, append one row, close.
    pub fn append(&self, row: &impl CsvRow) -> BenchResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::Io {
                context: "opening result file",
                source: e,
            })?;

        writeln!(file, "{}", row.to_csv()).map_err(|e| BenchError::Io {
            context: "appending result row",
            source: e,
        })
    }
}

/// The three result files of one sweep.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub tls: ResultFile,
    pub kem: ResultFile,
    pub sig: ResultFile,
}

impl ResultSet {
    /// Refuse to run if any target file exists; otherwise create the
    /// output directory and all three files with their headers.
    ///
    /// # Errors
    /// `ResultFileExists` naming the first existing file. In that case no
    /// file has been created or modified.
    pub fn preflight(output: &OutputConfig) -> BenchResult<Self> {
        let targets = [
            (output.tls_path(), ResultSchema::Tls),
            (output.kem_path(), ResultSchema::KemAlgorithm),
            (output.sig_path(), ResultSchema::SigAlgorithm),
        ];

        let existing: Vec<PathBuf> = targets
            .iter()
            .map(|(path, _)| path)
            .filter(|path| path.exists())
            .cloned()
            .collect();

        if let Some(first) = existing.first() {
            for path in &existing {
                tracing::error!(
                    path = %path.display(),
                    "Result file already exists. Please move or delete it before running the tests."
                );
            }
            return Err(BenchError::ResultFileExists {
                path: first.clone(),
            });
        }

        std::fs::create_dir_all(&output.dir).map_err(|e| BenchError::Io {
            context: "creating output directory",
            source: e,
        })?;

        let [(tls, tls_schema), (kem, kem_schema), (sig, sig_schema)] = targets;
        Ok(Self {
            tls: ResultFile::create(tls, tls_schema)?,
            kem: ResultFile::create(kem, kem_schema)?,
            sig: ResultFile::create(sig, sig_schema)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NistLevel;
    use tempfile::TempDir;

    fn output_in(dir: &Path) -> OutputConfig {
        OutputConfig {
            dir: dir.to_path_buf(),
            tls_file: "results_tls.csv".to_string(),
            kem_file: "results_kem_alg.csv".to_string(),
            sig_file: "results_sig_alg.csv".to_string(),
        }
    }

    #[test]
    fn test_preflight_writes_headers() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_in(&temp_dir.path().join("nested/results"));

        let set = ResultSet::preflight(&output).unwrap();
        assert_eq!(
            std::fs::read_to_string(set.tls.path()).unwrap(),
            "nist_level,test_time,KEM,SIG,connections/s\n"
        );
        assert_eq!(
            std::fs::read_to_string(set.kem.path()).unwrap(),
            "test_time,kem-algorithm,keygens/s,encaps/s,decaps/s\n"
        );
        assert_eq!(
            std::fs::read_to_string(set.sig.path()).unwrap(),
            "test_time,sig-algorithm,keygens/s,signs/s,verify/s\n"
        );
    }

    #[test]
    fn test_preflight_refuses_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_in(temp_dir.path());
        std::fs::write(output.kem_path(), "previous run\n").unwrap();

        let err = ResultSet::preflight(&output).unwrap_err();
        assert!(matches!(err, BenchError::ResultFileExists { ref path } if *path == output.kem_path()));

        // nothing created, nothing truncated
        assert!(!output.tls_path().exists());
        assert!(!output.sig_path().exists());
        assert_eq!(std::fs::read_to_string(output.kem_path()).unwrap(), "previous run\n");
    }

    #[test]
    fn test_append_rows() {
        let temp_dir = TempDir::new().unwrap();
        let set = ResultSet::preflight(&output_in(temp_dir.path())).unwrap();

        let combination = AlgorithmCombination {
            nist_level: NistLevel::new(1).unwrap(),
            kem: AlgorithmName::new("X25519").unwrap(),
            sig: AlgorithmName::new("rsa:3072").unwrap(),
        };
        let throughput = crate::measure::parse_throughput("1439.44 connections/user sec").unwrap();
        set.tls
            .append(&TlsRow {
                combination: &combination,
                test_time_secs: 1,
                throughput: &throughput,
            })
            .unwrap();

        let algorithm = AlgorithmName::new("ML-KEM-512").unwrap();
        let rates = crate::measure::parse_rates("ML-KEM-512", "1.5 2.5 3.5").unwrap();
        set.kem
            .append(&AlgorithmRow {
                test_time_secs: 1,
                algorithm: &algorithm,
                rates: &rates,
            })
            .unwrap();

        let tls = std::fs::read_to_string(set.tls.path()).unwrap();
        assert_eq!(tls.lines().nth(1), Some("1,1,X25519,rsa:3072,1439.44"));
        let kem = std::fs::read_to_string(set.kem.path()).unwrap();
        assert_eq!(kem.lines().nth(1), Some("1,ML-KEM-512,1.5,2.5,3.5"));
    }
}
