// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! The whole sweep is described by one immutable [`BenchConfig`]: the
//! algorithm tables, tool commands, output paths, readiness strategy and
//! failure policy. Any invalid field results in a HardValidationError and
//! nothing runs. Every field has a default, so an empty document (or no
//! file at all) yields the built-in benchmark matrix.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult, FailureKind, HardValidationError};
use crate::types::{AlgorithmCombination, AlgorithmName, NistLevel};

/// Built-in level table: (level, KEM groups, certificate signature algorithms).
const DEFAULT_LEVELS: &[(u8, &[&str], &[&str])] = &[
    (1, &["mlkem512", "X25519", "P-256"], &["mldsa44", "rsa:3072", "ed25519"]),
    (3, &["mlkem768", "X448", "P-384"], &["mldsa65", "rsa:7680", "ed448"]),
    (5, &["mlkem1024", "P-521"], &["mldsa87", "rsa:15360"]),
];

const DEFAULT_KEM_PERFORMANCE: &[&str] = &["ML-KEM-512", "ML-KEM-768", "ML-KEM-1024"];

const DEFAULT_SIG_PERFORMANCE: &[&str] = &["ML-DSA-44", "ML-DSA-65", "ML-DSA-87"];

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Raw level entry as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawLevel {
    level: u8,
    #[serde(default)]
    kem: Vec<String>,
    #[serde(default)]
    sig: Vec<String>,
}

fn default_levels() -> Vec<RawLevel> {
    DEFAULT_LEVELS
        .iter()
        .map(|(level, kem, sig)| RawLevel {
            level: *level,
            kem: strings(kem),
            sig: strings(sig),
        })
        .collect()
}

fn default_kem_performance() -> Vec<String> {
    strings(DEFAULT_KEM_PERFORMANCE)
}

fn default_sig_performance() -> Vec<String> {
    strings(DEFAULT_SIG_PERFORMANCE)
}

fn default_test_time() -> u64 {
    1
}

/// Raw output configuration.
#[derive(Debug, Deserialize)]
struct RawOutputConfig {
    #[serde(default = "default_output_dir")]
    dir: String,
    #[serde(default = "default_tls_file")]
    tls_file: String,
    #[serde(default = "default_kem_file")]
    kem_file: String,
    #[serde(default = "default_sig_file")]
    sig_file: String,
}

fn default_output_dir() -> String {
    "./results".to_string()
}

fn default_tls_file() -> String {
    "results_tls.csv".to_string()
}

fn default_kem_file() -> String {
    "results_kem_alg.csv".to_string()
}

fn default_sig_file() -> String {
    "results_sig_alg.csv".to_string()
}

impl Default for RawOutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            tls_file: default_tls_file(),
            kem_file: default_kem_file(),
            sig_file: default_sig_file(),
        }
    }
}

/// Raw external tool commands.
#[derive(Debug, Deserialize)]
struct RawToolCommands {
    #[serde(default = "default_certificate_tool")]
    certificate: String,
    #[serde(default = "default_server_tool")]
    server: String,
    #[serde(default = "default_tls_client_tool")]
    tls_client: String,
    #[serde(default = "default_algorithm_tool")]
    algorithm_benchmark: String,
}

fn default_certificate_tool() -> String {
    "bash ./src/create_certificate.sh".to_string()
}

fn default_server_tool() -> String {
    "bash ./src/start_server.sh".to_string()
}

fn default_tls_client_tool() -> String {
    "bash ./src/test.sh".to_string()
}

fn default_algorithm_tool() -> String {
    "bash ./src/get_alg_performance.sh".to_string()
}

impl Default for RawToolCommands {
    fn default() -> Self {
        Self {
            certificate: default_certificate_tool(),
            server: default_server_tool(),
            tls_client: default_tls_client_tool(),
            algorithm_benchmark: default_algorithm_tool(),
        }
    }
}

/// Raw readiness strategy, tagged by `mode`.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum RawReadiness {
    Grace {
        #[serde(default = "default_grace_ms")]
        grace_ms: u64,
    },
    Probe {
        #[serde(default = "default_probe_address")]
        address: String,
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
    },
}

fn default_grace_ms() -> u64 {
    1000
}

fn default_probe_address() -> String {
    // openssl s_server default accept port
    "127.0.0.1:4433".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for RawReadiness {
    fn default() -> Self {
        RawReadiness::Probe {
            address: default_probe_address(),
            timeout_ms: default_probe_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// What the controller does with a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Log and carry on with the current combination.
    Continue,
    /// Log and drop the current row; the sweep moves to the next combination.
    SkipRow,
    /// Stop the whole sweep.
    Abort,
}

/// Per-kind escalation policy applied by the sweep controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePolicy {
    #[serde(default = "default_certificate_disposition")]
    pub certificate: Disposition,
    #[serde(default = "default_readiness_disposition")]
    pub readiness: Disposition,
    #[serde(default = "default_parse_disposition")]
    pub parse: Disposition,
}

fn default_certificate_disposition() -> Disposition {
    Disposition::Continue
}

fn default_readiness_disposition() -> Disposition {
    Disposition::Abort
}

fn default_parse_disposition() -> Disposition {
    Disposition::Abort
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            certificate: default_certificate_disposition(),
            readiness: default_readiness_disposition(),
            parse: default_parse_disposition(),
        }
    }
}

impl FailurePolicy {
    /// Decide what to do with `err`. Errors outside the three policy
    /// kinds always abort.
    pub fn decide(&self, err: &BenchError) -> Disposition {
        match err.kind() {
            FailureKind::Provisioning => self.certificate,
            FailureKind::Readiness => self.readiness,
            FailureKind::Parse => self.parse,
            FailureKind::Fatal => Disposition::Abort,
        }
    }
}

/// Which sweep stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stages {
    #[serde(default = "enabled")]
    pub tls: bool,
    #[serde(default = "enabled")]
    pub kem: bool,
    /// ML-DSA in `openssl speed` is broken upstream
    /// (openssl/openssl#27373), so this stage is off unless asked for.
    #[serde(default)]
    pub sig: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            tls: true,
            kem: true,
            sig: false,
        }
    }
}

/// Raw server configuration.
#[derive(Debug, Default, Deserialize)]
struct RawServerConfig {
    #[serde(default)]
    readiness: RawReadiness,
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_levels")]
    levels: Vec<RawLevel>,
    #[serde(default = "default_kem_performance")]
    kem_performance: Vec<String>,
    #[serde(default = "default_sig_performance")]
    sig_performance: Vec<String>,
    #[serde(default = "default_test_time")]
    test_time_secs: u64,
    #[serde(default)]
    output: RawOutputConfig,
    #[serde(default)]
    tools: RawToolCommands,
    #[serde(default)]
    server: RawServerConfig,
    #[serde(default)]
    on_failure: FailurePolicy,
    #[serde(default)]
    stages: Stages,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            kem_performance: default_kem_performance(),
            sig_performance: default_sig_performance(),
            test_time_secs: default_test_time(),
            output: RawOutputConfig::default(),
            tools: RawToolCommands::default(),
            server: RawServerConfig::default(),
            on_failure: FailurePolicy::default(),
            stages: Stages::default(),
        }
    }
}

/// Validated algorithm table for one NIST level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelTable {
    pub level: NistLevel,
    pub kem: Vec<AlgorithmName>,
    pub sig: Vec<AlgorithmName>,
}

/// Result file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub tls_file: String,
    pub kem_file: String,
    pub sig_file: String,
}

impl OutputConfig {
    pub fn tls_path(&self) -> PathBuf {
        self.dir.join(&self.tls_file)
    }

    pub fn kem_path(&self) -> PathBuf {
        self.dir.join(&self.kem_file)
    }

    pub fn sig_path(&self) -> PathBuf {
        self.dir.join(&self.sig_file)
    }
}

/// Commands for the four external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub certificate: String,
    pub server: String,
    pub tls_client: String,
    pub algorithm_benchmark: String,
}

/// How the controller decides a freshly spawned server can be measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep for a fixed period and assume the server is up.
    Grace(Duration),
    /// Poll a TCP connect against `address` until it succeeds or `timeout`
    /// elapses.
    Probe {
        address: SocketAddr,
        timeout: Duration,
        interval: Duration,
    },
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub levels: Vec<LevelTable>,
    pub kem_performance: Vec<AlgorithmName>,
    pub sig_performance: Vec<AlgorithmName>,
    pub test_time_secs: u64,
    pub output: OutputConfig,
    pub tools: ToolCommands,
    pub readiness: Readiness,
    pub on_failure: FailurePolicy,
    pub stages: Stages,
    /// Select the alternate cryptography provider in every tool.
    pub use_alt_provider: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let levels = DEFAULT_LEVELS
            .iter()
            .map(|(level, kem, sig)| LevelTable {
                level: NistLevel::builtin(*level),
                kem: kem.iter().map(|n| AlgorithmName::builtin(n)).collect(),
                sig: sig.iter().map(|n| AlgorithmName::builtin(n)).collect(),
            })
            .collect();

        Self {
            levels,
            kem_performance: DEFAULT_KEM_PERFORMANCE
                .iter()
                .map(|n| AlgorithmName::builtin(n))
                .collect(),
            sig_performance: DEFAULT_SIG_PERFORMANCE
                .iter()
                .map(|n| AlgorithmName::builtin(n))
                .collect(),
            test_time_secs: default_test_time(),
            output: OutputConfig {
                dir: PathBuf::from(default_output_dir()),
                tls_file: default_tls_file(),
                kem_file: default_kem_file(),
                sig_file: default_sig_file(),
            },
            tools: ToolCommands {
                certificate: default_certificate_tool(),
                server: default_server_tool(),
                tls_client: default_tls_client_tool(),
                algorithm_benchmark: default_algorithm_tool(),
            },
            readiness: Readiness::Probe {
                address: SocketAddr::from(([127, 0, 0, 1], 4433)),
                timeout: Duration::from_millis(default_probe_timeout_ms()),
                interval: Duration::from_millis(default_poll_interval_ms()),
            },
            on_failure: FailurePolicy::default(),
            stages: Stages::default(),
            use_alt_provider: false,
        }
    }
}

impl BenchConfig {
    /// Every (level, KEM, SIG) tuple in sweep order: levels ascending, then
    /// KEMs and SIGs in declared order.
    pub fn combinations(&self) -> Vec<AlgorithmCombination> {
        self.levels
            .iter()
            .flat_map(|table| {
                table.kem.iter().flat_map(move |kem| {
                    table.sig.iter().map(move |sig| AlgorithmCombination {
                        nist_level: table.level,
                        kem: kem.clone(),
                        sig: sig.clone(),
                    })
                })
            })
            .collect()
    }

    /// Replace the output directory, keeping file names.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.dir = dir.into();
        self
    }

    /// Select the alternate cryptography provider.
    pub fn with_alt_provider(mut self, use_alt_provider: bool) -> Self {
        self.use_alt_provider = use_alt_provider;
        self
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<BenchConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<BenchConfig> {
        // serde_yaml treats an empty document as unit, not as an empty map
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?
        };

        Ok(Self::validate(raw)?)
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> Result<BenchConfig, HardValidationError> {
        let levels = Self::validate_levels(raw.levels)?;

        let kem_performance = Self::validate_names(raw.kem_performance)?;
        let sig_performance = Self::validate_names(raw.sig_performance)?;

        if raw.stages.kem && kem_performance.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "kem_performance",
                context: "enabled KEM micro-benchmark stage".to_string(),
            });
        }

        if raw.stages.sig && sig_performance.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "sig_performance",
                context: "enabled SIG micro-benchmark stage".to_string(),
            });
        }

        if raw.stages.tls && levels.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "levels",
                context: "enabled TLS stage".to_string(),
            });
        }

        if raw.test_time_secs == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "test_time_secs",
                value: "0".to_string(),
                reason: "Test time must be at least 1 second".to_string(),
            });
        }

        let output = Self::validate_output(raw.output)?;
        let tools = Self::validate_tools(raw.tools)?;
        let readiness = Self::validate_readiness(raw.server.readiness)?;

        if raw.on_failure.readiness == Disposition::Continue {
            return Err(HardValidationError::InvalidFieldValue {
                field: "on_failure.readiness",
                value: "continue".to_string(),
                reason: "There is no server to measure against; use skip_row or abort"
                    .to_string(),
            });
        }

        if raw.on_failure.parse == Disposition::Continue {
            return Err(HardValidationError::InvalidFieldValue {
                field: "on_failure.parse",
                value: "continue".to_string(),
                reason: "A failed parse yields no value to record; use skip_row or abort"
                    .to_string(),
            });
        }

        Ok(BenchConfig {
            levels,
            kem_performance,
            sig_performance,
            test_time_secs: raw.test_time_secs,
            output,
            tools,
            readiness,
            on_failure: raw.on_failure,
            stages: raw.stages,
            use_alt_provider: false,
        })
    }

    /// Validate the level table and sort it ascending.
    fn validate_levels(raw: Vec<RawLevel>) -> Result<Vec<LevelTable>, HardValidationError> {
        let mut seen = HashSet::new();
        let mut levels = Vec::with_capacity(raw.len());

        for raw_level in raw {
            let level = NistLevel::new(raw_level.level)?;

            if !seen.insert(level) {
                return Err(HardValidationError::DuplicateNistLevel {
                    level: level.value(),
                });
            }

            if raw_level.kem.is_empty() {
                return Err(HardValidationError::MissingRequiredField {
                    field: "kem",
                    context: format!("NIST level {}", level),
                });
            }

            if raw_level.sig.is_empty() {
                return Err(HardValidationError::MissingRequiredField {
                    field: "sig",
                    context: format!("NIST level {}", level),
                });
            }

            levels.push(LevelTable {
                level,
                kem: Self::validate_names(raw_level.kem)?,
                sig: Self::validate_names(raw_level.sig)?,
            });
        }

        levels.sort_by_key(|table| table.level);
        Ok(levels)
    }

    fn validate_names(raw: Vec<String>) -> Result<Vec<AlgorithmName>, HardValidationError> {
        raw.into_iter().map(AlgorithmName::new).collect()
    }

    fn validate_output(raw: RawOutputConfig) -> Result<OutputConfig, HardValidationError> {
        if raw.dir.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "output.dir",
                value: raw.dir,
                reason: "Output directory cannot be empty".to_string(),
            });
        }

        let files = [
            ("output.tls_file", &raw.tls_file),
            ("output.kem_file", &raw.kem_file),
            ("output.sig_file", &raw.sig_file),
        ];

        let mut seen = HashSet::new();
        for (field, name) in files {
            if name.is_empty() || name.contains('/') {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: name.clone(),
                    reason: "Must be a plain, non-empty file name".to_string(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: name.clone(),
                    reason: "Result files must have distinct names".to_string(),
                });
            }
        }

        Ok(OutputConfig {
            dir: PathBuf::from(raw.dir),
            tls_file: raw.tls_file,
            kem_file: raw.kem_file,
            sig_file: raw.sig_file,
        })
    }

    fn validate_tools(raw: RawToolCommands) -> Result<ToolCommands, HardValidationError> {
        let commands = [
            ("tools.certificate", &raw.certificate),
            ("tools.server", &raw.server),
            ("tools.tls_client", &raw.tls_client),
            ("tools.algorithm_benchmark", &raw.algorithm_benchmark),
        ];

        for (field, command) in commands {
            if command.trim().is_empty() {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: command.clone(),
                    reason: "Tool command cannot be empty".to_string(),
                });
            }
        }

        Ok(ToolCommands {
            certificate: raw.certificate,
            server: raw.server,
            tls_client: raw.tls_client,
            algorithm_benchmark: raw.algorithm_benchmark,
        })
    }

    fn validate_readiness(raw: RawReadiness) -> Result<Readiness, HardValidationError> {
        match raw {
            RawReadiness::Grace { grace_ms } => Ok(Readiness::Grace(Duration::from_millis(grace_ms))),
            RawReadiness::Probe {
                address,
                timeout_ms,
                poll_interval_ms,
            } => {
                let parsed: SocketAddr =
                    address
                        .parse()
                        .map_err(|e| HardValidationError::InvalidFieldValue {
                            field: "server.readiness.address",
                            value: address.clone(),
                            reason: format!("Not a socket address: {}", e),
                        })?;

                if timeout_ms == 0 {
                    return Err(HardValidationError::InvalidFieldValue {
                        field: "server.readiness.timeout_ms",
                        value: "0".to_string(),
                        reason: "Probe timeout must be greater than 0".to_string(),
                    });
                }

                if poll_interval_ms == 0 || poll_interval_ms > timeout_ms {
                    return Err(HardValidationError::InvalidFieldValue {
                        field: "server.readiness.poll_interval_ms",
                        value: poll_interval_ms.to_string(),
                        reason: format!("Must be between 1 and timeout_ms ({})", timeout_ms),
                    });
                }

                Ok(Readiness::Probe {
                    address: parsed,
                    timeout: Duration::from_millis(timeout_ms),
                    interval: Duration::from_millis(poll_interval_ms),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
levels:
  - level: 5
    kem: [mlkem1024]
    sig: [mldsa87]
  - level: 1
    kem: [mlkem512, X25519]
    sig: [mldsa44, "rsa:3072"]

kem_performance: [ML-KEM-512]
test_time_secs: 2

output:
  dir: /tmp/pqbench-results

tools:
  server: ./fake_server.sh

server:
  readiness:
    mode: grace
    grace_ms: 250

on_failure:
  readiness: abort

stages:
  sig: true
"#;

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.levels.len(), 2);
        assert_eq!(config.test_time_secs, 2);
        assert_eq!(config.tools.server, "./fake_server.sh");
        assert_eq!(config.tools.certificate, "bash ./src/create_certificate.sh");
        assert_eq!(config.readiness, Readiness::Grace(Duration::from_millis(250)));
        assert_eq!(config.on_failure.readiness, Disposition::Abort);
        assert_eq!(config.on_failure.certificate, Disposition::Continue);
        assert!(config.stages.sig);
        assert_eq!(
            config.output.tls_path(),
            PathBuf::from("/tmp/pqbench-results/results_tls.csv")
        );
    }

    #[test]
    fn test_levels_sorted_ascending() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        let levels: Vec<u8> = config.levels.iter().map(|t| t.level.value()).collect();
        assert_eq!(levels, vec![1, 5]);
    }

    #[test]
    fn test_empty_document_is_builtin_matrix() {
        let loaded = ConfigLoader::load_string("").unwrap();
        let builtin = BenchConfig::default();
        assert_eq!(loaded.levels, builtin.levels);
        assert_eq!(loaded.kem_performance, builtin.kem_performance);
        assert_eq!(loaded.sig_performance, builtin.sig_performance);
        assert_eq!(loaded.output, builtin.output);
        assert_eq!(loaded.tools, builtin.tools);
        assert_eq!(loaded.readiness, builtin.readiness);
        assert_eq!(loaded.stages, builtin.stages);
    }

    #[test]
    fn test_builtin_combination_count() {
        // 3x3 + 3x3 + 2x2
        let combos = BenchConfig::default().combinations();
        assert_eq!(combos.len(), 22);
        assert_eq!(combos[0].kem.as_str(), "mlkem512");
        assert_eq!(combos[0].sig.as_str(), "mldsa44");
        assert_eq!(combos[1].sig.as_str(), "rsa:3072");
        assert_eq!(combos.last().unwrap().kem.as_str(), "P-521");
        assert_eq!(combos.last().unwrap().sig.as_str(), "rsa:15360");
    }

    #[test]
    fn test_builtin_names_pass_validation() {
        let config = BenchConfig::default();
        for table in &config.levels {
            for name in table.kem.iter().chain(&table.sig) {
                assert!(AlgorithmName::new(name.as_str()).is_ok());
            }
        }
        for name in config.kem_performance.iter().chain(&config.sig_performance) {
            assert!(AlgorithmName::new(name.as_str()).is_ok());
        }
    }

    #[test]
    fn test_invalid_level() {
        let yaml = r#"
levels:
  - level: 2
    kem: [X25519]
    sig: [ed25519]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_duplicate_level() {
        let yaml = r#"
levels:
  - level: 1
    kem: [X25519]
    sig: [ed25519]
  - level: 1
    kem: [P-256]
    sig: [ed25519]
"#;
        let err = ConfigLoader::load_string(yaml).unwrap_err();
        assert!(matches!(
            err,
            BenchError::HardValidation(HardValidationError::DuplicateNistLevel { level: 1 })
        ));
    }

    #[test]
    fn test_level_without_sig() {
        let yaml = r#"
levels:
  - level: 3
    kem: [X448]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_shell_metacharacters_rejected() {
        let yaml = r#"
kem_performance: ["ML-KEM-512; rm -rf /"]
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_test_time() {
        assert!(ConfigLoader::load_string("test_time_secs: 0").is_err());
    }

    #[test]
    fn test_bad_probe_address() {
        let yaml = r#"
server:
  readiness:
    mode: probe
    address: localhost
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_probe_interval_exceeds_timeout() {
        let yaml = r#"
server:
  readiness:
    mode: probe
    timeout_ms: 100
    poll_interval_ms: 200
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_parse_continue_rejected() {
        let yaml = r#"
on_failure:
  parse: continue
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_duplicate_result_files() {
        let yaml = r#"
output:
  tls_file: out.csv
  kem_file: out.csv
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_sig_stage_requires_list() {
        let yaml = r#"
sig_performance: []
stages:
  sig: true
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
        // disabled stage tolerates an empty list
        assert!(ConfigLoader::load_string("sig_performance: []").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_file("/nonexistent/pqbench.yaml").unwrap_err();
        assert!(matches!(err, BenchError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_failure_policy_decisions() {
        let policy = FailurePolicy::default();
        let not_ready = BenchError::ServerExited {
            kem_alg: "P-256".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(policy.decide(&not_ready), Disposition::Abort);
        assert_eq!(policy.decide(&BenchError::Interrupted), Disposition::Abort);
    }

    #[test]
    fn test_shipped_sample_matches_builtin() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../pqbench.yaml");
        let loaded = ConfigLoader::load_file(path).unwrap();
        let builtin = BenchConfig::default();
        assert_eq!(loaded.levels, builtin.levels);
        assert_eq!(loaded.tools, builtin.tools);
        assert_eq!(loaded.readiness, builtin.readiness);
        assert_eq!(loaded.on_failure, builtin.on_failure);
        assert_eq!(loaded.stages, builtin.stages);
    }

    #[test]
    fn test_readiness_continue_rejected() {
        let err = ConfigLoader::load_string("on_failure:\n  readiness: continue\n").unwrap_err();
        assert!(matches!(
            err,
            BenchError::HardValidation(HardValidationError::InvalidFieldValue {
                field: "on_failure.readiness",
                ..
            })
        ));
        assert!(ConfigLoader::load_string("on_failure:\n  readiness: skip_row\n").is_ok());
    }
}
