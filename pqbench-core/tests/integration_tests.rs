// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end integration tests for pqbench.
//!
//! The external tools are replaced by small shell scripts in a temp
//! directory, so a full sweep runs from configuration to CSV rows without
//! OpenSSL installed.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pqbench_core::{BenchConfig, BenchError, ConfigLoader, ParseError, Readiness, SweepController};
use tempfile::TempDir;

const TLS_CLIENT_OUTPUT: &str =
    "1022 connections in 0.71s; 1234.56 connections/user sec, bytes read 0";

/// Fake tool scripts plus a listener standing in for the server socket.
struct Fixture {
    dir: TempDir,
    listener: TcpListener,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            listener: TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener"),
        };

        fixture.script(
            "cert.sh",
            "touch \"$CERT_PATH\" \"$CERT_PRIV_KEY_PATH\"\necho \"$SIG_ALG\" >> \"$(dirname \"$0\")/cert.log\"\n",
        );
        // refuses to start without the certificate handed over by the controller
        fixture.script("server.sh", "test -f \"$CERT_PATH\" || exit 2\nexec sleep 30\n");
        fixture.script("client.sh", &format!("echo \"{}\"\n", TLS_CLIENT_OUTPUT));
        fixture.script("bench.sh", "echo \"Doing $ALG for ${TEST_TIME}s\"\necho \"  100.0 200.5 300.25\"\n");
        fixture
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).expect("Failed to write script");
        path
    }

    fn tool(&self, name: &str) -> String {
        format!("sh '{}'", self.dir.path().join(name).display())
    }

    fn output_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// One level, one KEM, one SIG; probe readiness against the listener.
    fn config(&self, extra: &str) -> BenchConfig {
        let yaml = format!(
            r#"
levels:
  - level: 1
    kem: [mlkem512]
    sig: [mldsa44]
kem_performance: [ML-KEM-512]
sig_performance: [ML-DSA-44]
output:
  dir: '{out}'
tools:
  certificate: "{cert}"
  server: "{server}"
  tls_client: "{client}"
  algorithm_benchmark: "{bench}"
server:
  readiness:
    mode: probe
    address: "{address}"
    timeout_ms: 2000
    poll_interval_ms: 10
{extra}
"#,
            out = self.output_dir("results").display(),
            cert = self.tool("cert.sh"),
            server = self.tool("server.sh"),
            client = self.tool("client.sh"),
            bench = self.tool("bench.sh"),
            address = self.listener.local_addr().unwrap(),
            extra = extra,
        );
        ConfigLoader::load_string(&yaml).expect("Failed to load test config")
    }

    fn cert_log(&self) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join("cert.log")).ok()
    }
}

/// Probe readiness against an address nothing listens on.
fn unused_probe(timeout: Duration) -> Readiness {
    let address = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    Readiness::Probe {
        address,
        timeout,
        interval: Duration::from_millis(20),
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read result file")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_single_combination_end_to_end() {
    let fixture = Fixture::new();
    let config = fixture.config("");
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 1);
    assert_eq!(report.kem_rows, 1);
    assert_eq!(report.sig_rows, 0);
    assert!(report.skipped.is_empty());

    assert_eq!(
        read_lines(&output.tls_path()),
        vec![
            "nist_level,test_time,KEM,SIG,connections/s",
            "1,1,mlkem512,mldsa44,1234.56"
        ]
    );
    assert_eq!(
        read_lines(&output.kem_path()),
        vec![
            "test_time,kem-algorithm,keygens/s,encaps/s,decaps/s",
            "1,ML-KEM-512,100.0,200.5,300.25"
        ]
    );
    // stage disabled: header only
    assert_eq!(
        read_lines(&output.sig_path()),
        vec!["test_time,sig-algorithm,keygens/s,signs/s,verify/s"]
    );
    assert_eq!(fixture.cert_log().as_deref(), Some("mldsa44\n"));
}

#[test]
fn test_full_level_matrix_in_order() {
    let fixture = Fixture::new();
    let mut config = fixture.config("").with_output_dir(fixture.output_dir("matrix"));
    config.levels = BenchConfig::default().levels;
    config.levels.truncate(1);
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 9);

    let rows: Vec<String> = read_lines(&output.tls_path()).into_iter().skip(1).collect();
    assert_eq!(rows[0], "1,1,mlkem512,mldsa44,1234.56");
    assert_eq!(rows[1], "1,1,mlkem512,rsa:3072,1234.56");
    assert_eq!(rows[3], "1,1,X25519,mldsa44,1234.56");
    assert_eq!(rows[8], "1,1,P-256,ed25519,1234.56");
}

#[test]
fn test_preflight_refuses_existing_results() {
    let fixture = Fixture::new();
    let config = fixture.config("");
    let output = config.output.clone();

    std::fs::create_dir_all(&output.dir).unwrap();
    std::fs::write(output.kem_path(), "old data\n").unwrap();

    let err = SweepController::new(config).run().unwrap_err();
    assert!(matches!(err, BenchError::ResultFileExists { .. }));
    assert_eq!(err.exit_code(), 1);

    // no tool ran and nothing else was written
    assert!(fixture.cert_log().is_none());
    assert!(!output.tls_path().exists());
    assert_eq!(std::fs::read_to_string(output.kem_path()).unwrap(), "old data\n");
}

#[test]
fn test_repeated_runs_into_disjoint_directories() {
    let fixture = Fixture::new();
    let first = fixture.config("").with_output_dir(fixture.output_dir("oqs_1"));
    let second = fixture.config("").with_output_dir(fixture.output_dir("oqs_2"));
    let (first_out, second_out) = (first.output.clone(), second.output.clone());

    SweepController::new(first).run().expect("First sweep failed");
    SweepController::new(second).run().expect("Second sweep failed");

    let a = read_lines(&first_out.tls_path());
    let b = read_lines(&second_out.tls_path());
    assert_eq!(a[0], b[0]);
    assert_eq!(a.len(), b.len());
    assert_eq!(
        read_lines(&first_out.kem_path()).len(),
        read_lines(&second_out.kem_path()).len()
    );

    let summary =
        pqbench_core::SummaryReport::from_run_dirs(&[first_out.dir.clone(), second_out.dir.clone()])
            .expect("Summary failed");
    assert_eq!(summary.tls.len(), 1);
    assert_eq!(summary.tls[0].provider, "oqs");
    assert_eq!(summary.tls[0].connections_per_sec.count, 2);
    assert_eq!(summary.tls[0].connections_per_sec.std_dev, 0.0);
}

#[test]
fn test_short_benchmark_output_aborts_without_row() {
    let fixture = Fixture::new();
    fixture.script("bench.sh", "echo \"ML-KEM-512 0.1s 200.5 300.25\"\n");
    let config = fixture.config("");
    let output = config.output.clone();

    let err = SweepController::new(config).run().unwrap_err();
    match err {
        BenchError::Parse(ParseError::FieldCount { found, ref output, .. }) => {
            assert_eq!(found, 2);
            assert!(output.contains("0.1s"));
        }
        other => panic!("unexpected error: {}", other),
    }

    // the TLS row was already recorded; no KEM row
    assert_eq!(read_lines(&output.tls_path()).len(), 2);
    assert_eq!(read_lines(&output.kem_path()).len(), 1);
}

#[test]
fn test_missing_throughput_aborts_by_default() {
    let fixture = Fixture::new();
    fixture.script("client.sh", "echo 'connect:errno=111'\n");
    let config = fixture.config("");
    let output = config.output.clone();

    let err = SweepController::new(config).run().unwrap_err();
    assert!(matches!(err, BenchError::Parse(ParseError::NoThroughput { .. })));
    assert_eq!(read_lines(&output.tls_path()).len(), 1);
}

#[test]
fn test_unready_server_skips_row() {
    let fixture = Fixture::new();
    // nothing listens on the probed address
    let mut config = fixture.config("on_failure:\n  readiness: skip_row\n");
    config.readiness = unused_probe(Duration::from_millis(200));
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].subject, "L1 (mlkem512 | mldsa44)");
    // an incomplete matrix is not a successful run
    assert!(!report.is_complete());
    assert_eq!(report.exit_code(), 1);

    // the sweep went on to the micro-benchmarks
    assert_eq!(report.kem_rows, 1);
    assert_eq!(read_lines(&output.tls_path()).len(), 1);
}

#[test]
fn test_server_exit_during_startup_skips_row() {
    let fixture = Fixture::new();
    fixture.script("server.sh", "echo 'bad group' >&2\nexit 1\n");
    let mut config = fixture.config("on_failure:\n  readiness: skip_row\n");
    config.readiness = unused_probe(Duration::from_secs(5));

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 0);
    assert!(report.skipped[0].reason.contains("exited before becoming ready"));
}

#[test]
fn test_unready_server_aborts_by_default() {
    let fixture = Fixture::new();
    let mut config = fixture.config("");
    config.readiness = unused_probe(Duration::from_millis(200));
    let output = config.output.clone();

    let err = SweepController::new(config).run().unwrap_err();
    assert!(matches!(err, BenchError::ServerNotReady { .. }));
    assert_eq!(err.exit_code(), 1);

    // nothing measured past the failed combination
    assert_eq!(read_lines(&output.tls_path()).len(), 1);
    assert_eq!(read_lines(&output.kem_path()).len(), 1);
}

#[test]
fn test_readiness_abort_policy() {
    let fixture = Fixture::new();
    fixture.script("server.sh", "exit 1\n");
    let mut config = fixture.config("on_failure:\n  readiness: abort\n");
    config.readiness = unused_probe(Duration::from_secs(5));

    let err = SweepController::new(config).run().unwrap_err();
    assert!(matches!(err, BenchError::ServerExited { .. }));
}

#[test]
fn test_signature_stage_enabled() {
    let fixture = Fixture::new();
    let config = fixture.config("stages:\n  sig: true\n");
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.sig_rows, 1);
    assert_eq!(
        read_lines(&output.sig_path())[1],
        "1,ML-DSA-44,100.0,200.5,300.25"
    );
}

#[test]
fn test_alt_provider_flag_reaches_tools() {
    let fixture = Fixture::new();
    fixture.script(
        "bench.sh",
        "echo \"$USE_ALT_PROVIDER\" > \"$(dirname \"$0\")/provider.log\"\necho \"1.0 2.0 3.0\"\n",
    );
    let config = fixture.config("stages:\n  tls: false\n").with_alt_provider(true);

    SweepController::new(config).run().expect("Sweep failed");
    let flag = std::fs::read_to_string(fixture.dir.path().join("provider.log")).unwrap();
    assert_eq!(flag.trim(), "1");
}

/// Writes the requested files, then fails like an unsupported algorithm.
const FAILING_CERT_TOOL: &str = "touch \"$CERT_PATH\" \"$CERT_PRIV_KEY_PATH\"\n\
echo \"$CERT_PATH\" > \"$(dirname \"$0\")/cert_path.log\"\n\
echo 'unknown signature algorithm' >&2\nexit 3\n";

#[test]
fn test_certificate_failure_continues_by_default() {
    let fixture = Fixture::new();
    fixture.script("cert.sh", FAILING_CERT_TOOL);
    fixture.script(
        "server.sh",
        "echo \"$CERT_PATH\" > \"$(dirname \"$0\")/server_cert.log\"\ntest -f \"$CERT_PATH\" || exit 2\nexec sleep 30\n",
    );
    let config = fixture.config("");
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 1);
    assert!(report.is_complete());
    assert_eq!(read_lines(&output.tls_path())[1], "1,1,mlkem512,mldsa44,1234.56");

    // the server was handed the paths the failed tool was asked to write
    let requested = std::fs::read_to_string(fixture.dir.path().join("cert_path.log")).unwrap();
    let used = std::fs::read_to_string(fixture.dir.path().join("server_cert.log")).unwrap();
    assert_eq!(requested, used);
    assert!(used.trim().ends_with("server.crt"));
}

#[test]
fn test_certificate_failure_skip_row_policy() {
    let fixture = Fixture::new();
    fixture.script("cert.sh", FAILING_CERT_TOOL);
    let config = fixture.config("on_failure:\n  certificate: skip_row\n");
    let output = config.output.clone();

    let report = SweepController::new(config).run().expect("Sweep failed");
    assert_eq!(report.tls_rows, 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("Certificate creation for mldsa44 failed"));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.kem_rows, 1);
    assert_eq!(read_lines(&output.tls_path()).len(), 1);
}

#[test]
fn test_certificate_failure_abort_policy() {
    let fixture = Fixture::new();
    fixture.script("cert.sh", FAILING_CERT_TOOL);
    let config = fixture.config("on_failure:\n  certificate: abort\n");
    let output = config.output.clone();

    let err = SweepController::new(config).run().unwrap_err();
    match err {
        BenchError::CertificateTool {
            ref sig_alg,
            ref stderr,
            ..
        } => {
            assert_eq!(sig_alg, "mldsa44");
            assert!(stderr.contains("unknown signature algorithm"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(read_lines(&output.tls_path()).len(), 1);
    assert_eq!(read_lines(&output.kem_path()).len(), 1);
}
