//! TLS server process management.
//!
//! The server runs as its own process-group leader so the wrapper shell,
//! the start script and the server binary can be signalled together.
//! A [`ServerHandle`] owns the process and the scratch directory with its
//! certificate; dropping the handle terminates the group, drains captured
//! output and reaps the child, in that order, exactly once.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::Instant;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgid, Pid};
use tempfile::TempDir;

use crate::command::ShellCommand;
use crate::config::{BenchConfig, Disposition, FailurePolicy, Readiness};
use crate::error::{BenchError, BenchResult};
use crate::process::certificate::{CertificateProvisioner, ProvisionedCertificate};
use crate::process::readiness::wait_ready;
use crate::types::AlgorithmName;

/// Output collected from a server's pipes at teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The operations teardown needs from a running server.
pub trait ManagedProcess {
    /// Process ID of the group leader.
    fn id(&self) -> u32;

    /// Exit status if the process has already terminated.
    fn exit_status(&mut self) -> Option<String>;

    /// Send SIGTERM to the whole process group. Best effort; a group that
    /// no longer exists is not an error.
    fn signal_group(&mut self);

    /// Read whatever the server wrote to captured pipes.
    fn drain_output(&mut self) -> CapturedOutput;

    /// Block until the process is reaped; returns its exit status.
    fn reap(&mut self) -> Option<String>;
}

/// A spawned server child.
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

impl ManagedProcess for ServerProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn exit_status(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => Some(format!("unknown ({})", e)),
        }
    }

    fn signal_group(&mut self) {
        let pid = Pid::from_raw(self.child.id() as i32);

        let pgid = match getpgid(Some(pid)) {
            Ok(pgid) => pgid,
            Err(Errno::ESRCH) => {
                tracing::debug!(pid = %pid, "Server process group already gone");
                return;
            }
            Err(e) => {
                tracing::warn!(pid = %pid, error = %e, "Could not resolve server process group");
                return;
            }
        };

        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) => tracing::debug!(pgid = %pgid, "Sent SIGTERM to server process group"),
            Err(Errno::ESRCH) => tracing::debug!(pgid = %pgid, "Server process group already gone"),
            Err(e) => tracing::warn!(pgid = %pgid, error = %e, "Failed to signal server process group"),
        }
    }

    fn drain_output(&mut self) -> CapturedOutput {
        let mut captured = CapturedOutput::default();
        let pid = self.child.id();
        if let Some(stdout) = self.child.stdout.take() {
            captured.stdout = read_pipe(stdout, pid, "stdout");
        }
        if let Some(stderr) = self.child.stderr.take() {
            captured.stderr = read_pipe(stderr, pid, "stderr");
        }
        captured
    }

    fn reap(&mut self) -> Option<String> {
        match self.child.wait() {
            Ok(status) => Some(status.to_string()),
            Err(e) => {
                tracing::warn!(pid = self.child.id(), error = %e, "Failed to reap server process");
                None
            }
        }
    }
}

/// Exclusively owned, running TLS server.
///
/// Teardown runs from [`shutdown`](Self::shutdown) or `Drop`, whichever
/// comes first. The scratch directory is removed only after the server is
/// reaped.
pub struct ServerHandle<P: ManagedProcess = ServerProcess> {
    process: P,
    kem_alg: String,
    started: Instant,
    released: bool,
    // Declared last: dropped after `Drop::drop` has reaped the server.
    _scratch: Option<TempDir>,
}

impl<P: ManagedProcess> ServerHandle<P> {
    pub fn new(process: P, kem_alg: impl Into<String>, scratch: Option<TempDir>) -> Self {
        Self {
            process,
            kem_alg: kem_alg.into(),
            started: Instant::now(),
            released: false,
            _scratch: scratch,
        }
    }

    /// Process ID of the server's group leader.
    pub fn pid(&self) -> u32 {
        self.process.id()
    }

    /// The server leads its own group, so this equals [`pid`](Self::pid).
    pub fn process_group_id(&self) -> u32 {
        self.process.id()
    }

    pub fn kem_alg(&self) -> &str {
        &self.kem_alg
    }

    /// Exit status if the server has already terminated.
    pub fn exit_status(&mut self) -> Option<String> {
        self.process.exit_status()
    }

    /// Run `body` while the server is live, then tear it down.
    ///
    /// Teardown also happens if `body` panics, through `Drop`.
    pub fn scope<T>(mut self, body: impl FnOnce(&mut Self) -> T) -> T {
        let out = body(&mut self);
        self.shutdown();
        out
    }

    /// Terminate and reap the server now.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.process.signal_group();

        let output = self.process.drain_output();
        if !output.stdout.is_empty() {
            tracing::debug!(kem_alg = %self.kem_alg, "Server stdout:\n{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            tracing::warn!(kem_alg = %self.kem_alg, "Server stderr:\n{}", output.stderr);
        }

        let status = self.process.reap();
        tracing::info!(
            kem_alg = %self.kem_alg,
            pid = self.process.id(),
            status = status.as_deref().unwrap_or("unknown"),
            lifetime_ms = self.started.elapsed().as_millis(),
            "Server process terminated"
        );
    }
}

impl<P: ManagedProcess> Drop for ServerHandle<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Starts one TLS server per (KEM, SIG) pair.
#[derive(Debug, Clone)]
pub struct ServerLauncher {
    server_command: String,
    provisioner: CertificateProvisioner,
    readiness: Readiness,
    policy: FailurePolicy,
    use_alt_provider: bool,
}

impl ServerLauncher {
    pub fn new(
        server_command: impl Into<String>,
        provisioner: CertificateProvisioner,
        readiness: Readiness,
        policy: FailurePolicy,
        use_alt_provider: bool,
    ) -> Self {
        Self {
            server_command: server_command.into(),
            provisioner,
            readiness,
            policy,
            use_alt_provider,
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(
            &config.tools.server,
            CertificateProvisioner::new(&config.tools.certificate, config.use_alt_provider),
            config.readiness.clone(),
            config.on_failure,
            config.use_alt_provider,
        )
    }

    /// Build the server start invocation for `kem_alg` and `certificate`.
    pub fn command_for(
        &self,
        kem_alg: &AlgorithmName,
        certificate: &ProvisionedCertificate,
    ) -> ShellCommand {
        ShellCommand::new(&self.server_command)
            .env("KEM_ALG", kem_alg)
            .env("CERT_PATH", absolute(&certificate.certificate_path).display())
            .env("KEY_PATH", absolute(&certificate.private_key_path).display())
            .flag("USE_ALT_PROVIDER", self.use_alt_provider)
    }

    /// Provision a certificate for `sig_alg`, start a server for `kem_alg`
    /// and wait until it is ready.
    ///
    /// # Errors
    /// A certificate failure is returned unless the policy says to carry
    /// on. Spawn and readiness failures are returned after the server
    /// process group has been torn down.
    pub fn start(&self, kem_alg: &AlgorithmName, sig_alg: &AlgorithmName) -> BenchResult<ServerHandle> {
        let scratch = tempfile::Builder::new()
            .prefix("pqbench-")
            .tempdir()
            .map_err(|e| BenchError::Io {
                context: "creating certificate scratch directory",
                source: e,
            })?;

        let certificate = match self.provisioner.provision(sig_alg, scratch.path()) {
            Ok(certificate) => certificate,
            Err(BenchError::CertificateTool { certificate, .. })
                if self.policy.certificate == Disposition::Continue =>
            {
                tracing::warn!(
                    sig_alg = %sig_alg,
                    "Continuing with possibly unusable certificate"
                );
                certificate
            }
            Err(e) => return Err(e),
        };

        let command = self.command_for(kem_alg, &certificate);
        let capture = tracing::enabled!(tracing::Level::DEBUG);

        tracing::debug!(kem_alg = %kem_alg, sig_alg = %sig_alg, "Starting server");
        tracing::debug!(command = %command, "Server command");

        let child = command
            .to_process()
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(if capture { Stdio::piped() } else { Stdio::null() })
            .stderr(if capture { Stdio::piped() } else { Stdio::null() })
            .spawn()
            .map_err(|e| BenchError::ToolSpawn {
                command: command.render(),
                source: e,
            })?;

        tracing::debug!(kem_alg = %kem_alg, pid = child.id(), "Spawned server process");

        let mut handle = ServerHandle::new(ServerProcess::new(child), kem_alg.as_str(), Some(scratch));
        wait_ready(&mut handle, &self.readiness)?;

        Ok(handle)
    }

    /// Run `body` against a live server for (`kem_alg`, `sig_alg`).
    ///
    /// The server is terminated and reaped before this returns, whatever
    /// `body` returns.
    pub fn with_server<T>(
        &self,
        kem_alg: &AlgorithmName,
        sig_alg: &AlgorithmName,
        body: impl FnOnce(&mut ServerHandle) -> BenchResult<T>,
    ) -> BenchResult<T> {
        self.start(kem_alg, sig_alg)?.scope(body)
    }
}

/// Read a pipe to EOF. A read error keeps whatever arrived before it.
fn read_pipe(mut pipe: impl Read, pid: u32, stream: &'static str) -> String {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        tracing::debug!(pid = pid, stream = stream, error = %e, "Failed to drain server output");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
