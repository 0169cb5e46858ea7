//! Certificate provisioning.
//!
//! Runs the external certificate tool to create a CA and a server key and
//! certificate for one signature algorithm inside a caller-owned scratch
//! directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::command::ShellCommand;
use crate::error::{BenchError, BenchResult};
use crate::types::AlgorithmName;

/// Server key and certificate written by one provisioning call.
///
/// Both files live in the scratch directory passed to
/// [`CertificateProvisioner::provision`] and disappear with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedCertificate {
    pub private_key_path: PathBuf,
    pub certificate_path: PathBuf,
}

/// Wrapper around the certificate creation tool.
#[derive(Debug, Clone)]
pub struct CertificateProvisioner {
    command: String,
    use_alt_provider: bool,
}

impl CertificateProvisioner {
    pub fn new(command: impl Into<String>, use_alt_provider: bool) -> Self {
        Self {
            command: command.into(),
            use_alt_provider,
        }
    }

    /// Build the tool invocation for `sig_alg` writing into `scratch_dir`.
    ///
    /// Paths are deterministic: `ca.key`, `ca.crt`, `server.key`,
    /// `server.csr`, `server.crt`.
    pub fn command_for(
        &self,
        sig_alg: &AlgorithmName,
        scratch_dir: &Path,
    ) -> (ShellCommand, ProvisionedCertificate) {
        let certificate = ProvisionedCertificate {
            private_key_path: scratch_dir.join("server.key"),
            certificate_path: scratch_dir.join("server.crt"),
        };

        let command = ShellCommand::new(&self.command)
            .env("CA_KEY_PATH", scratch_dir.join("ca.key").display())
            .env("CA_CERT_PATH", scratch_dir.join("ca.crt").display())
            .env("CERT_PRIV_KEY_PATH", certificate.private_key_path.display())
            .env("CERT_REQUEST_PATH", scratch_dir.join("server.csr").display())
            .env("CERT_PATH", certificate.certificate_path.display())
            .env("SIG_ALG", sig_alg)
            .flag("USE_ALT_PROVIDER", self.use_alt_provider);

        (command, certificate)
    }

    /// Create the certificate chain for `sig_alg` in `scratch_dir`.
    ///
    /// # Errors
    /// `ToolSpawn` if the shell could not be started. A non-zero exit
    /// from the tool is logged with its stderr and returned as
    /// `CertificateTool`, which still carries the paths so the caller may
    /// carry on with them.
    pub fn provision(
        &self,
        sig_alg: &AlgorithmName,
        scratch_dir: &Path,
    ) -> BenchResult<ProvisionedCertificate> {
        let (command, certificate) = self.command_for(sig_alg, scratch_dir);

        tracing::debug!(sig_alg = %sig_alg, "Creating certificate");
        tracing::debug!(command = %command, "Certificate creation command");

        let output = command
            .to_process()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BenchError::ToolSpawn {
                command: command.render(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(sig_alg = %sig_alg, "Certificate creation stdout:\n{}", stdout);
        tracing::debug!(sig_alg = %sig_alg, "Certificate creation stderr:\n{}", stderr);

        if !output.status.success() {
            tracing::error!(
                sig_alg = %sig_alg,
                status = %output.status,
                "Certificate creation failed: {}",
                stderr
            );
            return Err(BenchError::CertificateTool {
                sig_alg: sig_alg.to_string(),
                status: output.status.to_string(),
                stderr: stderr.into_owned(),
                certificate,
            });
        }

        Ok(certificate)
    }
}
