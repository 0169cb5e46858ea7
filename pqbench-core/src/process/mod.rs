//! External process lifecycle management.
//!
//! Certificate provisioning into scratch directories and the scoped TLS
//! server whose whole process group is torn down on every exit path.

mod certificate;
mod readiness;
mod server;

pub use certificate::{CertificateProvisioner, ProvisionedCertificate};
pub use readiness::wait_ready;
pub use server::{CapturedOutput, ManagedProcess, ServerHandle, ServerLauncher, ServerProcess};
