//! Server readiness detection.

use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::config::Readiness;
use crate::error::{BenchError, BenchResult};
use crate::process::server::{ManagedProcess, ServerHandle};

/// Block until the server behind `handle` can be measured.
///
/// In probe mode the bind address is polled with TCP connects until one
/// succeeds or the timeout elapses. Both modes fail early if the server
/// process has already exited. Returns how long the wait took.
pub fn wait_ready<P: ManagedProcess>(
    handle: &mut ServerHandle<P>,
    readiness: &Readiness,
) -> BenchResult<Duration> {
    let start = Instant::now();

    match readiness {
        Readiness::Grace(grace) => {
            std::thread::sleep(*grace);
            check_alive(handle)?;
        }
        Readiness::Probe {
            address,
            timeout,
            interval,
        } => loop {
            check_alive(handle)?;

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(BenchError::ServerNotReady {
                    kem_alg: handle.kem_alg().to_string(),
                    address: address.to_string(),
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }

            match TcpStream::connect_timeout(address, (*interval).min(remaining)) {
                Ok(_) => break,
                Err(e) => {
                    tracing::trace!(address = %address, error = %e, "Server not accepting yet");
                    std::thread::sleep((*interval).min(timeout.saturating_sub(start.elapsed())));
                }
            }
        },
    }

    tracing::debug!(
        kem_alg = %handle.kem_alg(),
        pid = handle.pid(),
        elapsed_ms = start.elapsed().as_millis(),
        "Server ready"
    );

    Ok(start.elapsed())
}

fn check_alive<P: ManagedProcess>(handle: &mut ServerHandle<P>) -> BenchResult<()> {
    match handle.exit_status() {
        Some(status) => Err(BenchError::ServerExited {
            kem_alg: handle.kem_alg().to_string(),
            status,
        }),
        None => Ok(()),
    }
}
