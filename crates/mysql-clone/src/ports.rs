//! Local port allocation for the tunnel.
//!
//! The ssh forward specification must name a local port before the session
//! is established, so the port has to be knowable in advance rather than
//! auto-bound. Candidates are probed by attempting a real bind.

use crate::error::{CloneError, Result};
use rand::Rng;
use std::net::TcpListener;
use tracing::debug;

/// Low end of the probed ephemeral range.
const PORT_RANGE_START: u16 = 49152;

/// High end of the probed ephemeral range.
const PORT_RANGE_END: u16 = 65535;

/// Bounded number of candidates probed before giving up.
const MAX_ATTEMPTS: u32 = 50;

/// Find a local port that is not currently in a listening state.
///
/// Probes pseudo-random candidates in the high ephemeral range, checking
/// each with a bind attempt on 127.0.0.1. The listener is dropped before
/// returning, so the caller owns a small race window; the tunnel fails
/// loudly if the port is taken in between.
pub fn find_free_port() -> Result<u16> {
    let mut rng = rand::thread_rng();

    for attempt in 0..MAX_ATTEMPTS {
        let candidate = rng.gen_range(PORT_RANGE_START..=PORT_RANGE_END);
        match TcpListener::bind(("127.0.0.1", candidate)) {
            Ok(listener) => {
                drop(listener);
                debug!("Allocated local port {} (attempt {})", candidate, attempt + 1);
                return Ok(candidate);
            }
            Err(_) => continue,
        }
    }

    Err(CloneError::NoFreePort {
        attempts: MAX_ATTEMPTS,
    })
}
