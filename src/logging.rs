//! Optional `tracing` subscriber setup for binaries embedding the tracker.
//!
//! The library only emits events (`debug!` on record writes, `trace!` per
//! poll, `warn!` on rejected statuses). Installing a subscriber is left to
//! the application; [`init`] is a convenience for workers and demos.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back to
/// `info` when the variable is unset or invalid.
///
/// Does nothing if a global subscriber is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_twice_is_harmless() {
        super::init();
        super::init();
    }
}
