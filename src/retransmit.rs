//! Retransmit timeout policy: exponential backoff, never reset.
//!
//! The source this crate is descended from leaves "under what conditions
//! should `read_timeout_ms` be reset" as an open TODO; this implementation
//! mirrors it exactly by never resetting -- see DESIGN.md.

use tokio::time::Duration;

use crate::config::HandshakeConfig;

pub struct RetransmitController {
    timeout: Duration,
    max: Duration,
    factor: u32,
}

impl RetransmitController {
    pub fn new(config: &HandshakeConfig) -> Self {
        RetransmitController {
            timeout: config.initial_retransmit_timeout,
            max: config.max_retransmit_timeout,
            factor: config.retransmit_backoff_factor,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Doubles (or whatever `factor` is configured) the timeout, capped at
    /// `max`. Called on every retransmit trigger: a read timeout, or a full
    /// re-reception of the previous inbound flight.
    pub fn backoff(&mut self) {
        self.timeout = (self.timeout * self.factor).min(self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_on_each_backoff_and_caps_at_the_configured_max() {
        let config = HandshakeConfig::default();
        let mut c = RetransmitController::new(&config);
        assert_eq!(c.timeout(), Duration::from_millis(1000));

        c.backoff();
        assert_eq!(c.timeout(), Duration::from_millis(2000));

        for _ in 0..20 {
            c.backoff();
        }
        assert_eq!(c.timeout(), Duration::from_millis(60_000));
    }
}
