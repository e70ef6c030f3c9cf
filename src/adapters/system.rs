//! System adapter: hardware watchdog plus the update-agent handshake.
//!
//! The update agent itself lives outside this firmware; it posts pending
//! updates with [`SystemAdapter::notify_update`] and reads the answer back
//! with [`SystemAdapter::take_decision`].

use log::info;

use crate::app::ports::SystemPort;
use crate::drivers::watchdog::Watchdog;
use crate::update_gate::{UpdateDecision, UpdateRequest};

pub struct SystemAdapter {
    watchdog: Watchdog,
    pending: Option<UpdateRequest>,
    decision: Option<UpdateDecision>,
}

impl SystemAdapter {
    pub fn new(watchdog: Watchdog) -> Self {
        Self {
            watchdog,
            pending: None,
            decision: None,
        }
    }

    /// Announce a pending update.  Replaces an unanswered one.
    pub fn notify_update(&mut self, request: UpdateRequest) {
        self.pending = Some(request);
    }

    /// The gate's last answer, if not yet collected.
    pub fn take_decision(&mut self) -> Option<UpdateDecision> {
        self.decision.take()
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}

impl SystemPort for SystemAdapter {
    fn kick_watchdog(&mut self) {
        self.watchdog.feed();
    }

    fn poll_update_request(&mut self) -> Option<UpdateRequest> {
        self.pending.take()
    }

    fn respond_update(&mut self, decision: UpdateDecision) {
        info!("Update agent answered: {decision:?}");
        self.decision = Some(decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update_gate::UpdateKind;

    #[test]
    fn kick_feeds_watchdog() {
        let mut sys = SystemAdapter::new(Watchdog::new(60_000).unwrap());
        sys.kick_watchdog();
        sys.kick_watchdog();
        assert_eq!(sys.watchdog().feed_count(), 2);
    }

    #[test]
    fn update_request_is_consumed_once() {
        let mut sys = SystemAdapter::new(Watchdog::new(60_000).unwrap());
        sys.notify_update(UpdateRequest {
            kind: UpdateKind::Application,
            requested_at: 1_000,
        });
        assert!(sys.poll_update_request().is_some());
        assert!(sys.poll_update_request().is_none());

        sys.respond_update(UpdateDecision::Accept);
        assert_eq!(sys.take_decision(), Some(UpdateDecision::Accept));
        assert_eq!(sys.take_decision(), None);
    }
}
