//! Offline cloud adapter.
//!
//! Stands in for the device-twin transport when no cloud link exists
//! (bring-up, bench builds, host simulation).  While offline every send
//! fails with [`TransportError::NotConnected`], which the service treats
//! like any other dropped payload.  Inbound messages can be injected from
//! a console or test harness.

use heapless::Deque;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::app::ports::{CloudPort, ContentProperties, Inbound, MessageProperty, MethodResponse};
use crate::error::TransportError;

/// Inbound messages buffered between polls.
const INBOUND_CAP: usize = 8;

pub struct OfflineCloud {
    online: bool,
    inbound: Deque<Inbound, INBOUND_CAP>,
}

impl Default for OfflineCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineCloud {
    pub fn new() -> Self {
        Self {
            online: false,
            inbound: Deque::new(),
        }
    }

    /// Pretend the link is up: sends are logged and succeed.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Queue a message for the next poll.  Returns `false` when full.
    pub fn inject(&mut self, message: Inbound) -> bool {
        self.inbound.push_back(message).is_ok()
    }

    fn ensure_online(&self) -> Result<(), TransportError> {
        if self.online {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

impl CloudPort for OfflineCloud {
    fn is_connected(&self) -> bool {
        self.online
    }

    fn publish_telemetry(
        &mut self,
        payload: &str,
        properties: &[MessageProperty],
        content: &ContentProperties,
    ) -> Result<(), TransportError> {
        self.ensure_online()?;
        debug!(
            "CLOUD | telemetry {} ({} properties, {})",
            payload,
            properties.len(),
            content.content_type
        );
        Ok(())
    }

    fn report_properties(&mut self, properties: &Map<String, Value>) -> Result<(), TransportError> {
        self.ensure_online()?;
        debug!("CLOUD | reported {}", Value::Object(properties.clone()));
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<Inbound> {
        self.inbound.pop_front()
    }

    fn respond_method(&mut self, request_id: u32, response: &MethodResponse) {
        info!(
            "CLOUD | method #{request_id} -> {} {}",
            response.status, response.payload
        );
    }
}
