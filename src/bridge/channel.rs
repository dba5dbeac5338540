// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::{parse_event, Command, Event};

/// The transport boundary: whatever hosts the embedded surface.
///
/// Posting is fire-and-forget; implementations must not block and have no way to report
/// delivery.
pub trait Surface: Send + Sync {
    fn post(&self, message: String);
}

/// One raw inbound message as the host received it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub origin: String,
    pub data: Value,
}

impl InboundMessage {
    pub fn text(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self { origin: origin.into(), data: Value::String(data.into()) }
    }
}

pub struct MessageChannel {
    surface: RwLock<Option<Arc<dyn Surface>>>,
    trusted_origins: Vec<String>,
}

impl fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("attached", &self.is_attached())
            .field("trusted_origins", &self.trusted_origins)
            .finish()
    }
}

impl MessageChannel {
    pub fn new(trusted_origins: Vec<String>) -> Self {
        Self { surface: RwLock::new(None), trusted_origins }
    }

    pub fn attach(&self, surface: Arc<dyn Surface>) {
        *self.surface.write().unwrap_or_else(PoisonError::into_inner) = Some(surface);
    }

    pub fn detach(&self) {
        *self.surface.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_attached(&self) -> bool {
        self.surface.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Serializes and posts `command`. Without an attached surface this is a no-op.
    pub fn send(&self, command: &Command) {
        let surface = self.surface.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(surface) = surface else {
            tracing::trace!(action = command.action(), "no surface attached; dropping command");
            return;
        };

        match command.to_wire() {
            Ok(text) => {
                tracing::trace!(action = command.action(), bytes = text.len(), "post");
                surface.post(text);
            }
            Err(err) => {
                tracing::warn!(action = command.action(), %err, "cannot serialize command");
            }
        }
    }

    /// Filters `message` by origin and payload type and parses it.
    ///
    /// Untrusted origins, non-text payloads, bad JSON and unknown event kinds all yield `None`.
    pub fn accept(&self, message: &InboundMessage) -> Option<Event> {
        if !self.trusted_origins.iter().any(|origin| *origin == message.origin) {
            tracing::trace!(origin = %message.origin, "dropping message from untrusted origin");
            return None;
        }
        let Value::String(text) = &message.data else {
            return None;
        };
        parse_event(text)
    }
}
