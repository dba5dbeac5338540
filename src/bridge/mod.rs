// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The bridge to one embedded surface.
//!
//! A [`Bridge`] owns the session state of a single surface: the handshake gate, the animation
//! generation token, the last settled document and the single export slot. Inbound traffic
//! enters through [`Bridge::handle_message`]; everything outbound leaves through the
//! [`MessageChannel`].
//!
//! All state lives behind short, non-awaiting critical sections. Cancellation of animation runs
//! and expiry of export requests rely on identity checks (token / request serial), never on
//! holding a lock across a suspension point.

pub mod animation;
pub mod channel;
pub mod export;
pub mod session;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::BridgeConfig;
use crate::protocol::{Command, Event, ExportFormat};

pub use animation::LoadOutcome;
pub use channel::{InboundMessage, MessageChannel, Surface};
pub use export::sanitize_file_name;
pub use session::{EditorSession, Readiness, ReadinessGate, SettledContent};

use export::ExportSlot;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("surface is not ready")]
    NotReady,
    #[error("{format} export timed out after {}ms", timeout.as_millis())]
    ExportTimeout { format: ExportFormat, timeout: Duration },
    #[error("{format} export was replaced by a newer request")]
    ExportSuperseded { format: ExportFormat },
}

type ContentListener = Arc<dyn Fn(&str) + Send + Sync>;

struct BridgeInner {
    config: BridgeConfig,
    channel: MessageChannel,
    session: Mutex<EditorSession>,
    exports: ExportSlot,
    exporting: AtomicBool,
    ready_tx: watch::Sender<bool>,
    content_listener: Mutex<Option<ContentListener>>,
}

impl BridgeInner {
    fn session(&self) -> MutexGuard<'_, EditorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the bridge of one embedded surface. Clones share the same session.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("channel", &self.inner.channel)
            .field("session", &*self.inner.session())
            .finish()
    }
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let channel = MessageChannel::new(config.trusted_origins.clone());
        let (ready_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(BridgeInner {
                config,
                channel,
                session: Mutex::new(EditorSession::default()),
                exports: ExportSlot::default(),
                exporting: AtomicBool::new(false),
                ready_tx,
                content_listener: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn channel(&self) -> &MessageChannel {
        &self.inner.channel
    }

    pub fn attach(&self, surface: Arc<dyn Surface>) {
        self.inner.channel.attach(surface);
    }

    /// Registers the consumer of user edits (`save`/`autosave` outside animation runs).
    pub fn set_content_listener(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        *self.inner.content_listener.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(listener));
    }

    pub fn session(&self) -> EditorSession {
        self.inner.session().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.session().is_ready()
    }

    pub fn is_animating(&self) -> bool {
        self.inner.session().is_animating()
    }

    pub fn last_settled_xml(&self) -> Option<String> {
        self.inner.session().last_settled().map(|settled| settled.xml().to_owned())
    }

    /// Flips to `true` once on the handshake. Receivers can `wait_for(|ready| *ready)`.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.inner.ready_tx.subscribe()
    }

    /// Single entry point for inbound traffic.
    pub fn handle_message(&self, message: &InboundMessage) {
        let Some(event) = self.inner.channel.accept(message) else {
            return;
        };

        match event {
            Event::Handshake => self.open_gate(),
            Event::ContentChanged { xml } => self.content_changed(&xml),
            Event::ExportResult { data } => {
                if !self.inner.exports.resolve(data) {
                    tracing::debug!("export result without a matching pending request");
                }
            }
        }
    }

    fn open_gate(&self) {
        if !self.inner.session().gate_mut().open() {
            return;
        }
        tracing::info!("surface handshake received");
        self.inner.channel.send(&Command::Configure { config: self.inner.config.chrome });
        self.inner.ready_tx.send_replace(true);
    }

    fn content_changed(&self, xml: &str) {
        {
            let mut session = self.inner.session();
            if session.is_animating() {
                tracing::trace!("ignoring content change while animating");
                return;
            }
            session.record_edit(xml);
        }

        // Called outside the lock so a listener may replace itself.
        let listener =
            self.inner.content_listener.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(listener) = listener {
            listener(xml);
        }
    }

    /// Loads `xml` unless the surface is not ready, `xml` is empty, or it is already the settled
    /// content. Returns `None` when nothing was loaded.
    pub async fn show(&self, xml: &str) -> Option<LoadOutcome> {
        {
            let session = self.inner.session();
            if !session.is_ready() || xml.is_empty() {
                return None;
            }
            if session.last_settled().is_some_and(|settled| settled.matches(xml)) {
                tracing::debug!("content already settled; skipping load");
                return None;
            }
        }
        Some(self.load(xml).await)
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
