// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Export request/response correlation.
//!
//! The protocol has no request ids: an `export` event answers whichever request is pending. The
//! bridge therefore keeps a single slot. Each request gets a serial; the deadline of a request
//! only clears the slot while it still holds that serial, so a stale deadline can never clobber
//! a newer request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::download::{DownloadEmitter, DownloadLink};
use crate::protocol::{Command, ExportFormat, UserFormat};

use super::{Bridge, BridgeError};

const DEFAULT_FILE_STEM: &str = "diagram";
const NATIVE_DOCUMENT_MARKER: &str = "<mxfile";

#[derive(Debug)]
struct PendingExport {
    serial: u64,
    format: ExportFormat,
    resolver: oneshot::Sender<String>,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<PendingExport>,
    issued: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ExportSlot {
    state: Mutex<SlotState>,
}

impl ExportSlot {
    /// Takes over the slot. A request still waiting in it is dropped and settles as superseded.
    fn register(&self, format: ExportFormat) -> (u64, oneshot::Receiver<String>) {
        let (resolver, receiver) = oneshot::channel();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.issued += 1;
        let serial = state.issued;
        if let Some(previous) = state.pending.replace(PendingExport { serial, format, resolver }) {
            tracing::debug!(
                serial = previous.serial,
                format = %previous.format,
                "export request replaced"
            );
        }
        (serial, receiver)
    }

    /// Hands `data` to the pending request. Empty payloads and an empty slot are ignored.
    pub(crate) fn resolve(&self, data: String) -> bool {
        if data.is_empty() {
            return false;
        }
        let pending = self.state.lock().unwrap_or_else(PoisonError::into_inner).pending.take();
        match pending {
            // The receiver may already be gone (caller dropped its future); nothing to do then.
            Some(pending) => pending.resolver.send(data).is_ok(),
            None => false,
        }
    }

    /// Clears the slot if it still holds request `serial`.
    fn expire(&self, serial: u64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.pending.as_ref().is_some_and(|pending| pending.serial == serial) {
            state.pending = None;
            return true;
        }
        false
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).pending.is_some()
    }
}

/// Replaces characters file systems reject; an empty name becomes `diagram`.
pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_FILE_STEM.to_owned();
    }
    trimmed
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Clears the in-progress flag when the export workflow ends, however it ends.
struct ExportingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ExportingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ExportingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Bridge {
    /// Asks the surface to convert its current document and waits for the answer.
    ///
    /// Settles exactly once: with the payload, with [`BridgeError::ExportTimeout`] after the
    /// configured deadline, or with [`BridgeError::ExportSuperseded`] when a newer request took
    /// the slot first.
    pub async fn request_export(&self, format: ExportFormat) -> Result<String, BridgeError> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }

        let (serial, mut receiver) = self.inner.exports.register(format);
        self.inner.channel.send(&Command::Export { format });

        let timeout = self.inner.config.export.timeout();
        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) => Err(BridgeError::ExportSuperseded { format }),
            Err(_) => {
                if self.inner.exports.expire(serial) {
                    tracing::warn!(%format, serial, "export timed out");
                    return Err(BridgeError::ExportTimeout { format, timeout });
                }
                // The slot moved on without us at the deadline: either our answer is already in
                // the receiver or a newer request replaced ours.
                receiver.try_recv().map_err(|_| BridgeError::ExportSuperseded { format })
            }
        }
    }

    pub fn is_export_pending(&self) -> bool {
        self.inner.exports.is_pending()
    }

    pub fn is_exporting(&self) -> bool {
        self.inner.exporting.load(Ordering::Acquire)
    }

    /// The surface's current native document, or the last settled content when the surface
    /// cannot deliver one.
    pub async fn sync_content(&self) -> Option<String> {
        let fallback = self.last_settled_xml();
        if !self.is_ready() {
            return fallback;
        }
        match self.request_export(ExportFormat::Xml).await {
            Ok(xml) if xml.contains(NATIVE_DOCUMENT_MARKER) => return Some(xml),
            Ok(_) => tracing::debug!("xml export is not a native document; using settled content"),
            Err(err) => tracing::warn!(%err, "cannot sync document from surface"),
        }
        fallback
    }

    /// Exports the current document as `format` and hands it to `emitter` as `<name>.<ext>`.
    ///
    /// Failures are logged and yield `None`; so does a call while another export workflow runs or
    /// before any content has settled.
    pub async fn export_download(
        &self,
        format: UserFormat,
        name: &str,
        emitter: &DownloadEmitter,
    ) -> Option<DownloadLink> {
        if self.last_settled_xml().is_none() {
            return None;
        }
        let Some(_guard) = ExportingGuard::acquire(&self.inner.exporting) else {
            tracing::debug!("export already in progress");
            return None;
        };

        let file_name = format!("{}.{}", sanitize_file_name(name), format.extension());
        match format {
            UserFormat::Drawio => {
                let document = self.sync_content().await?;
                if !document.contains(NATIVE_DOCUMENT_MARKER) {
                    tracing::warn!("no native document to download");
                    return None;
                }
                emitter.emit(&document, ExportFormat::Xml, &file_name)
            }
            UserFormat::Png | UserFormat::Svg => {
                let protocol_format = format.protocol_format();
                match self.request_export(protocol_format).await {
                    Ok(data) => emitter.emit(&data, protocol_format, &file_name),
                    Err(err) => {
                        tracing::warn!(%err, "export failed");
                        None
                    }
                }
            }
        }
    }
}
