// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const BLOB_SCHEME: &str = "blob:";

/// In-memory payload addressed by a transient handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    mime: &'static str,
    bytes: Vec<u8>,
}

impl Blob {
    pub fn new(mime: &'static str, bytes: impl Into<Vec<u8>>) -> Self {
        Self { mime, bytes: bytes.into() }
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Default)]
struct Registry {
    next: u64,
    blobs: HashMap<String, Blob>,
}

/// Registry of `blob:` handles. Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrls {
    registry: Arc<Mutex<Registry>>,
}

impl ObjectUrls {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `blob` and returns its handle.
    pub fn create(&self, blob: Blob) -> String {
        let mut registry = self.registry();
        registry.next += 1;
        let href = format!("{BLOB_SCHEME}drawbridge/{}", registry.next);
        registry.blobs.insert(href.clone(), blob);
        href
    }

    pub fn resolve(&self, href: &str) -> Option<Blob> {
        self.registry().blobs.get(href).cloned()
    }

    /// Releases `href`. Returns `false` if it was unknown or already revoked.
    pub fn revoke(&self, href: &str) -> bool {
        self.registry().blobs.remove(href).is_some()
    }

    pub fn len(&self) -> usize {
        self.registry().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
