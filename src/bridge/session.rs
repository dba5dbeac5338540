// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    #[default]
    NotReady,
    Ready,
}

/// One-way handshake latch. It does not queue work; callers check it before loading.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadinessGate {
    state: Readiness,
}

impl ReadinessGate {
    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == Readiness::Ready
    }

    /// Returns `true` only for the call that performs the `NotReady -> Ready` transition.
    pub fn open(&mut self) -> bool {
        if self.is_ready() {
            return false;
        }
        self.state = Readiness::Ready;
        true
    }
}

/// Content the surface is known to hold once it stopped changing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledContent {
    hash: u64,
    xml: String,
}

impl SettledContent {
    pub fn new(xml: impl Into<String>) -> Self {
        let xml = xml.into();
        Self { hash: content_hash(&xml), xml }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn matches(&self, xml: &str) -> bool {
        self.hash == content_hash(xml) && self.xml == xml
    }
}

fn content_hash(xml: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    xml.hash(&mut hasher);
    hasher.finish()
}

/// Mutable state of one embedded editor instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditorSession {
    gate: ReadinessGate,
    last_settled: Option<SettledContent>,
    animating: bool,
    animation_token: u64,
}

impl EditorSession {
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut ReadinessGate {
        &mut self.gate
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn last_settled(&self) -> Option<&SettledContent> {
        self.last_settled.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn animation_token(&self) -> u64 {
        self.animation_token
    }

    /// Invalidates any run in flight and returns the token of the new one.
    pub fn begin_animation(&mut self) -> u64 {
        self.animation_token += 1;
        self.animating = true;
        self.animation_token
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.animation_token == token
    }

    /// Marks the run identified by `token` as settled on `xml`. A superseded run changes nothing
    /// and gets `false`.
    pub fn settle(&mut self, token: u64, xml: &str) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.animating = false;
        self.last_settled = Some(SettledContent::new(xml));
        true
    }

    /// Records a document the user produced on the surface.
    pub fn record_edit(&mut self, xml: &str) {
        self.last_settled = Some(SettledContent::new(xml));
    }
}
