// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Staged ("animated") loading.
//!
//! A run pushes cumulative partial documents: structural cells plus a growing prefix of the
//! content cells, nodes before edges so no frame carries a dangling connector. Every run owns a
//! generation token; a newer run bumps the token and the older one notices at its next frame
//! boundary and stops without emitting anything further.

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::Command;
use crate::xml::parse_diagram;

use super::{Bridge, BridgeInner};

/// How a [`Bridge::load`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The document could not be split; it was loaded in one unanimated step.
    Fallback,
    /// All frames were sent and the document is the settled content.
    Settled { frames: usize },
    /// A newer load took over after `frames` frames.
    Superseded { frames: usize },
}

/// Cumulative prefix lengths for `total` content cells in steps of `batch_size`.
///
/// Empty for a document without content cells: such a run settles without sending a frame.
pub fn frame_boundaries(total: usize, batch_size: usize) -> Vec<usize> {
    let batch_size = batch_size.max(1);
    (batch_size..total + batch_size).step_by(batch_size).map(|end| end.min(total)).collect()
}

impl Bridge {
    /// Pushes `target_xml` to the surface as a sequence of growing frames.
    ///
    /// Inbound content changes are ignored while the run streams: the surface echoes every
    /// partial frame back as an autosave.
    pub async fn load(&self, target_xml: &str) -> LoadOutcome {
        let inner = &self.inner;
        let animation = &inner.config.animation;

        let document = match parse_diagram(target_xml) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "diagram cannot be staged; loading it in one step");
                let token = {
                    let mut session = inner.session();
                    let token = session.begin_animation();
                    session.settle(token, target_xml);
                    token
                };
                inner.channel.send(&Command::load(target_xml, true));
                schedule_fit(inner, animation.settle_fit_delay(), token);
                return LoadOutcome::Fallback;
            }
        };

        let plan = document.stream_plan();
        let total = plan.content_len();
        let batch_size = animation.batch_size(total);
        let token = inner.session().begin_animation();
        tracing::debug!(token, total, batch_size, "animation started");

        let mut frames = 0;
        for end in frame_boundaries(total, batch_size) {
            if !inner.session().is_current(token) {
                tracing::debug!(token, frames, "animation superseded");
                return LoadOutcome::Superseded { frames };
            }

            let partial = match document.rebuild(&plan.frame_cells(end)) {
                Ok(partial) => partial,
                Err(err) => {
                    tracing::warn!(token, %err, "cannot rebuild partial diagram; ending animation");
                    break;
                }
            };

            let is_final = end == total;
            inner.channel.send(&Command::load(partial, is_final));
            frames += 1;
            tracing::trace!(token, cells = end, is_final, "frame sent");

            schedule_fit(inner, animation.frame_fit_delay(), token);
            tokio::time::sleep(animation.frame_interval()).await;
        }

        if !inner.session().settle(token, target_xml) {
            tracing::debug!(token, frames, "animation superseded");
            return LoadOutcome::Superseded { frames };
        }
        tracing::debug!(token, frames, "animation settled");
        schedule_fit(inner, animation.settle_fit_delay(), token);
        LoadOutcome::Settled { frames }
    }
}

/// Sends a fit-view after `delay` unless a newer run took over in the meantime.
fn schedule_fit(inner: &Arc<BridgeInner>, delay: Duration, token: u64) {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if inner.session().is_current(token) {
            inner.channel.send(&Command::fit());
        }
    });
}
