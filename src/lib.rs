// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Drawbridge: host-side bridge to an embedded draw.io surface.
//!
//! The surface is driven over a JSON message protocol: a handshake gates all traffic, diagrams
//! are loaded as a staged sequence of growing partial documents, and exports are correlated with
//! their replies through a single pending slot.

pub mod bridge;
pub mod config;
pub mod download;
pub mod host;
pub mod logging;
pub mod protocol;
pub mod xml;

pub use bridge::{Bridge, BridgeError, InboundMessage, LoadOutcome, Surface};
pub use config::BridgeConfig;
