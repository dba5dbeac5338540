// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Test doubles for driving a [`Bridge`] without a real surface.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use serde_json::json;

use super::{Bridge, InboundMessage, Surface};
use crate::config::BridgeConfig;
use crate::protocol::Command;
use crate::xml::document::cell_id;
use crate::xml::parse_diagram;

pub(crate) const TRUSTED: &str = "https://embed.diagrams.net";

/// Records every posted command in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    posted: Mutex<Vec<String>>,
}

impl Surface for RecordingSurface {
    fn post(&self, message: String) {
        self.posted.lock().expect("recording lock").push(message);
    }
}

impl RecordingSurface {
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.posted
            .lock()
            .expect("recording lock")
            .iter()
            .map(|text| serde_json::from_str(text).expect("posted command is valid json"))
            .collect()
    }

    pub(crate) fn actions(&self) -> Vec<&'static str> {
        self.commands().iter().map(Command::action).collect()
    }

    pub(crate) fn count(&self, action: &str) -> usize {
        self.actions().into_iter().filter(|posted| *posted == action).count()
    }

    /// `(xml, autosave)` of every `load` in order.
    pub(crate) fn loads(&self) -> Vec<(String, u8)> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::Load { xml, autosave } => Some((xml, autosave)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.posted.lock().expect("recording lock").clear();
    }
}

pub(crate) fn bridge_with(config: BridgeConfig) -> (Bridge, Arc<RecordingSurface>) {
    let bridge = Bridge::new(config);
    let surface = Arc::new(RecordingSurface::default());
    bridge.attach(surface.clone());
    (bridge, surface)
}

pub(crate) fn bridge() -> (Bridge, Arc<RecordingSurface>) {
    bridge_with(BridgeConfig::default())
}

pub(crate) fn event(payload: serde_json::Value) -> InboundMessage {
    InboundMessage::text(TRUSTED, payload.to_string())
}

/// Delivers the handshake and forgets the `configure` it triggers.
pub(crate) fn make_ready(bridge: &Bridge, surface: &RecordingSurface) {
    bridge.handle_message(&event(json!({"event": "init"})));
    surface.clear();
}

pub(crate) fn export_reply(bridge: &Bridge, data: &str) {
    bridge.handle_message(&event(json!({"event": "export", "data": data})));
}

pub(crate) fn autosave(bridge: &Bridge, xml: &str) {
    bridge.handle_message(&event(json!({"event": "autosave", "xml": xml})));
}

/// Native document with `nodes` vertices followed by `edges` connectors chaining them.
pub(crate) fn diagram(nodes: usize, edges: usize) -> String {
    let mut cells = String::from(r#"<mxCell id="0"/><mxCell id="1" parent="0"/>"#);
    for index in 0..nodes {
        let _ = write!(cells, r#"<mxCell id="n{index}" value="N{index}" vertex="1" parent="1"/>"#);
    }
    for index in 0..edges {
        let source = index % nodes.max(1);
        let target = (index + 1) % nodes.max(1);
        let _ = write!(
            cells,
            r#"<mxCell id="e{index}" edge="1" source="n{source}" target="n{target}" parent="1"/>"#
        );
    }
    format!(
        r#"<mxfile host="test"><diagram id="p" name="Page-1"><mxGraphModel><root>{cells}</root></mxGraphModel></diagram></mxfile>"#
    )
}

/// Cell ids of a posted frame, in document order.
pub(crate) fn frame_ids(xml: &str) -> Vec<String> {
    parse_diagram(xml)
        .expect("frame is a valid diagram")
        .cells()
        .filter_map(cell_id)
        .map(str::to_owned)
        .collect()
}
