// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Deserialize;
use serde_json::Value;

/// Inbound events the bridge reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `init` or `ready`: the surface finished booting.
    Handshake,
    /// `save` or `autosave` carrying the surface's current document.
    ContentChanged { xml: String },
    /// `export` carrying the converted document.
    ExportResult { data: String },
}

/// Loose view of an inbound envelope. Fields stay untyped so a payload of the wrong shape
/// reads as "unrecognized" instead of failing the whole message.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    xml: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

/// Parses one inbound message text. Anything that is not a recognized event returns `None`.
pub fn parse_event(text: &str) -> Option<Event> {
    let raw: RawEvent = serde_json::from_str(text).ok()?;

    match raw.event.as_deref()? {
        "init" | "ready" => Some(Event::Handshake),
        "save" | "autosave" => match raw.xml {
            Some(Value::String(xml)) => Some(Event::ContentChanged { xml }),
            _ => None,
        },
        "export" => match raw.data {
            Some(Value::String(data)) => Some(Event::ExportResult { data }),
            _ => None,
        },
        _ => None,
    }
}
