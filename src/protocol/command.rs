// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use super::ExportFormat;

/// Chrome panels of the surface; `false` hides the panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    pub sidebar: bool,
    pub format: bool,
    pub layers: bool,
    pub menubar: bool,
    pub toolbar: bool,
    pub status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zoom {
    Fit,
}

/// Outbound message; serialized as `{"action": ..., ...payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Configure { config: ChromeConfig },
    Zoom { zoom: Zoom },
    Load { xml: String, autosave: u8 },
    Export { format: ExportFormat },
}

impl Command {
    pub fn fit() -> Self {
        Self::Zoom { zoom: Zoom::Fit }
    }

    pub fn load(xml: impl Into<String>, autosave: bool) -> Self {
        Self::Load { xml: xml.into(), autosave: u8::from(autosave) }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::Zoom { .. } => "zoom",
            Self::Load { .. } => "load",
            Self::Export { .. } => "export",
        }
    }

    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
