// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Format names understood by the surface's `export` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xml,
    Png,
    Svg,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format names offered to the user; `drawio` is the native document file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFormat {
    Drawio,
    Png,
    Svg,
}

impl UserFormat {
    pub fn protocol_format(self) -> ExportFormat {
        match self {
            Self::Drawio => ExportFormat::Xml,
            Self::Png => ExportFormat::Png,
            Self::Svg => ExportFormat::Svg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Drawio => "drawio",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for UserFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUserFormatError {
    value: String,
}

impl fmt::Display for ParseUserFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown export format {:?} (expected drawio, png or svg)", self.value)
    }
}

impl std::error::Error for ParseUserFormatError {}

impl FromStr for UserFormat {
    type Err = ParseUserFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drawio" => Ok(Self::Drawio),
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            _ => Err(ParseUserFormatError { value: s.to_owned() }),
        }
    }
}
