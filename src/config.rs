// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bridge configuration.
//!
//! Every timing and threshold is tunable; the defaults reproduce the cadence the embedded
//! surface has been exercised with. Files are TOML, durations are milliseconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::ChromeConfig;

pub const DEFAULT_TRUSTED_ORIGINS: [&str; 2] =
    ["https://embed.diagrams.net", "https://app.diagrams.net"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Origins whose messages are accepted; everything else is dropped.
    pub trusted_origins: Vec<String>,
    /// Chrome flags sent with the one-time `configure` command.
    pub chrome: ChromeConfig,
    pub animation: AnimationConfig,
    pub export: ExportConfig,
    pub download: DownloadConfig,
    pub embed: EmbedConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            trusted_origins: DEFAULT_TRUSTED_ORIGINS
                .iter()
                .map(|origin| (*origin).to_owned())
                .collect(),
            chrome: ChromeConfig::default(),
            animation: AnimationConfig::default(),
            export: ExportConfig::default(),
            download: DownloadConfig::default(),
            embed: EmbedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Content-cell count above which frames carry `large_batch_size` cells.
    pub large_diagram_threshold: usize,
    pub large_batch_size: usize,
    pub frame_interval_ms: u64,
    pub frame_fit_delay_ms: u64,
    /// Delay of the fit view after a run settles (and after the unanimated fallback load).
    pub settle_fit_delay_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            large_diagram_threshold: 240,
            large_batch_size: 5,
            frame_interval_ms: 60,
            frame_fit_delay_ms: 80,
            settle_fit_delay_ms: 120,
        }
    }
}

impl AnimationConfig {
    pub fn batch_size(&self, content_cells: usize) -> usize {
        if content_cells > self.large_diagram_threshold {
            self.large_batch_size.max(1)
        } else {
            1
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn frame_fit_delay(&self) -> Duration {
        Duration::from_millis(self.frame_fit_delay_ms)
    }

    pub fn settle_fit_delay(&self) -> Duration {
        Duration::from_millis(self.settle_fit_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub timeout_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl ExportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// How long a transient blob handle outlives the click that started its download.
    pub revoke_delay_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { revoke_delay_ms: 100 }
    }
}

impl DownloadConfig {
    pub fn revoke_delay(&self) -> Duration {
        Duration::from_millis(self.revoke_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub base_url: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self { base_url: "https://embed.diagrams.net/".to_owned() }
    }
}

impl EmbedConfig {
    /// URL to host the surface at, with the JSON protocol and autosave switched on.
    pub fn surface_url(&self, chrome: &ChromeConfig) -> String {
        let flag = |on: bool| if on { '1' } else { '0' };
        format!(
            "{}?embed=1&spin=1&proto=json&autosave=1&saveAndExit=0&noSaveBtn=1&noExitBtn=1\
             &sidebar={}&layers={}&toolbar={}&menubar={}&status={}&format={}",
            self.base_url,
            flag(chrome.sidebar),
            flag(chrome.layers),
            flag(chrome.toolbar),
            flag(chrome.menubar),
            flag(chrome.status),
            flag(chrome.format),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path:?}: {source}")]
    Toml { path: PathBuf, source: toml::de::Error },
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }

    pub fn is_trusted_origin(&self, origin: &str) -> bool {
        self.trusted_origins.iter().any(|trusted| trusted == origin)
    }
}
