// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire shapes of the embed protocol.
//!
//! Outbound commands are JSON objects tagged by `action`, inbound events are JSON objects tagged
//! by `event`. Both travel as text.

pub mod command;
pub mod event;
pub mod format;

pub use command::{ChromeConfig, Command, Zoom};
pub use event::{parse_event, Event};
pub use format::{ExportFormat, ParseUserFormatError, UserFormat};
