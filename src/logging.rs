// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr; stdout carries protocol traffic in the stdio host.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Installs the global subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let default_directive = if verbose { "drawbridge=debug" } else { "drawbridge=info" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        // A subscriber installed by an embedding application takes precedence.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
