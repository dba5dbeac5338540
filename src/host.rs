// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Line-oriented host for a surface that lives in another process.
//!
//! Outbound commands go out as one JSON text per line. Inbound traffic arrives as one
//! `{"origin": ..., "data": ...}` envelope per line. The host waits for the handshake, shows one
//! diagram, optionally runs the export workflow and returns.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::bridge::{Bridge, InboundMessage, LoadOutcome, Surface};
use crate::download::{DownloadEmitter, DownloadLink};
use crate::protocol::UserFormat;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("input closed before the surface became ready")]
    ClosedBeforeReady,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("host task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Forwards posted commands to the writer task.
#[derive(Debug)]
struct LineSurface {
    lines: mpsc::UnboundedSender<String>,
}

impl Surface for LineSurface {
    fn post(&self, message: String) {
        if self.lines.send(message).is_err() {
            tracing::debug!("output closed; dropping command");
        }
    }
}

#[derive(Debug)]
pub struct ExportJob {
    pub format: UserFormat,
    pub name: String,
    pub emitter: DownloadEmitter,
}

#[derive(Debug)]
pub struct HostJob {
    pub diagram: String,
    pub export: Option<ExportJob>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostReport {
    /// `None` when the diagram was not loaded (empty, or already on the surface).
    pub outcome: Option<LoadOutcome>,
    pub download: Option<DownloadLink>,
}

pub async fn run<R, W>(
    bridge: Bridge,
    input: R,
    output: W,
    job: HostJob,
) -> Result<HostReport, HostError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (lines, outbound) = mpsc::unbounded_channel();
    bridge.attach(Arc::new(LineSurface { lines }));
    let writer = tokio::spawn(write_lines(outbound, output));
    let mut reader = tokio::spawn(read_lines(bridge.clone(), input));

    let mut ready = bridge.ready_signal();
    let handshake = tokio::select! {
        biased;
        signal = ready.wait_for(|ready| *ready) => {
            signal.map(|_| ()).map_err(|_| HostError::ClosedBeforeReady)
        }
        read = &mut reader => match read {
            Ok(Ok(())) => Err(HostError::ClosedBeforeReady),
            Ok(Err(err)) => Err(err.into()),
            Err(err) => Err(err.into()),
        },
    };
    if let Err(err) = handshake {
        reader.abort();
        bridge.channel().detach();
        return Err(err);
    }

    let mut report = HostReport { outcome: bridge.show(&job.diagram).await, download: None };
    tracing::info!(outcome = ?report.outcome, "diagram shown");
    // Lets the closing fit view go out.
    tokio::time::sleep(bridge.config().animation.settle_fit_delay()).await;

    if let Some(export) = job.export {
        report.download =
            bridge.export_download(export.format, &export.name, &export.emitter).await;
    }

    reader.abort();
    bridge.channel().detach();
    writer.await??;
    Ok(report)
}

async fn write_lines<W>(
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut output: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbound.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.shutdown().await
}

async fn read_lines<R>(bridge: Bridge, input: R) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundMessage>(&line) {
            Ok(message) => bridge.handle_message(&message),
            Err(err) => tracing::warn!(%err, "skipping malformed input line"),
        }
    }
    tracing::debug!("input closed");
    Ok(())
}
