// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use super::testing::{
    autosave, bridge, bridge_with, diagram, event, export_reply, frame_ids, make_ready,
};
use super::{BridgeError, InboundMessage, LoadOutcome};
use crate::config::{AnimationConfig, BridgeConfig};
use crate::download::folder::resolve_link;
use crate::download::{DownloadEmitter, DownloadError, DownloadLink, DownloadSink, ObjectUrls};
use crate::protocol::{Command, ExportFormat, UserFormat};

async fn settle_timers() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

#[derive(Default)]
struct CollectingSink {
    files: Mutex<Vec<(DownloadLink, Vec<u8>)>>,
}

impl DownloadSink for CollectingSink {
    fn deliver(&self, link: &DownloadLink, urls: &ObjectUrls) -> Result<(), DownloadError> {
        let bytes = resolve_link(&link.href, urls)?;
        self.files.lock().expect("sink lock").push((link.clone(), bytes));
        Ok(())
    }
}

impl CollectingSink {
    fn files(&self) -> Vec<(DownloadLink, Vec<u8>)> {
        self.files.lock().expect("sink lock").clone()
    }
}

fn emitter() -> (Arc<DownloadEmitter>, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let emitter = DownloadEmitter::new(sink.clone(), &BridgeConfig::default().download);
    (Arc::new(emitter), sink)
}

// Handshake and filtering

#[tokio::test(start_paused = true)]
async fn handshake_configures_once_and_signals_readiness() {
    let (bridge, surface) = bridge();
    let mut ready = bridge.ready_signal();
    assert!(!*ready.borrow());

    bridge.handle_message(&event(json!({"event": "init"})));
    bridge.handle_message(&event(json!({"event": "ready"})));
    bridge.handle_message(&event(json!({"event": "init"})));

    ready.wait_for(|ready| *ready).await.expect("ready signal");
    assert!(bridge.is_ready());
    assert_eq!(surface.actions(), vec!["configure"]);
    assert!(matches!(
        surface.commands().first(),
        Some(Command::Configure { config }) if *config == bridge.config().chrome
    ));
}

#[tokio::test(start_paused = true)]
async fn untrusted_and_non_text_messages_change_nothing() {
    let (bridge, surface) = bridge();
    bridge.handle_message(&InboundMessage::text("https://evil.example", r#"{"event":"init"}"#));
    bridge.handle_message(&InboundMessage {
        origin: "https://embed.diagrams.net".to_owned(),
        data: json!({"event": "init"}),
    });
    bridge.handle_message(&event(json!({"event": "configure"})));

    assert!(!bridge.is_ready());
    assert!(surface.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_sent_before_the_handshake() {
    let (bridge, surface) = bridge();

    assert_eq!(bridge.show(&diagram(2, 1)).await, None);
    assert!(matches!(
        bridge.request_export(ExportFormat::Png).await,
        Err(BridgeError::NotReady)
    ));
    assert!(surface.commands().is_empty());
    assert!(!bridge.is_export_pending());
}

// Animated loading

#[tokio::test(start_paused = true)]
async fn small_diagram_streams_nodes_then_edges_one_cell_per_frame() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let xml = diagram(3, 2);

    assert_eq!(bridge.load(&xml).await, LoadOutcome::Settled { frames: 5 });

    let loads = surface.loads();
    let flags: Vec<u8> = loads.iter().map(|(_, autosave)| *autosave).collect();
    assert_eq!(flags, vec![0, 0, 0, 0, 1]);

    let frames: Vec<Vec<String>> = loads.iter().map(|(frame, _)| frame_ids(frame)).collect();
    assert_eq!(frames[0], vec!["0", "1", "n0"]);
    assert_eq!(frames[2], vec!["0", "1", "n0", "n1", "n2"]);
    assert_eq!(frames[4], vec!["0", "1", "n0", "n1", "n2", "e0", "e1"]);
    for pair in frames.windows(2) {
        assert_eq!(pair[1].len(), pair[0].len() + 1);
        assert!(pair[1].starts_with(&pair[0]));
    }

    assert!(!bridge.is_animating());
    assert_eq!(bridge.last_settled_xml(), Some(xml));
}

#[tokio::test(start_paused = true)]
async fn large_diagram_streams_in_batches() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);

    assert_eq!(bridge.load(&diagram(500, 0)).await, LoadOutcome::Settled { frames: 100 });

    let loads = surface.loads();
    assert_eq!(loads.len(), 100);
    assert_eq!(frame_ids(&loads[0].0).len(), 2 + 5);
    assert_eq!(loads.iter().filter(|(_, autosave)| *autosave == 1).count(), 1);
    assert_eq!(loads[99].1, 1);
}

#[tokio::test(start_paused = true)]
async fn batching_follows_configured_threshold() {
    let config = BridgeConfig {
        animation: AnimationConfig {
            large_diagram_threshold: 4,
            large_batch_size: 3,
            ..AnimationConfig::default()
        },
        ..BridgeConfig::default()
    };
    let (bridge, surface) = bridge_with(config);
    make_ready(&bridge, &surface);

    assert_eq!(bridge.load(&diagram(5, 2)).await, LoadOutcome::Settled { frames: 3 });
    let sizes: Vec<usize> = surface.loads().iter().map(|(xml, _)| frame_ids(xml).len()).collect();
    assert_eq!(sizes, vec![5, 8, 9]);
}

#[tokio::test(start_paused = true)]
async fn diagram_without_content_cells_settles_without_frames() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let xml = diagram(0, 0);

    assert_eq!(bridge.load(&xml).await, LoadOutcome::Settled { frames: 0 });
    settle_timers().await;

    assert!(surface.loads().is_empty());
    assert_eq!(surface.count("zoom"), 1);
    assert_eq!(bridge.last_settled_xml(), Some(xml));
    assert!(!bridge.is_animating());
}

#[tokio::test(start_paused = true)]
async fn every_frame_and_the_settled_state_schedule_a_fit() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);

    bridge.load(&diagram(3, 2)).await;
    settle_timers().await;

    assert_eq!(surface.count("load"), 5);
    assert_eq!(surface.count("zoom"), 6);
}

#[tokio::test(start_paused = true)]
async fn newer_load_supersedes_running_animation() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let first = diagram(10, 0);
    let second = diagram(2, 0);

    let running = {
        let bridge = bridge.clone();
        let first = first.clone();
        tokio::spawn(async move { bridge.load(&first).await })
    };
    // Frames of the first run leave at 0, 60 and 120 ms.
    tokio::time::sleep(Duration::from_millis(130)).await;
    assert!(bridge.is_animating());

    assert_eq!(bridge.load(&second).await, LoadOutcome::Settled { frames: 2 });
    assert_eq!(running.await.expect("join"), LoadOutcome::Superseded { frames: 3 });
    settle_timers().await;

    let loads = surface.loads();
    assert_eq!(loads.len(), 5);
    let sizes: Vec<usize> = loads.iter().map(|(xml, _)| frame_ids(xml).len()).collect();
    assert_eq!(sizes, vec![3, 4, 5, 3, 4]);
    assert_eq!(
        loads.last().map(|(xml, autosave)| (xml.as_str(), *autosave)),
        Some((second.as_str(), 1))
    );

    // Only the first run's 80 ms fit predates the takeover.
    assert_eq!(surface.count("zoom"), 1 + 2 + 1);
    assert_eq!(bridge.last_settled_xml(), Some(second));
    assert!(!bridge.is_animating());
}

#[tokio::test(start_paused = true)]
async fn malformed_diagram_falls_back_to_single_load() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let broken = "<mxGraphModel><root></mxGraphModel>";

    assert_eq!(bridge.load(broken).await, LoadOutcome::Fallback);
    settle_timers().await;

    assert_eq!(surface.loads(), vec![(broken.to_owned(), 1)]);
    assert_eq!(surface.count("zoom"), 1);
    assert_eq!(bridge.last_settled_xml().as_deref(), Some(broken));
    assert!(!bridge.is_animating());
}

// Content changes

#[tokio::test(start_paused = true)]
async fn autosave_is_ignored_while_animating_and_recorded_afterwards() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let edits = Arc::new(Mutex::new(Vec::new()));
    {
        let edits = Arc::clone(&edits);
        bridge.set_content_listener(move |xml| edits.lock().expect("edits").push(xml.to_owned()));
    }

    let xml = diagram(3, 0);
    let running = {
        let bridge = bridge.clone();
        let xml = xml.clone();
        tokio::spawn(async move { bridge.load(&xml).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    autosave(&bridge, "<echo/>");
    assert!(edits.lock().expect("edits").is_empty());

    running.await.expect("join");
    assert_eq!(bridge.last_settled_xml(), Some(xml.clone()));

    let edited = diagram(4, 0);
    autosave(&bridge, &edited);
    assert_eq!(*edits.lock().expect("edits"), vec![edited.clone()]);
    assert_eq!(bridge.last_settled_xml(), Some(edited.clone()));

    surface.clear();
    assert_eq!(bridge.show(&edited).await, None);
    assert_eq!(bridge.show("").await, None);
    assert!(surface.commands().is_empty());

    assert_eq!(bridge.show(&xml).await, Some(LoadOutcome::Settled { frames: 3 }));
}

#[tokio::test(start_paused = true)]
async fn content_listener_may_replace_itself() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let handle = bridge.clone();
        let seen = Arc::clone(&seen);
        bridge.set_content_listener(move |xml| {
            seen.lock().expect("seen").push(format!("first:{xml}"));
            let seen = Arc::clone(&seen);
            handle.set_content_listener(move |xml| {
                seen.lock().expect("seen").push(format!("second:{xml}"));
            });
        });
    }

    autosave(&bridge, "<a/>");
    autosave(&bridge, "<b/>");

    assert_eq!(*seen.lock().expect("seen"), vec!["first:<a/>", "second:<b/>"]);
}

// Export gateway

#[tokio::test(start_paused = true)]
async fn export_times_out_after_deadline_without_blocking_later_requests() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);

    let started = tokio::time::Instant::now();
    let err = bridge.request_export(ExportFormat::Png).await.expect_err("no reply");
    assert!(matches!(err, BridgeError::ExportTimeout { format: ExportFormat::Png, .. }));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(5000) && waited < Duration::from_millis(5100));
    assert!(!bridge.is_export_pending());
    assert!(matches!(
        surface.commands().as_slice(),
        [Command::Export { format: ExportFormat::Png }]
    ));

    let pending = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.request_export(ExportFormat::Svg).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    export_reply(&bridge, "<svg/>");
    assert_eq!(pending.await.expect("join").expect("resolved"), "<svg/>");
}

#[tokio::test(start_paused = true)]
async fn export_settles_once_and_late_replies_are_ignored() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);

    let pending = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.request_export(ExportFormat::Xml).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(bridge.is_export_pending());

    export_reply(&bridge, "");
    assert!(bridge.is_export_pending());
    export_reply(&bridge, "<mxfile>first</mxfile>");
    export_reply(&bridge, "<mxfile>second</mxfile>");

    assert_eq!(pending.await.expect("join").expect("resolved"), "<mxfile>first</mxfile>");
    settle_timers().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!bridge.is_export_pending());
}

#[tokio::test(start_paused = true)]
async fn newer_export_request_supersedes_pending_one() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);

    let first = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.request_export(ExportFormat::Png).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.request_export(ExportFormat::Svg).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    export_reply(&bridge, "<svg/>");

    assert!(matches!(
        first.await.expect("join"),
        Err(BridgeError::ExportSuperseded { format: ExportFormat::Png })
    ));
    assert_eq!(second.await.expect("join").expect("resolved"), "<svg/>");
    assert_eq!(surface.count("export"), 2);
}

// Export workflow

#[tokio::test(start_paused = true)]
async fn drawio_download_uses_the_live_document() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    bridge.load(&diagram(2, 0)).await;
    let (emitter, sink) = emitter();

    let download = {
        let bridge = bridge.clone();
        let emitter = Arc::clone(&emitter);
        tokio::spawn(async move {
            bridge.export_download(UserFormat::Drawio, "my/report", &emitter).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(bridge.is_exporting());
    assert!(matches!(
        surface.commands().last(),
        Some(Command::Export { format: ExportFormat::Xml })
    ));
    export_reply(&bridge, "<mxfile><diagram>live</diagram></mxfile>");

    let link = download.await.expect("join").expect("downloaded");
    assert_eq!(link.file_name, "my_report.drawio");
    assert!(link.is_object_url());
    assert_eq!(sink.files()[0].1, b"<mxfile><diagram>live</diagram></mxfile>".to_vec());
    assert!(!bridge.is_exporting());
}

#[tokio::test(start_paused = true)]
async fn drawio_download_falls_back_to_settled_content() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let xml = diagram(2, 1);
    bridge.load(&xml).await;
    let (emitter, sink) = emitter();

    let link = bridge
        .export_download(UserFormat::Drawio, "", &emitter)
        .await
        .expect("downloaded after timeout");

    assert_eq!(link.file_name, "diagram.drawio");
    assert_eq!(sink.files()[0].1, xml.into_bytes());
}

#[tokio::test(start_paused = true)]
async fn png_download_rejects_overlapping_workflows() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    bridge.load(&diagram(1, 0)).await;
    let (emitter, sink) = emitter();

    let download = {
        let bridge = bridge.clone();
        let emitter = Arc::clone(&emitter);
        tokio::spawn(
            async move { bridge.export_download(UserFormat::Png, "chart", &emitter).await },
        )
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(bridge.export_download(UserFormat::Svg, "other", &emitter).await, None);
    assert_eq!(surface.count("export"), 1);

    export_reply(&bridge, "AAEC");
    let link = download.await.expect("join").expect("downloaded");
    assert_eq!(link.href, "data:image/png;base64,AAEC");
    assert_eq!(link.file_name, "chart.png");
    assert_eq!(sink.files()[0].1, vec![0, 1, 2]);
    assert!(!bridge.is_exporting());
}

#[tokio::test(start_paused = true)]
async fn failed_or_premature_downloads_yield_nothing() {
    let (bridge, surface) = bridge();
    make_ready(&bridge, &surface);
    let (emitter, sink) = emitter();

    assert_eq!(bridge.export_download(UserFormat::Png, "x", &emitter).await, None);
    assert!(surface.commands().is_empty());

    bridge.load(&diagram(1, 0)).await;
    assert_eq!(bridge.export_download(UserFormat::Svg, "x", &emitter).await, None);
    assert!(sink.files().is_empty());
    assert!(!bridge.is_exporting());
}
