// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turning export payloads into user downloads.
//!
//! The emitter shapes a payload into something a link can point at (a `data:` URI or a
//! transient `blob:` handle), "clicks" the link by handing it to a [`DownloadSink`] and releases
//! the handle shortly afterwards. Download problems never surface to the caller: they are
//! logged and the download is skipped.

pub mod folder;
pub mod urls;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DownloadConfig;
use crate::protocol::ExportFormat;

pub use folder::{DownloadFolder, WriteDurability};
pub use urls::{Blob, ObjectUrls, BLOB_SCHEME};

pub const XML_MIME: &str = "application/xml";
pub const SVG_MIME: &str = "image/svg+xml";
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";
pub const DATA_SCHEME: &str = "data:";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("unknown or revoked object url {href}")]
    UnknownHandle { href: String },
    #[error("malformed data uri")]
    MalformedDataUri,
    #[error("unsupported link {href}")]
    UnsupportedLink { href: String },
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid file name {name:?}")]
    InvalidFileName { name: String },
    #[error("io error at {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// What the anchor points at when it is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub href: String,
    pub file_name: String,
}

impl DownloadLink {
    pub fn is_object_url(&self) -> bool {
        self.href.starts_with(BLOB_SCHEME)
    }
}

/// Receives clicked links. `urls` resolves `blob:` handles while they are alive.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, link: &DownloadLink, urls: &ObjectUrls) -> Result<(), DownloadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedPayload {
    DataUri(String),
    Blob(Blob),
}

/// Shapes an export payload for download.
///
/// Native documents become an xml blob untouched. Ready-made data URIs pass through; a raster
/// payload without one is taken as bare base64; vector markup becomes an svg blob.
pub fn prepare_payload(payload: &str, format: ExportFormat) -> PreparedPayload {
    if format == ExportFormat::Xml {
        return PreparedPayload::Blob(Blob::new(XML_MIME, payload));
    }

    let trimmed = payload.trim();
    if trimmed.starts_with(DATA_SCHEME) {
        return PreparedPayload::DataUri(trimmed.to_owned());
    }
    match format {
        ExportFormat::Png => PreparedPayload::DataUri(format!("{PNG_DATA_URI_PREFIX}{trimmed}")),
        _ => PreparedPayload::Blob(Blob::new(SVG_MIME, trimmed)),
    }
}

pub struct DownloadEmitter {
    sink: Arc<dyn DownloadSink>,
    urls: ObjectUrls,
    revoke_delay: Duration,
}

impl std::fmt::Debug for DownloadEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEmitter")
            .field("urls", &self.urls)
            .field("revoke_delay", &self.revoke_delay)
            .finish_non_exhaustive()
    }
}

impl DownloadEmitter {
    pub fn new(sink: Arc<dyn DownloadSink>, config: &DownloadConfig) -> Self {
        Self { sink, urls: ObjectUrls::default(), revoke_delay: config.revoke_delay() }
    }

    pub fn urls(&self) -> &ObjectUrls {
        &self.urls
    }

    /// Offers `payload` as `file_name`. Returns the clicked link, or `None` if delivery failed.
    ///
    /// Blob handles are revoked `revoke_delay` later on the current tokio runtime, or right away
    /// outside of one.
    pub fn emit(
        &self,
        payload: &str,
        format: ExportFormat,
        file_name: &str,
    ) -> Option<DownloadLink> {
        let href = match prepare_payload(payload, format) {
            PreparedPayload::DataUri(href) => href,
            PreparedPayload::Blob(blob) => self.urls.create(blob),
        };
        let link = DownloadLink { href, file_name: file_name.to_owned() };

        let delivered = self.sink.deliver(&link, &self.urls);
        if link.is_object_url() {
            self.schedule_revoke(&link.href);
        }
        match delivered {
            Ok(()) => {
                tracing::info!(file = %link.file_name, %format, "download emitted");
                Some(link)
            }
            Err(err) => {
                tracing::warn!(file = %link.file_name, %err, "download failed");
                None
            }
        }
    }

    fn schedule_revoke(&self, href: &str) {
        let urls = self.urls.clone();
        let href = href.to_owned();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let delay = self.revoke_delay;
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    urls.revoke(&href);
                });
            }
            Err(_) => {
                urls.revoke(&href);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use rstest::rstest;

    use super::{
        prepare_payload, Blob, DownloadEmitter, DownloadError, DownloadLink, DownloadSink,
        ObjectUrls, PreparedPayload,
    };
    use crate::config::DownloadConfig;
    use crate::protocol::ExportFormat;

    #[derive(Default)]
    struct Recorder {
        delivered: Mutex<Vec<(DownloadLink, Option<Blob>)>>,
        fail: bool,
    }

    impl DownloadSink for Recorder {
        fn deliver(&self, link: &DownloadLink, urls: &ObjectUrls) -> Result<(), DownloadError> {
            if self.fail {
                return Err(DownloadError::UnsupportedLink { href: link.href.clone() });
            }
            let blob = urls.resolve(&link.href);
            self.delivered.lock().expect("recorder lock").push((link.clone(), blob));
            Ok(())
        }
    }

    #[rstest]
    #[case(
        "iVBORw0KGgo=",
        PreparedPayload::DataUri("data:image/png;base64,iVBORw0KGgo=".to_owned())
    )]
    #[case(
        "  data:image/png;base64,AAAA \n",
        PreparedPayload::DataUri("data:image/png;base64,AAAA".to_owned())
    )]
    fn png_payloads_become_data_uris(#[case] payload: &str, #[case] expected: PreparedPayload) {
        assert_eq!(prepare_payload(payload, ExportFormat::Png), expected);
    }

    #[test]
    fn svg_markup_becomes_svg_blob_and_svg_data_uri_passes_through() {
        assert_eq!(
            prepare_payload("\n  <svg/>\n", ExportFormat::Svg),
            PreparedPayload::Blob(Blob::new("image/svg+xml", "<svg/>"))
        );
        assert_eq!(
            prepare_payload("data:image/svg+xml;base64,PHN2Zy8+", ExportFormat::Svg),
            PreparedPayload::DataUri("data:image/svg+xml;base64,PHN2Zy8+".to_owned())
        );
    }

    #[test]
    fn xml_payload_is_kept_verbatim() {
        assert_eq!(
            prepare_payload(" <mxfile/> ", ExportFormat::Xml),
            PreparedPayload::Blob(Blob::new("application/xml", " <mxfile/> "))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn blob_handle_is_alive_during_delivery_and_revoked_after_delay() {
        let recorder = Arc::new(Recorder::default());
        let emitter = DownloadEmitter::new(recorder.clone(), &DownloadConfig::default());

        let link = emitter.emit("<mxfile/>", ExportFormat::Xml, "a.drawio").expect("emitted");
        assert!(link.is_object_url());
        assert_eq!(link.file_name, "a.drawio");
        {
            let delivered = recorder.delivered.lock().expect("recorder lock");
            assert_eq!(delivered.len(), 1);
            assert_eq!(delivered[0].1.as_ref().map(Blob::bytes), Some(&b"<mxfile/>"[..]));
        }
        assert_eq!(emitter.urls().len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(emitter.urls().is_empty());
    }

    #[test]
    fn failed_delivery_yields_none_and_releases_handle() {
        let recorder = Arc::new(Recorder { fail: true, ..Recorder::default() });
        let emitter = DownloadEmitter::new(recorder, &DownloadConfig::default());

        assert_eq!(emitter.emit("<svg/>", ExportFormat::Svg, "a.svg"), None);
        assert!(emitter.urls().is_empty());
    }
}
