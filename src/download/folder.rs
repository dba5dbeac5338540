// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Download sink that writes into a local folder.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;

use super::{DownloadError, DownloadLink, DownloadSink, ObjectUrls, BLOB_SCHEME, DATA_SCHEME};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Also flushes the file and the rename to stable storage where the platform allows it.
    Durable,
}

#[derive(Debug, Clone)]
pub struct DownloadFolder {
    dir: PathBuf,
    durability: WriteDurability,
}

impl DownloadFolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }
}

impl DownloadSink for DownloadFolder {
    fn deliver(&self, link: &DownloadLink, urls: &ObjectUrls) -> Result<(), DownloadError> {
        validate_file_name(&link.file_name)?;
        let bytes = resolve_link(&link.href, urls)?;
        let path = self.dir.join(&link.file_name);
        write_atomic(&self.dir, &path, &bytes, self.durability)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "download written");
        Ok(())
    }
}

/// Bytes behind a `blob:` handle or a `data:` URI.
pub fn resolve_link(href: &str, urls: &ObjectUrls) -> Result<Vec<u8>, DownloadError> {
    if href.starts_with(BLOB_SCHEME) {
        return urls
            .resolve(href)
            .map(|blob| blob.bytes().to_vec())
            .ok_or_else(|| DownloadError::UnknownHandle { href: href.to_owned() });
    }
    if let Some(rest) = href.strip_prefix(DATA_SCHEME) {
        return decode_data_uri(rest);
    }
    Err(DownloadError::UnsupportedLink { href: href.to_owned() })
}

fn decode_data_uri(rest: &str) -> Result<Vec<u8>, DownloadError> {
    let Some((meta, data)) = rest.split_once(',') else {
        return Err(DownloadError::MalformedDataUri);
    };
    if meta.ends_with(";base64") {
        Ok(base64::engine::general_purpose::STANDARD.decode(data.trim())?)
    } else {
        Ok(data.as_bytes().to_vec())
    }
}

fn validate_file_name(name: &str) -> Result<(), DownloadError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|file_name| file_name == name);
    if plain {
        Ok(())
    } else {
        Err(DownloadError::InvalidFileName { name: name.to_owned() })
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io { path: path.to_path_buf(), source }
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

/// Writes `contents` next to `path` under a temp name and renames it into place.
fn write_atomic(
    dir: &Path,
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), DownloadError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(DownloadError::Io {
                path: path.to_path_buf(),
                source: io::Error::other("refusing to overwrite a symlink"),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(DownloadError::Io { path: path.to_path_buf(), source }),
    }

    let file_name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path = dir.join(format!(".drawbridge.tmp.{file_name}.{nanos}"));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(io_error(&tmp_path))?;
    if let Err(err) = file.write_all(contents) {
        drop(file);
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error(&tmp_path)(err));
    }
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(io_error(&tmp_path))?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(DownloadError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let handle = fs::File::open(dir).map_err(io_error(dir))?;
            handle.sync_all().map_err(io_error(dir))?;
        }
    }

    Ok(())
}
