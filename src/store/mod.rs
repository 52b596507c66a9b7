// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Snapshot files on disk.
//!
//! A [`Snapshot`] is the full serializable state of a diagram: what a source loader hands to
//! [`crate::engine::Engine::from_snapshot`] and what
//! [`crate::engine::Engine::export_snapshot`] returns. Entity lists keep their order, which is
//! the z-order and the tie break for side lists.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Decoration, DecorationId, Edge, EdgeId, Group, GroupId, Link, Node, NodeId, VariantCatalog,
};

/// An entity together with its id, serialized flat: `{ "id": "a", "rect": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyed<I, T> {
    pub id: I,
    #[serde(flatten)]
    pub value: T,
}

impl<I, T> Keyed<I, T> {
    pub fn new(id: I, value: T) -> Self {
        Self { id, value }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Keyed<NodeId, Node>>,
    #[serde(default)]
    pub edges: Vec<Keyed<EdgeId, Edge>>,
    #[serde(default)]
    pub groups: Vec<Keyed<GroupId, Group>>,
    #[serde(default)]
    pub decorations: Vec<Keyed<DecorationId, Decoration>>,
    #[serde(default)]
    pub catalog: VariantCatalog,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Snapshot {
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Temp file plus rename; no fsync.
    #[default]
    Fast,
    /// Also syncs the file and, on unix, its directory before returning.
    Durable,
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Snapshot::from_json_str(&contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    save_snapshot_with(path, snapshot, WriteDurability::default())
}

pub fn save_snapshot_with(
    path: &Path,
    snapshot: &Snapshot,
    durability: WriteDurability,
) -> Result<(), StoreError> {
    let mut contents = snapshot.to_json_string().map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    contents.push('\n');
    write_atomic(path, contents.as_bytes(), durability)
}

fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let tmp_path = parent.join(format!(
        ".pathway-canvas.tmp.{}.{}",
        file_name.to_string_lossy(),
        nanos
    ));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    file.write_all(contents).map_err(|source| StoreError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    #[cfg(unix)]
    if durability == WriteDurability::Durable {
        let dir = fs::File::open(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        dir.sync_all().map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    Ok(())
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
