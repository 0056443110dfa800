//! SQLite snapshot files for persisted indexes
//!
//! A snapshot is a single `index.sqlite3` file holding every fragment with its
//! embedding, plus a small key/value header. New snapshots are written to a
//! temporary file inside one transaction and renamed over the previous one,
//! so readers never observe a half-written index.

use crate::StoreError;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use scrivener_domain::{DocumentId, Fragment, FragmentId};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the snapshot inside the storage directory
pub const SNAPSHOT_FILE: &str = "index.sqlite3";

/// Current snapshot layout version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Header values stored alongside the fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Layout version the snapshot was written with
    pub format_version: u32,
    /// Embedding model that produced the vectors
    pub embedding_model: String,
    /// Embedding dimension
    pub dimension: usize,
}

/// Removes a partially written file unless it was committed
struct PendingFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Path of the snapshot file inside `dir`
pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}

fn id_to_bytes(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

fn bytes_to_id(bytes: &[u8]) -> Result<u128, String> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| format!("expected 16 id bytes, got {}", bytes.len()))?;
    Ok(u128::from_be_bytes(arr))
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!("embedding blob length {} is not a multiple of 4", bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn corrupt(path: &Path, e: impl Display) -> StoreError {
    StoreError::CorruptIndex(format!("{}: {}", path.display(), e))
}

/// Write a snapshot into `dir`, replacing any previous one
pub fn write_snapshot(
    dir: &Path,
    header: &SnapshotHeader,
    entries: &[(Fragment, Vec<f32>)],
) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir)?;
    let final_path = snapshot_path(dir);
    let tmp_path = dir.join(format!("{}.tmp", SNAPSHOT_FILE));
    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }

    let mut pending = PendingFile {
        path: tmp_path.clone(),
        committed: false,
    };

    let mut conn = Connection::open(&tmp_path)?;
    conn.execute_batch(include_str!("schema.sql"))?;

    let tx = conn.transaction()?;
    {
        let mut meta = tx.prepare("INSERT INTO snapshot_meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["format_version", header.format_version.to_string()])?;
        meta.execute(params!["embedding_model", &header.embedding_model])?;
        meta.execute(params!["dimension", header.dimension.to_string()])?;

        let mut insert = tx.prepare(
            "INSERT INTO fragments (position, id, document_id, ordinal, source_path, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, (fragment, embedding)) in entries.iter().enumerate() {
            insert.execute(params![
                position as i64,
                id_to_bytes(fragment.id.value()),
                id_to_bytes(fragment.document_id.value()),
                fragment.ordinal as i64,
                fragment.source_path.to_string_lossy().into_owned(),
                &fragment.text,
                embedding_to_bytes(embedding),
            ])?;
        }
    }
    tx.commit()?;
    conn.close().map_err(|(_, e)| StoreError::Database(e))?;

    fs::rename(&tmp_path, &final_path)?;
    pending.committed = true;

    debug!("Wrote {} fragments to {}", entries.len(), final_path.display());
    Ok(final_path)
}

/// Read the snapshot in `dir`
///
/// Any failure, including a missing file, is reported as
/// [`StoreError::CorruptIndex`].
pub fn read_snapshot(dir: &Path) -> Result<(SnapshotHeader, Vec<(Fragment, Vec<f32>)>), StoreError> {
    let path = snapshot_path(dir);
    if !path.is_file() {
        return Err(corrupt(&path, "snapshot file not found"));
    }

    let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| corrupt(&path, e))?;

    let meta = |key: &str| -> Result<String, StoreError> {
        conn.query_row(
            "SELECT value FROM snapshot_meta WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| corrupt(&path, e))?
        .ok_or_else(|| corrupt(&path, format!("missing header '{}'", key)))
    };

    let format_version: u32 = meta("format_version")?
        .parse()
        .map_err(|e| corrupt(&path, format!("bad format_version: {}", e)))?;
    if format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(corrupt(
            &path,
            format!(
                "snapshot format version {} is not supported (expected {})",
                format_version, SNAPSHOT_FORMAT_VERSION
            ),
        ));
    }

    let header = SnapshotHeader {
        format_version,
        embedding_model: meta("embedding_model")?,
        dimension: meta("dimension")?
            .parse()
            .map_err(|e| corrupt(&path, format!("bad dimension: {}", e)))?,
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, document_id, ordinal, source_path, text, embedding
             FROM fragments ORDER BY position",
        )
        .map_err(|e| corrupt(&path, e))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Vec<u8>>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Vec<u8>>(5)?,
            ))
        })
        .map_err(|e| corrupt(&path, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| corrupt(&path, e))?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, document_id, ordinal, source_path, text, embedding) in rows {
        let embedding = bytes_to_embedding(&embedding).map_err(|e| corrupt(&path, e))?;
        if embedding.len() != header.dimension {
            return Err(corrupt(
                &path,
                format!(
                    "fragment embedding has {} dimensions, header says {}",
                    embedding.len(),
                    header.dimension
                ),
            ));
        }
        let fragment = Fragment {
            id: FragmentId::from_value(bytes_to_id(&id).map_err(|e| corrupt(&path, e))?),
            document_id: DocumentId::from_value(
                bytes_to_id(&document_id).map_err(|e| corrupt(&path, e))?,
            ),
            ordinal: usize::try_from(ordinal).map_err(|e| corrupt(&path, e))?,
            text,
            source_path: PathBuf::from(source_path),
        };
        entries.push((fragment, embedding));
    }

    Ok((header, entries))
}
