//! Save-RAM persistence
//!
//! Battery-backed cartridge RAM is stored per title as raw bytes. The session
//! hands the emulator to a persist callback, which typically forwards to
//! [`save_emulator_ram`] with one of the stores below.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tracing::debug;

use crate::emulator::Emulator;

/// Largest save image accepted (1 MiB)
pub const MAX_SAVE_RAM_SIZE: usize = 1024 * 1024;

const SAVE_EXTENSION: &str = "sav";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("save RAM I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("save RAM for '{title}' is {size} bytes, limit is {MAX_SAVE_RAM_SIZE}")]
    TooLarge { title: String, size: usize },
}

/// Storage for per-title save RAM
pub trait SaveRamStore {
    /// Stored RAM for `title`, or `None` if nothing was saved yet
    fn load(&self, title: &str) -> Result<Option<Vec<u8>>, PersistError>;

    /// Replace the stored RAM for `title`
    fn save(&mut self, title: &str, ram: &[u8]) -> Result<(), PersistError>;
}

/// Persist the emulator's save RAM, if it has any
///
/// Returns whether anything was written.
pub fn save_emulator_ram<E: Emulator + ?Sized>(
    store: &mut dyn SaveRamStore,
    emulator: &E,
) -> Result<bool, PersistError> {
    let Some(ram) = emulator.save_ram() else {
        return Ok(false);
    };
    store.save(emulator.title(), &ram)?;
    Ok(true)
}

fn check_size(title: &str, size: usize) -> Result<(), PersistError> {
    if size > MAX_SAVE_RAM_SIZE {
        return Err(PersistError::TooLarge {
            title: title.to_string(),
            size,
        });
    }
    Ok(())
}

/// File name stem for a title
///
/// Keeps ASCII letters, digits, `-`, `_` and inner dots; everything else
/// becomes `_`. Titles that reduce to nothing map to `untitled`.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

// ============================================================================
// File Store
// ============================================================================

/// Save RAM stored as `<dir>/<sanitized title>.sav`
#[derive(Debug, Clone)]
pub struct FileSaveRamStore {
    dir: PathBuf,
}

impl FileSaveRamStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_title(title), SAVE_EXTENSION))
    }
}

impl SaveRamStore for FileSaveRamStore {
    fn load(&self, title: &str) -> Result<Option<Vec<u8>>, PersistError> {
        let path = self.path_for(title);
        let ram = match fs::read(&path) {
            Ok(ram) => ram,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        check_size(title, ram.len())?;
        debug!("Loaded {} bytes of save RAM from {}", ram.len(), path.display());
        Ok(Some(ram))
    }

    fn save(&mut self, title: &str, ram: &[u8]) -> Result<(), PersistError> {
        check_size(title, ram.len())?;
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(title);
        let tmp_path = path.with_extension(format!("{}.tmp", SAVE_EXTENSION));

        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(ram)?;
            f.sync_all()?;
        }

        #[cfg(windows)]
        {
            if path.exists() {
                // Windows rename fails if destination exists.
                fs::remove_file(&path)?;
            }
        }

        fs::rename(&tmp_path, &path)?;
        debug!("Saved {} bytes of save RAM to {}", ram.len(), path.display());
        Ok(())
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory store, keyed by the unmodified title
#[derive(Debug, Clone, Default)]
pub struct MemorySaveRamStore {
    saves: HashMap<String, Vec<u8>>,
    writes: u64,
}

impl MemorySaveRamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.saves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saves.is_empty()
    }

    /// Total number of `save` calls
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn get(&self, title: &str) -> Option<&[u8]> {
        self.saves.get(title).map(Vec::as_slice)
    }
}

impl SaveRamStore for MemorySaveRamStore {
    fn load(&self, title: &str) -> Result<Option<Vec<u8>>, PersistError> {
        Ok(self.saves.get(title).cloned())
    }

    fn save(&mut self, title: &str, ram: &[u8]) -> Result<(), PersistError> {
        check_size(title, ram.len())?;
        self.saves.insert(title.to_string(), ram.to_vec());
        self.writes += 1;
        Ok(())
    }
}
