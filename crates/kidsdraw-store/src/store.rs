//! Directory-backed image storage.
//!
//! Layout under the store root:
//!
//! ```text
//! images/     original photos
//! sketches/   converted artwork
//! temp/       scratch files, wiped by cleanup_temp
//! artworks/   one JSON ArtworkRecord per saved original/sketch pair
//! ```
//!
//! Saved images are named `{name}_{uuid}.jpg`; that file name is the
//! identifier callers keep.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use kidsdraw_pipeline::{Bitmap, ConversionParameters, StyleKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec;
use crate::error::StoreError;

const ARTWORK_DIR: &str = "artworks";

/// Which subdirectory an image lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDirectory {
    /// Original photos (`images/`).
    Original,
    /// Converted artwork (`sketches/`).
    Sketch,
    /// Scratch space (`temp/`).
    Temp,
}

impl ImageDirectory {
    /// All directories.
    pub const ALL: [Self; 3] = [Self::Original, Self::Sketch, Self::Temp];

    /// Subdirectory name under the store root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Original => "images",
            Self::Sketch => "sketches",
            Self::Temp => "temp",
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JPEG quality for saved images, 1 to 100.
    pub jpeg_quality: u8,
}

impl StoreConfig {
    /// Default JPEG quality.
    pub const DEFAULT_JPEG_QUALITY: u8 = 80;
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Style and slider values an artwork was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkSettings {
    /// Conversion style.
    pub style: StyleKind,
    /// Slider values.
    pub params: ConversionParameters,
}

/// A saved original/sketch pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    /// Record identifier.
    pub id: Uuid,
    /// File name of the original in [`ImageDirectory::Original`].
    pub original_file: String,
    /// File name of the converted image in [`ImageDirectory::Sketch`].
    pub sketch_file: String,
    /// How the sketch was produced.
    pub settings: ArtworkSettings,
}

/// Saves, loads, and deletes JPEG images under a root directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    config: StoreConfig,
}

impl ImageStore {
    /// Open (creating if needed) a store at `root` with default settings.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if a directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_config(root, StoreConfig::default())
    }

    /// Open (creating if needed) a store at `root`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if a directory cannot be created.
    pub fn open_with_config(root: impl Into<PathBuf>, config: StoreConfig) -> Result<Self, StoreError> {
        let store = Self {
            root: root.into(),
            config,
        };
        for dir in ImageDirectory::ALL {
            let path = store.dir_path(dir);
            fs::create_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;
        }
        let artworks = store.root.join(ARTWORK_DIR);
        fs::create_dir_all(&artworks).map_err(|e| StoreError::io(&artworks, e))?;

        tracing::debug!(root = %store.root.display(), "opened image store");
        Ok(store)
    }

    /// Store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Absolute path of `dir`.
    #[must_use]
    pub fn dir_path(&self, dir: ImageDirectory) -> PathBuf {
        self.root.join(dir.dir_name())
    }

    /// Path of `file_name` inside `dir`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidName`] if the name is empty, contains a path
    /// separator, or contains `..`.
    pub fn path_of(&self, file_name: &str, dir: ImageDirectory) -> Result<PathBuf, StoreError> {
        check_name(file_name)?;
        Ok(self.dir_path(dir).join(file_name))
    }

    /// JPEG-encode `bitmap` into `dir` as `{name}_{uuid}.jpg` and return
    /// the file name.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidName`] for a bad `name`,
    /// [`StoreError::Encode`] or [`StoreError::Io`] if writing fails.
    pub fn save(&self, bitmap: &Bitmap, name: &str, dir: ImageDirectory) -> Result<String, StoreError> {
        check_name(name)?;
        let file_name = format!("{name}_{}.jpg", Uuid::new_v4());
        let path = self.dir_path(dir).join(&file_name);

        let bytes = codec::encode_jpeg(bitmap, self.config.jpeg_quality)?;
        fs::write(&path, &bytes).map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(file = %file_name, dir = dir.dir_name(), bytes = bytes.len(), "saved image");
        Ok(file_name)
    }

    /// Save an original photo.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save).
    pub fn save_original(&self, bitmap: &Bitmap) -> Result<String, StoreError> {
        self.save(bitmap, "original", ImageDirectory::Original)
    }

    /// Save a converted image.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save).
    pub fn save_sketch(&self, bitmap: &Bitmap) -> Result<String, StoreError> {
        self.save(bitmap, "sketch", ImageDirectory::Sketch)
    }

    /// Load a previously saved image. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidName`], [`StoreError::Io`] for read failures
    /// other than not-found, [`StoreError::Decode`] for corrupt files.
    pub fn load(&self, file_name: &str, dir: ImageDirectory) -> Result<Option<Bitmap>, StoreError> {
        let path = self.path_of(file_name, dir)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let bitmap = image::load_from_memory(&bytes)
            .map_err(|e| StoreError::Decode {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .into_rgba8();
        Ok(Some(bitmap))
    }

    /// Delete an image. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidName`] or [`StoreError::Io`].
    pub fn delete(&self, file_name: &str, dir: ImageDirectory) -> Result<bool, StoreError> {
        let path = self.path_of(file_name, dir)?;
        remove_if_exists(&path)
    }

    /// File names in `dir`, sorted.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the directory cannot be read.
    pub fn list(&self, dir: ImageDirectory) -> Result<Vec<String>, StoreError> {
        list_files(&self.dir_path(dir))
    }

    /// Remove every file in `temp/`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the directory cannot be read or a file
    /// cannot be removed.
    pub fn cleanup_temp(&self) -> Result<usize, StoreError> {
        let dir = self.dir_path(ImageDirectory::Temp);
        let mut removed = 0;
        for name in list_files(&dir)? {
            if remove_if_exists(&dir.join(&name))? {
                removed += 1;
            }
        }
        tracing::debug!(removed, "cleaned temp directory");
        Ok(removed)
    }

    /// Save an original and its converted image together and record how
    /// the conversion was made.
    ///
    /// # Errors
    ///
    /// Any error from [`save`](Self::save) or writing the record. Images
    /// already written are removed again on failure.
    pub fn save_artwork(
        &self,
        original: &Bitmap,
        sketch: &Bitmap,
        style: StyleKind,
        params: ConversionParameters,
    ) -> Result<ArtworkRecord, StoreError> {
        let original_file = self.save_original(original)?;
        let sketch_file = match self.save_sketch(sketch) {
            Ok(file) => file,
            Err(e) => {
                self.delete(&original_file, ImageDirectory::Original).ok();
                return Err(e);
            }
        };

        let record = ArtworkRecord {
            id: Uuid::new_v4(),
            original_file,
            sketch_file,
            settings: ArtworkSettings { style, params },
        };

        if let Err(e) = self.write_record(&record) {
            self.delete(&record.original_file, ImageDirectory::Original).ok();
            self.delete(&record.sketch_file, ImageDirectory::Sketch).ok();
            return Err(e);
        }

        tracing::info!(artwork = %record.id, %style, "saved artwork");
        Ok(record)
    }

    /// Load an artwork record. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] or [`StoreError::Record`].
    pub fn load_artwork(&self, id: Uuid) -> Result<Option<ArtworkRecord>, StoreError> {
        let path = self.record_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// All artwork records, ordered by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] or [`StoreError::Record`].
    pub fn list_artworks(&self) -> Result<Vec<ArtworkRecord>, StoreError> {
        let dir = self.root.join(ARTWORK_DIR);
        let mut records = Vec::new();
        for name in list_files(&dir)? {
            let path = dir.join(&name);
            let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
            records.push(serde_json::from_slice::<ArtworkRecord>(&bytes)?);
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    /// Delete an artwork record and both of its images. Returns whether
    /// the record existed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] or [`StoreError::Record`].
    pub fn delete_artwork(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(record) = self.load_artwork(id)? else {
            return Ok(false);
        };
        self.delete(&record.original_file, ImageDirectory::Original)?;
        self.delete(&record.sketch_file, ImageDirectory::Sketch)?;
        remove_if_exists(&self.record_path(id))
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.root.join(ARTWORK_DIR).join(format!("{id}.json"))
    }

    fn write_record(&self, record: &ArtworkRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.id);
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&path, json).map_err(|e| StoreError::io(&path, e))
    }
}

fn check_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn list_files(dir: &Path) -> Result<Vec<String>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| StoreError::io(entry.path(), e))?
            .is_file();
        if is_file && let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
