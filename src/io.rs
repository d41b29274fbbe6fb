use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bincode::Options;
use image::{DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::canvas::PixelBuffer;
use crate::error::{LoadWarning, ProjectError};

// ============================================================================
// DPCT PROJECT FILE FORMAT
// ============================================================================

/// Format tag written into every project file.
pub const FORMAT_VERSION: &str = "1.0";
/// Project file extension (without the dot).
pub const PROJECT_EXTENSION: &str = "dpct";
/// Suffix inserted before the extension for autosave copies.
pub const AUTOSAVE_SUFFIX: &str = "_autosave";

/// Maximum supported canvas dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted project files.
pub const MAX_CANVAS_DIM: u32 = 32_768;
/// Upper bound on an encoded project, checked before allocating.
const MAX_PROJECT_BYTES: u64 = 1 << 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    #[default]
    Bracelet,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Bracelet => "bracelet",
        }
    }
}

impl FromStr for ProjectKind {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bracelet" => Ok(ProjectKind::Bracelet),
            other => Err(ProjectError::InvalidRequest(format!(
                "unknown project type '{}'",
                other
            ))),
        }
    }
}

/// Serializable project record: the logical schema of a `.dpct` file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    /// Width then height.
    pub size: (u32, u32),
    /// Row-major RGB, `width * height * 3` bytes.
    pub contents: Vec<u8>,
    pub name: String,
}

impl ProjectFile {
    /// Build a record from a canvas. Copies the pixels, so the result can be
    /// moved to another thread while editing continues.
    pub fn from_canvas(name: &str, kind: ProjectKind, canvas: &PixelBuffer) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            kind,
            size: canvas.size(),
            contents: canvas.to_flat(),
            name: name.to_string(),
        }
    }

    /// Validate dimensions and rebuild the pixel buffer.
    pub fn to_canvas(&self) -> Result<PixelBuffer, ProjectError> {
        let (w, h) = self.size;
        if w == 0 || h == 0 || w > MAX_CANVAS_DIM || h > MAX_CANVAS_DIM {
            return Err(ProjectError::CorruptData(format!(
                "canvas size {}x{} is outside 1..={}",
                w, h, MAX_CANVAS_DIM
            )));
        }
        Ok(PixelBuffer::from_flat(self.contents.clone(), w, h)?)
    }

    pub fn version_warning(&self) -> Option<LoadWarning> {
        (self.version != FORMAT_VERSION).then(|| LoadWarning::VersionMismatch {
            found: self.version.clone(),
            expected: FORMAT_VERSION.to_string(),
        })
    }
}

/// A decoded project plus anything the user should be told about it.
#[derive(Debug)]
pub struct LoadedProject {
    pub file: ProjectFile,
    pub canvas: PixelBuffer,
    pub warning: Option<LoadWarning>,
}

/// Load/save seam for project records. The editor only talks to this trait.
pub trait ProjectStore {
    fn load(&self, source: &Path) -> Result<LoadedProject, ProjectError>;
    fn save(&self, project: &ProjectFile, destination: &Path) -> Result<(), ProjectError>;
}

/// Project files on the local filesystem, bincode-encoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStore;

impl ProjectStore for FileStore {
    fn load(&self, source: &Path) -> Result<LoadedProject, ProjectError> {
        load_project(source)
    }

    fn save(&self, project: &ProjectFile, destination: &Path) -> Result<(), ProjectError> {
        save_project(project, destination)
    }
}

fn codec(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(limit)
}

pub fn encode_project(project: &ProjectFile) -> Result<Vec<u8>, ProjectError> {
    codec(MAX_PROJECT_BYTES)
        .serialize(project)
        .map_err(|e| ProjectError::CorruptData(e.to_string()))
}

pub fn decode_project(raw: &[u8]) -> Result<LoadedProject, ProjectError> {
    let file: ProjectFile = codec(MAX_PROJECT_BYTES)
        .deserialize(raw)
        .map_err(|e| ProjectError::CorruptData(e.to_string()))?;
    let canvas = file.to_canvas()?;
    let warning = file.version_warning();
    Ok(LoadedProject {
        file,
        canvas,
        warning,
    })
}

/// Read and validate a project file. A version mismatch is returned as a
/// warning on the loaded project, not as an error.
pub fn load_project(path: &Path) -> Result<LoadedProject, ProjectError> {
    let raw = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProjectError::FileNotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ProjectError::PermissionDenied(path.to_path_buf()),
        _ => ProjectError::ReadFailure {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let loaded = decode_project(&raw)?;
    if let Some(ref w) = loaded.warning {
        warn!("{}: {}", path.display(), w);
    }
    info!(
        "opened project '{}' ({}x{}) from {}",
        loaded.file.name,
        loaded.file.size.0,
        loaded.file.size.1,
        path.display()
    );
    Ok(loaded)
}

/// Write a project file. Fails with `PermissionDenied` before touching the
/// disk when the destination directory is missing or read-only.
pub fn save_project(project: &ProjectFile, path: &Path) -> Result<(), ProjectError> {
    ensure_writable_dir(path)?;
    let bytes = encode_for_save(project, path, MAX_PROJECT_BYTES)?;
    write_bytes(path, &bytes)?;
    info!("saved project '{}' to {}", project.name, path.display());
    Ok(())
}

/// Encoding failures while saving are write failures, not corrupt data.
fn encode_for_save(project: &ProjectFile, path: &Path, limit: u64) -> Result<Vec<u8>, ProjectError> {
    codec(limit)
        .serialize(project)
        .map_err(|e| ProjectError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ProjectError> {
    let file = File::create(path).map_err(|e| map_write_error(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| map_write_error(path, e))
}

fn map_write_error(path: &Path, e: std::io::Error) -> ProjectError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ProjectError::PermissionDenied(path.to_path_buf()),
        _ => ProjectError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

/// The directory that will hold `path` must exist and not be read-only.
pub fn ensure_writable_dir(path: &Path) -> Result<(), ProjectError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    match std::fs::metadata(&dir) {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(()),
        _ => Err(ProjectError::PermissionDenied(dir)),
    }
}

/// `designs/cuff.dpct` -> `designs/cuff_autosave.dpct`.
pub fn autosave_path(save_path: &Path) -> PathBuf {
    let stem = save_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{}{}.{}", stem, AUTOSAVE_SUFFIX, PROJECT_EXTENSION);
    save_path.with_file_name(name)
}

// ============================================================================
// RASTER EXPORT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
    Tiff,
    Gif,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[
            ExportFormat::Png,
            ExportFormat::Jpeg,
            ExportFormat::Bmp,
            ExportFormat::Tga,
            ExportFormat::Tiff,
            ExportFormat::Gif,
        ]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Tga => "tga",
            ExportFormat::Tiff => "tiff",
            ExportFormat::Gif => "gif",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "bmp" => Some(ExportFormat::Bmp),
            "tga" => Some(ExportFormat::Tga),
            "tif" | "tiff" => Some(ExportFormat::Tiff),
            "gif" => Some(ExportFormat::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl FromStr for ExportFormat {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim())
            .ok_or_else(|| ProjectError::InvalidRequest(format!("unsupported export format '{}'", s)))
    }
}

/// JPEG quality used for exports.
const JPEG_QUALITY: u8 = 95;

/// Encode an image to a standard raster format. Independent of the project
/// container; nothing about the session changes on failure.
pub fn export_raster(image: DynamicImage, path: &Path, format: ExportFormat) -> Result<(), ProjectError> {
    ensure_writable_dir(path)?;
    let file = File::create(path).map_err(|e| map_write_error(path, e))?;
    let mut writer = BufWriter::new(file);

    let (image, output) = match format {
        ExportFormat::Png => (image, ImageOutputFormat::Png),
        ExportFormat::Jpeg => (DynamicImage::ImageRgb8(image.to_rgb8()), ImageOutputFormat::Jpeg(JPEG_QUALITY)),
        ExportFormat::Bmp => (image, ImageOutputFormat::Bmp),
        ExportFormat::Tga => (image, ImageOutputFormat::Tga),
        ExportFormat::Tiff => (image, ImageOutputFormat::Tiff),
        ExportFormat::Gif => (DynamicImage::ImageRgba8(image.to_rgba8()), ImageOutputFormat::Gif),
    };

    image
        .write_to(&mut writer, output)
        .map_err(|e| ProjectError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    writer.flush().map_err(|e| map_write_error(path, e))?;
    info!("exported {:?} to {}", format, path.display());
    Ok(())
}
