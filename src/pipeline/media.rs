//! Media files, modalities and local previews

use base64::Engine;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::shared::{UiSink, UiUpdate};

/// Upload modality handled by a submission pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Image,
    Video,
}

impl Modality {
    /// Declared MIME type prefix this modality accepts
    pub fn mime_prefix(&self) -> &'static str {
        match self {
            Modality::Image => "image/",
            Modality::Video => "video/",
        }
    }

    /// Multipart field carrying the file
    pub fn field_name(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Video => "video",
        }
    }

    /// Endpoint path relative to the API root
    pub fn endpoint(&self) -> &'static str {
        match self {
            Modality::Image => "detect/image",
            Modality::Video => "detect/video",
        }
    }

    /// Loading indicator text while a submission is in flight
    pub fn busy_message(&self) -> &'static str {
        match self {
            Modality::Image => "Processing image...",
            Modality::Video => "Processing video...",
        }
    }

    pub fn noun(&self) -> &'static str {
        self.field_name()
    }

    pub fn article(&self) -> &'static str {
        match self {
            Modality::Image => "an",
            Modality::Video => "a",
        }
    }

    /// Whether a declared MIME type belongs to this modality
    ///
    /// The declared type is matched as given: no trimming, no case folding.
    pub fn accepts(&self, mime: &str) -> bool {
        mime.starts_with(self.mime_prefix())
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// A file the user picked or dropped
#[derive(Clone)]
pub struct MediaFile {
    /// File name as shown to the user and sent to the server
    pub name: String,
    /// Declared MIME type
    pub mime: String,
    /// File contents
    pub data: Arc<[u8]>,
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, declaring its type from the extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime_for_path(path), data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Declared MIME type for a path, by extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        _ => "application/octet-stream",
    }
}

/// Locally displayable representation of a selected file
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub modality: Modality,
    /// Identifier of the upload this preview belongs to
    pub preview_id: u64,
    pub file_name: String,
    /// `data:<mime>;base64,...`
    pub data_url: String,
    /// Pixel size, when the file could be decoded as an image
    pub dimensions: Option<(u32, u32)>,
}

impl PreviewImage {
    /// Encode a file into a preview; runs on a blocking worker
    pub fn build(modality: Modality, preview_id: u64, file: &MediaFile) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&file.data);
        let data_url = format!("data:{};base64,{}", file.mime, encoded);

        let dimensions = match modality {
            Modality::Image => match read_dimensions(&file.data) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    warn!("Could not decode preview of {}: {}", file.name, e);
                    None
                }
            },
            Modality::Video => None,
        };

        Self {
            modality,
            preview_id,
            file_name: file.name.clone(),
            data_url,
            dimensions,
        }
    }
}

fn read_dimensions(data: &[u8]) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()
}

/// The upload currently owning a pipeline's preview slot
///
/// Dropping it releases the preview it published, if any.
#[derive(Debug)]
pub struct UploadArtifact {
    id: u64,
    modality: Modality,
    preview: Option<PreviewImage>,
    sink: UiSink,
}

impl UploadArtifact {
    pub fn new(id: u64, modality: Modality, sink: UiSink) -> Self {
        Self {
            id,
            modality,
            preview: None,
            sink,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Publish the decoded preview for this upload
    pub fn show_preview(&mut self, preview: PreviewImage) {
        self.sink.send(UiUpdate::PreviewShown(preview.clone()));
        self.preview = Some(preview);
    }
}

impl Drop for UploadArtifact {
    fn drop(&mut self) {
        if self.preview.take().is_some() {
            trace!("Releasing {} preview #{}", self.modality, self.id);
            self.sink.send(UiUpdate::PreviewReleased {
                modality: self.modality,
                preview_id: self.id,
            });
        }
    }
}
