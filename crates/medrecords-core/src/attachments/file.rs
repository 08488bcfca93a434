//! Local files staged for upload.

use std::path::Path;
use std::sync::Arc;

/// A file picked on the device, not yet uploaded.
///
/// The bytes are shared so that cloning a file into a submission payload does
/// not copy the image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    file_name: String,
    content_type: String,
    data: Arc<[u8]>,
}

impl LocalFile {
    /// Create from bytes; the content type is guessed from the file name.
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            data: Arc::from(data.into()),
        }
    }

    /// Override the guessed content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Read a file from disk.
    pub async fn read<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The only content check the client performs.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}
