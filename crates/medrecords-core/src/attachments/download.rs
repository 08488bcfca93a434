//! Saving a remote attachment to the device.

use crate::backend::RecordsBackend;
use crate::config::ClientConfig;
use crate::models::RecordKind;

/// Title used in the file name when the record has none.
pub const DEFAULT_DOWNLOAD_TITLE: &str = "طبي";

/// Result of a download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    /// Bytes fetched; save them under `file_name`
    Saved { file_name: String, bytes: Vec<u8> },
    /// Fetch failed; open the raw URL instead
    OpenExternally { url: String },
}

/// File name for a downloaded attachment: `{label}_{title}.jpg`.
pub fn download_file_name(kind: RecordKind, title: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() {
        DEFAULT_DOWNLOAD_TITLE
    } else {
        title
    };
    format!("{}_{}.jpg", kind.label(), title)
}

/// Fetch an attachment for saving.
///
/// Never fails: when the bytes cannot be fetched the caller is told to open the
/// resolved URL directly.
pub async fn download_attachment<B>(
    backend: &B,
    config: &ClientConfig,
    kind: RecordKind,
    title: &str,
    reference: &str,
) -> Download
where
    B: RecordsBackend + ?Sized,
{
    let url = config.attachment_url(reference);
    match backend.fetch_attachment(&url).await {
        Ok(bytes) => Download::Saved {
            file_name: download_file_name(kind, title),
            bytes,
        },
        Err(e) => {
            tracing::warn!(%url, error = %e, "attachment download failed, opening externally");
            Download::OpenExternally { url }
        }
    }
}
