//! Preview resources for staged files.
//!
//! Every staged file gets a locally generated reference (`preview:<uuid>`).
//! Image files additionally register their bytes in the shared registry so a
//! view can render a thumbnail. The [`PreviewHandle`] owning a reference
//! revokes the registry entry when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::LocalFile;

/// Locally generated preview reference; never a server reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(String);

impl PreviewRef {
    fn generate() -> Self {
        Self(format!("preview:{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rendered preview: the staged image's bytes and type.
#[derive(Debug, Clone)]
pub struct PreviewContent {
    pub content_type: String,
    pub data: Arc<[u8]>,
}

/// Registry of live previews, shared by every attachment set of a session.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashMap<PreviewRef, PreviewContent>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a preview for `file`.
    ///
    /// Never fails: non-image files, or a registry that cannot be locked, yield
    /// a handle without content.
    pub fn create(&self, file: &LocalFile) -> PreviewHandle {
        let reference = PreviewRef::generate();
        let registered = file.is_image()
            && match self.live.lock() {
                Ok(mut live) => {
                    live.insert(
                        reference.clone(),
                        PreviewContent {
                            content_type: file.content_type().to_string(),
                            data: file.shared_bytes(),
                        },
                    );
                    true
                }
                Err(_) => false,
            };

        if !registered {
            tracing::debug!(file = file.file_name(), "no preview generated");
        }

        PreviewHandle {
            reference,
            registry: self.clone(),
            registered,
        }
    }

    /// Look up preview content by reference.
    pub fn get(&self, reference: &PreviewRef) -> Option<PreviewContent> {
        self.live.lock().ok()?.get(reference).cloned()
    }

    /// Number of previews not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    fn revoke(&self, reference: &PreviewRef) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(reference);
        }
    }
}

/// Owner of one preview reference; releases the preview on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    reference: PreviewRef,
    registry: PreviewRegistry,
    registered: bool,
}

impl PreviewHandle {
    pub fn reference(&self) -> &PreviewRef {
        &self.reference
    }

    /// Whether preview content was generated.
    pub fn has_content(&self) -> bool {
        self.registered
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if self.registered {
            self.registry.revoke(&self.reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_preview_registered_and_released() {
        let registry = PreviewRegistry::new();
        let handle = registry.create(&LocalFile::new("a.jpg", vec![1, 2]));

        assert!(handle.has_content());
        assert!(handle.reference().as_str().starts_with("preview:"));
        assert_eq!(registry.live_count(), 1);
        let content = registry.get(handle.reference()).unwrap();
        assert_eq!(content.content_type, "image/jpeg");
        assert_eq!(&*content.data, &[1, 2]);

        let reference = handle.reference().clone();
        drop(handle);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.get(&reference).is_none());
    }

    #[test]
    fn test_non_image_gets_reference_without_content() {
        let registry = PreviewRegistry::new();
        let handle = registry.create(&LocalFile::new("notes.txt", "hello"));

        assert!(!handle.has_content());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_references_are_unique() {
        let registry = PreviewRegistry::new();
        let file = LocalFile::new("a.png", vec![0]);
        let a = registry.create(&file);
        let b = registry.create(&file);
        assert_ne!(a.reference(), b.reference());
        assert_eq!(registry.live_count(), 2);
    }
}
