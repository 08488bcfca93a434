//! Attachment reconciliation for one record form session.
//!
//! An attachment is in exactly one of three states, derived from set
//! membership rather than stored as a flag:
//!
//! ```text
//!   remote ──toggle──▶ remote ∩ deletions      (staged removal, still shown)
//!     ▲                      │
//!     └────────toggle────────┘
//!
//!   pending (local file + preview)  ──remove──▶  dropped, preview released
//! ```
//!
//! New files are strictly additive and deletions strictly subtractive, so the
//! submission (append set + delete-by-reference set) is the same regardless of
//! the order the user clicked things in.

mod download;
mod file;
mod preview;

pub use download::*;
pub use file::*;
pub use preview::*;

/// A staged local file and the preview it owns.
#[derive(Debug)]
pub struct PendingAttachment {
    file: LocalFile,
    preview: PreviewHandle,
}

impl PendingAttachment {
    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    pub fn preview_ref(&self) -> &PreviewRef {
        self.preview.reference()
    }

    pub fn has_preview(&self) -> bool {
        self.preview.has_content()
    }
}

/// One attachment as a view renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentView<'a> {
    /// Stored on the server; de-emphasized when marked for deletion
    Remote {
        reference: &'a str,
        marked_for_deletion: bool,
    },
    /// Staged locally, not yet uploaded
    Pending {
        preview: &'a PreviewRef,
        file: &'a LocalFile,
    },
}

/// Upload/delete instructions for a submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    /// Staged files, in insertion order
    pub new_files: Vec<LocalFile>,
    /// Remote references to remove, in toggle order
    pub deletions: Vec<String>,
}

impl Submission {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.deletions.is_empty()
    }
}

/// Three-way attachment state: remote, pending, and remote-marked-for-deletion.
#[derive(Debug)]
pub struct AttachmentSet {
    previews: PreviewRegistry,
    remote: Vec<String>,
    pending: Vec<PendingAttachment>,
    deletions: Vec<String>,
}

impl AttachmentSet {
    /// Empty set (create mode).
    pub fn new(previews: PreviewRegistry) -> Self {
        Self {
            previews,
            remote: Vec::new(),
            pending: Vec::new(),
            deletions: Vec::new(),
        }
    }

    /// Seed the remote set from an existing record (edit mode).
    pub fn from_remote<I, S>(previews: PreviewRegistry, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new(previews);
        for reference in references {
            let reference = reference.into();
            if !set.remote.contains(&reference) {
                set.remote.push(reference);
            }
        }
        set
    }

    /// Stage local files. Any file is accepted; returns the new preview refs.
    pub fn add_local_files<I>(&mut self, files: I) -> Vec<PreviewRef>
    where
        I: IntoIterator<Item = LocalFile>,
    {
        files
            .into_iter()
            .map(|file| {
                let preview = self.previews.create(&file);
                let reference = preview.reference().clone();
                self.pending.push(PendingAttachment { file, preview });
                reference
            })
            .collect()
    }

    /// Discard one staged file, releasing its preview.
    pub fn remove_local_file(&mut self, preview: &PreviewRef) -> Option<LocalFile> {
        let index = self
            .pending
            .iter()
            .position(|p| p.preview_ref() == preview)?;
        let PendingAttachment { file, preview } = self.pending.remove(index);
        drop(preview);
        Some(file)
    }

    /// Mark or unmark a remote attachment for deletion.
    ///
    /// Returns whether the reference is marked afterwards. Unknown references
    /// are ignored.
    pub fn toggle_deletion(&mut self, remote_ref: &str) -> bool {
        if !self.remote.iter().any(|r| r == remote_ref) {
            return false;
        }
        match self.deletions.iter().position(|r| r == remote_ref) {
            Some(index) => {
                self.deletions.remove(index);
                false
            }
            None => {
                self.deletions.push(remote_ref.to_string());
                true
            }
        }
    }

    pub fn is_marked_for_deletion(&self, remote_ref: &str) -> bool {
        self.deletions.iter().any(|r| r == remote_ref)
    }

    pub fn remote(&self) -> &[String] {
        &self.remote
    }

    pub fn pending(&self) -> &[PendingAttachment] {
        &self.pending
    }

    pub fn deletions(&self) -> &[String] {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.remote.is_empty() && self.pending.is_empty()
    }

    /// Render order: remote attachments first, then staged files.
    pub fn views(&self) -> Vec<AttachmentView<'_>> {
        let remote = self.remote.iter().map(|reference| AttachmentView::Remote {
            reference,
            marked_for_deletion: self.is_marked_for_deletion(reference),
        });
        let pending = self.pending.iter().map(|p| AttachmentView::Pending {
            preview: p.preview_ref(),
            file: &p.file,
        });
        remote.chain(pending).collect()
    }

    /// Instructions for the server. Pure; may be called any number of times.
    pub fn build_submission(&self) -> Submission {
        Submission {
            new_files: self.pending.iter().map(|p| p.file.clone()).collect(),
            deletions: self.deletions.clone(),
        }
    }
}
