//! Property tests for the attachment set.

use std::collections::HashSet;

use proptest::prelude::*;

use medrecords_core::attachments::{AttachmentSet, LocalFile, PreviewRegistry};

const REMOTE: [&str; 4] = ["a.jpg", "b.jpg", "https://cdn.example.com/c.jpg", "d.png"];

#[derive(Debug, Clone)]
enum Op {
    /// Stage this many new images
    Add(usize),
    /// Remove the pending file at this index (modulo length)
    Remove(usize),
    /// Toggle a remote reference; indices past the remote set hit unknown refs
    Toggle(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4).prop_map(Op::Add),
        any::<usize>().prop_map(Op::Remove),
        (0usize..REMOTE.len() + 2).prop_map(Op::Toggle),
    ]
}

/// Apply `ops`, tracking the expected deletion order alongside.
fn apply(set: &mut AttachmentSet, ops: &[Op], expected: &mut Vec<String>) {
    let mut counter = 0;
    for op in ops {
        match op {
            Op::Add(n) => {
                let files = (0..*n).map(|_| {
                    counter += 1;
                    LocalFile::new(format!("new-{counter}.jpg"), vec![0xFF, 0xD8])
                });
                set.add_local_files(files.collect::<Vec<_>>());
            }
            Op::Remove(i) => {
                if !set.pending().is_empty() {
                    let preview = set.pending()[i % set.pending().len()].preview_ref().clone();
                    assert!(set.remove_local_file(&preview).is_some());
                }
            }
            Op::Toggle(i) => {
                let reference = match REMOTE.get(*i) {
                    Some(r) => r.to_string(),
                    None => match set.pending().first() {
                        Some(p) => p.preview_ref().to_string(),
                        None => "missing.jpg".to_string(),
                    },
                };
                set.toggle_deletion(&reference);
                if REMOTE.contains(&reference.as_str()) {
                    match expected.iter().position(|r| *r == reference) {
                        Some(pos) => {
                            expected.remove(pos);
                        }
                        None => expected.push(reference),
                    }
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn remote_set_unaffected_and_deletions_exact(ops in prop::collection::vec(op(), 0..40)) {
        let registry = PreviewRegistry::new();
        let mut set = AttachmentSet::from_remote(registry.clone(), REMOTE);
        let mut expected = Vec::new();

        apply(&mut set, &ops, &mut expected);

        let remote: Vec<&str> = set.remote().iter().map(String::as_str).collect();
        prop_assert_eq!(remote, REMOTE.to_vec());

        let submission = set.build_submission();
        prop_assert_eq!(&submission.deletions, &expected);

        let unique: HashSet<&String> = submission.deletions.iter().collect();
        prop_assert_eq!(unique.len(), submission.deletions.len());
        prop_assert!(submission.deletions.iter().all(|d| REMOTE.contains(&d.as_str())));

        prop_assert_eq!(submission.new_files.len(), set.pending().len());
        prop_assert_eq!(registry.live_count(), set.pending().len());
    }

    #[test]
    fn double_toggle_restores_membership(
        ops in prop::collection::vec(op(), 0..30),
        target in 0usize..REMOTE.len(),
    ) {
        let mut set = AttachmentSet::from_remote(PreviewRegistry::new(), REMOTE);
        let mut expected = Vec::new();
        apply(&mut set, &ops, &mut expected);

        let reference = REMOTE[target];
        let was_marked = set.is_marked_for_deletion(reference);
        let before: HashSet<String> = set.deletions().iter().cloned().collect();

        set.toggle_deletion(reference);
        prop_assert_ne!(set.is_marked_for_deletion(reference), was_marked);
        set.toggle_deletion(reference);

        let after: HashSet<String> = set.deletions().iter().cloned().collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(set.is_marked_for_deletion(reference), was_marked);
    }

    #[test]
    fn dropping_set_releases_every_preview(ops in prop::collection::vec(op(), 0..30)) {
        let registry = PreviewRegistry::new();
        {
            let mut set = AttachmentSet::from_remote(registry.clone(), REMOTE);
            let mut expected = Vec::new();
            apply(&mut set, &ops, &mut expected);
        }
        prop_assert_eq!(registry.live_count(), 0);
    }
}
