//! Name parsing for ZFS dataset paths.
//!
//! Dataset lineage is carried entirely in the name string: a snapshot's
//! parent, a dataset's pool, and a dataset's own parent are all derived by
//! string-prefix queries rather than materialized pointers, so there's
//! nothing to keep in sync and no possibility of a dangling reference.

/// Extension methods for ZFS dataset/snapshot names (e.g. `rpool/ROOT/ubuntu_1234`,
/// `rpool/ROOT/ubuntu_1234@snap_r1`).
pub trait DatasetNameExt {
    /// The pool root, i.e. the first `/`-separated path component.
    fn pool(&self) -> Option<&str>;

    /// `true` if the name contains `@` (is a snapshot).
    fn is_snapshot(&self) -> bool { self.snapshot_short_name().is_some() }

    /// The part of the name after `@`, for snapshots.
    fn snapshot_short_name(&self) -> Option<&str>;

    /// The dataset name this snapshot belongs to (the part before `@`).
    fn snapshot_parent(&self) -> Option<&str>;

    /// The parent dataset by `/`-path, or `None` for a pool root.
    ///
    /// For a snapshot this is the parent of its dataset, not the dataset itself.
    fn parent_dataset(&self) -> Option<&str>;

    /// The final `/`-separated path segment, with any `@snapshot` suffix stripped.
    fn final_segment(&self) -> &str;

    /// `true` if this name has exactly one `@`, a non-empty short name, and a
    /// non-empty dataset prefix.
    fn is_valid_snapshot_name(&self) -> bool;
}

impl DatasetNameExt for str {
    fn pool(&self) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        let base = self.split('@').next().unwrap_or(self);
        base.split('/').next().filter(|s| !s.is_empty())
    }

    fn snapshot_short_name(&self) -> Option<&str> {
        let mut parts = self.rsplitn(2, '@');
        let short = parts.next()?;
        let rest = parts.next();
        rest.map(|_| short)
    }

    fn snapshot_parent(&self) -> Option<&str> {
        let mut parts = self.splitn(2, '@');
        let dataset = parts.next()?;
        parts.next().map(|_| dataset)
    }

    fn parent_dataset(&self) -> Option<&str> {
        let dataset = self.snapshot_parent().unwrap_or(self);
        let (parent, _) = dataset.rsplit_once('/')?;
        Some(parent)
    }

    fn final_segment(&self) -> &str {
        let dataset = self.snapshot_parent().unwrap_or(self);
        dataset.rsplit('/').next().unwrap_or(dataset)
    }

    fn is_valid_snapshot_name(&self) -> bool {
        let mut parts = self.splitn(2, '@');
        let dataset = parts.next().unwrap_or("");
        match parts.next() {
            Some(short) => !dataset.is_empty() && !short.is_empty() && !short.contains('@'),
            None => false,
        }
    }
}

impl DatasetNameExt for String {
    fn pool(&self) -> Option<&str> { self.as_str().pool() }

    fn snapshot_short_name(&self) -> Option<&str> { self.as_str().snapshot_short_name() }

    fn snapshot_parent(&self) -> Option<&str> { self.as_str().snapshot_parent() }

    fn parent_dataset(&self) -> Option<&str> { self.as_str().parent_dataset() }

    fn final_segment(&self) -> &str { self.as_str().final_segment() }

    fn is_valid_snapshot_name(&self) -> bool { self.as_str().is_valid_snapshot_name() }
}

/// Derives a clone's target name from the dataset being cloned and a suffix.
///
/// If the dataset's final segment already ends in `_<suffix>` (an
/// alphanumeric run after the last underscore), that trailing suffix is
/// replaced; otherwise `_<suffix>` is appended. This mirrors how a cloned
/// root filesystem's name picks up a new revision suffix in place of the old
/// one (`ubuntu_1234` -> `ubuntu_5678`) rather than growing without bound.
pub fn derive_clone_name(dataset: &str, suffix: &str) -> String {
    let parent = dataset.parent_dataset();
    let segment = dataset.final_segment();

    let new_segment = match segment.rfind('_') {
        Some(pos) if segment[pos + 1..].chars().all(|c| c.is_ascii_alphanumeric())
            && !segment[pos + 1..].is_empty() =>
        {
            format!("{}_{}", &segment[..pos], suffix)
        },
        _ => format!("{}_{}", segment, suffix),
    };

    match parent {
        Some(parent) => format!("{}/{}", parent, new_segment),
        None => new_segment,
    }
}

#[cfg(test)]
mod test {
    use super::{derive_clone_name, DatasetNameExt};

    #[test]
    fn plain_dataset() {
        let name = "rpool/ROOT/ubuntu_1234";
        assert_eq!(Some("rpool"), name.pool());
        assert!(!name.is_snapshot());
        assert_eq!(None, name.snapshot_short_name());
        assert_eq!(None, name.snapshot_parent());
        assert_eq!(Some("rpool/ROOT"), name.parent_dataset());
        assert_eq!("ubuntu_1234", name.final_segment());
    }

    #[test]
    fn pool_root_has_no_parent() {
        assert_eq!(None, "rpool".parent_dataset());
        assert_eq!(Some("rpool"), "rpool".pool());
    }

    #[test]
    fn snapshot_name() {
        let name = "rpool/ROOT/ubuntu_1234@snap_r1";
        assert_eq!(Some("rpool"), name.pool());
        assert!(name.is_snapshot());
        assert_eq!(Some("snap_r1"), name.snapshot_short_name());
        assert_eq!(Some("rpool/ROOT/ubuntu_1234"), name.snapshot_parent());
        assert_eq!(Some("rpool/ROOT"), name.parent_dataset());
        assert_eq!("ubuntu_1234", name.final_segment());
        assert!(name.is_valid_snapshot_name());
    }

    #[test]
    fn rejects_multiple_at_signs() {
        assert!(!"rpool/x@a@b".is_valid_snapshot_name());
    }

    #[test]
    fn rejects_empty_short_name() {
        assert!(!"rpool/x@".is_valid_snapshot_name());
    }

    #[test]
    fn pool_root_snapshot() {
        let name = "rpool@snap1";
        assert_eq!(Some("rpool"), name.pool());
        assert_eq!(Some("rpool"), name.snapshot_parent());
        assert_eq!(None, name.parent_dataset());
    }

    #[test]
    fn clone_name_replaces_trailing_suffix() {
        assert_eq!("rpool/ROOT/ubuntu_5678", derive_clone_name("rpool/ROOT/ubuntu_1234", "5678"));
    }

    #[test]
    fn clone_name_appends_suffix_without_existing_one() {
        assert_eq!("rpool/ROOT/ubuntu_r1", derive_clone_name("rpool/ROOT/ubuntu", "r1"));
    }

    #[test]
    fn clone_name_of_snapshot_uses_its_dataset() {
        assert_eq!(
            "rpool/ROOT/ubuntu_5678",
            derive_clone_name("rpool/ROOT/ubuntu_1234@snap_r1", "5678")
        );
    }
}
