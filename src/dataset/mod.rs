//! The in-memory dataset model: entities, lineage, and per-property source tracking.

pub mod pathext;
pub use pathext::{derive_clone_name, DatasetNameExt};

use getset::Getters;
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumString};

/// Where a property's effective value comes from.
///
/// Modeled as a sum type rather than a `local: bool` flag plus a name, so
/// "inherited but forced" is a structural branch the compiler can check
/// instead of an invariant callers have to remember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySource {
    /// Set directly on this dataset.
    Local,
    /// Inherited from the named strict ancestor (a `/`-path prefix, or the pool root).
    Inherited(String),
    /// Not set anywhere in the lineage; the ZFS-wide default is in effect.
    Default,
    /// The adapter reported no value at all (e.g. `origin` on a non-clone).
    None,
}

impl PropertySource {
    pub fn is_inherited(&self) -> bool { matches!(self, PropertySource::Inherited(_)) }

    pub fn is_local(&self) -> bool { matches!(self, PropertySource::Local) }
}

/// Controls whether a dataset may be auto-mounted (`on`), is explicitly prohibited
/// (`off`), or may be mounted only on demand (`noauto`).
#[derive(AsRefStr, EnumString, Display, Eq, PartialEq, Debug, Clone, Copy)]
pub enum CanMount {
    #[strum(serialize = "on")]
    On,
    #[strum(serialize = "off")]
    Off,
    #[strum(serialize = "noauto")]
    NoAuto,
}

impl Default for CanMount {
    fn default() -> Self { CanMount::On }
}

/// The closed set of properties this core tracks on every dataset, per the Scanner's
/// contract. Ordered so a `BTreeMap<TrackedProperty, _>` renders deterministically.
#[derive(AsRefStr, EnumString, Display, Eq, PartialEq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub enum TrackedProperty {
    #[strum(serialize = "mountpoint")]
    MountPoint,
    #[strum(serialize = "canmount")]
    CanMount,
    #[strum(serialize = "mounted")]
    Mounted,
    #[strum(serialize = "bootfs")]
    Bootfs,
    #[strum(serialize = "lastused")]
    LastUsed,
    #[strum(serialize = "bootfs_datasets")]
    BootfsDatasets,
    #[strum(serialize = "origin")]
    Origin,
}

/// A ZFS dataset or snapshot, as observed by the Scanner.
///
/// `is_snapshot`, `parent_dataset`, and `pool` are computed from `name` on
/// every call rather than cached, so there's exactly one source of truth
/// for lineage (see [`DatasetNameExt`]).
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Dataset {
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    mountpoint: String,
    #[getset(get = "pub")]
    canmount: CanMount,
    #[getset(get = "pub")]
    mounted: bool,
    #[getset(get = "pub")]
    bootfs: bool,
    #[getset(get = "pub")]
    last_used: i64,
    #[getset(get = "pub")]
    bootfs_datasets: String,
    /// Full name of the snapshot this dataset/snapshot derives from; empty for non-clones.
    #[getset(get = "pub")]
    origin: String,
    #[getset(get = "pub")]
    sources: BTreeMap<TrackedProperty, PropertySource>,
}

impl Dataset {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        mountpoint: String,
        canmount: CanMount,
        mounted: bool,
        bootfs: bool,
        last_used: i64,
        bootfs_datasets: String,
        origin: String,
        sources: BTreeMap<TrackedProperty, PropertySource>,
    ) -> Self {
        Dataset {
            name,
            mountpoint,
            canmount,
            mounted,
            bootfs,
            last_used,
            bootfs_datasets,
            origin,
            sources,
        }
    }

    pub fn is_snapshot(&self) -> bool { self.name.is_snapshot() }

    pub fn pool(&self) -> Option<&str> { self.name.pool() }

    /// The parent dataset by `/`-path; `None` for a pool root. For a snapshot this is
    /// the parent of the snapshot's own dataset.
    pub fn parent_dataset(&self) -> Option<&str> { self.name.parent_dataset() }

    /// The dataset this snapshot belongs to; `None` if this isn't a snapshot.
    pub fn snapshot_parent(&self) -> Option<&str> { self.name.snapshot_parent() }

    pub fn has_origin(&self) -> bool { !self.origin.is_empty() }

    pub fn source_of(&self, property: TrackedProperty) -> &PropertySource {
        self.sources.get(&property).unwrap_or(&PropertySource::None)
    }

    /// Used by [`crate::scanner::Scan::normalizing_last_used`] to collapse a timestamp
    /// into its golden-file constant; not exposed as a way to mutate scanned state otherwise.
    pub(crate) fn set_last_used(&mut self, value: i64) { self.last_used = value; }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dataset(name: &str) -> Dataset {
        Dataset::new(
            name.to_string(),
            String::new(),
            CanMount::On,
            false,
            false,
            0,
            String::new(),
            String::new(),
            BTreeMap::new(),
        )
    }

    #[test]
    fn derives_lineage_from_name() {
        let d = dataset("rpool/ROOT/ubuntu_1234");
        assert!(!d.is_snapshot());
        assert_eq!(Some("rpool"), d.pool());
        assert_eq!(Some("rpool/ROOT"), d.parent_dataset());
        assert_eq!(None, d.snapshot_parent());
    }

    #[test]
    fn derives_snapshot_lineage() {
        let d = dataset("rpool/ROOT/ubuntu_1234@snap_r1");
        assert!(d.is_snapshot());
        assert_eq!(Some("rpool/ROOT/ubuntu_1234"), d.snapshot_parent());
    }

    #[test]
    fn default_source_is_none() {
        let d = dataset("rpool");
        assert_eq!(&PropertySource::None, d.source_of(TrackedProperty::Origin));
    }
}
