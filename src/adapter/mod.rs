//! The ZFS Adapter: a thin, opaque capability wrapper around the host ZFS subsystem.
//!
//! The core only ever talks to ZFS through this trait. The shipped
//! implementation ([`Open3Adapter`]) shells out to `zfs(8)`; nothing above
//! this module knows or cares how a primitive verb is actually carried out.

pub mod open3;
pub use open3::Open3Adapter;

#[cfg(test)]
pub(crate) mod mock;

use crate::dataset::PropertySource;
use std::collections::BTreeMap;

pub type AdapterResult<T, E = AdapterError> = std::result::Result<T, E>;

quick_error! {
    /// Errors surfaced by the ZFS Adapter. The Operation Engine wraps these in
    /// [`crate::errors::Error::Adapter`] and otherwise treats them as opaque.
    #[derive(Debug)]
    pub enum AdapterError {
        /// `zfs` not found in `PATH`.
        CommandNotFound {
            display("zfs command not found in PATH")
        }
        Io(err: std::io::Error) {
            cause(err)
            from()
            display("I/O error talking to zfs: {}", err)
        }
        DatasetNotFound(dataset: String) {
            display("dataset not found: {}", dataset)
        }
        /// `zfs` refused because `dataset` already exists.
        AlreadyExists(dataset: String) {
            display("already exists: {}", dataset)
        }
        /// `zfs` refused to destroy `dataset` because it has live clones.
        HasClones(dataset: String) {
            display("{} has live clones", dataset)
        }
        /// `zfs` exited non-zero with stderr text the grammar didn't recognize.
        Unrecognized(stderr: String) {
            display("unrecognized zfs error: {}", stderr)
        }
        /// The adapter couldn't parse `zfs`'s stdout into the expected shape.
        Parse(reason: String) {
            display("failed to parse zfs output: {}", reason)
        }
    }
}

/// Per-property value plus its reported source, as returned by [`ZfsAdapter::properties`].
pub type PropertyMap = BTreeMap<String, (String, PropertySource)>;

/// Capability interface the core depends on for every primitive ZFS verb.
pub trait ZfsAdapter {
    /// Pool roots — depth-zero datasets.
    fn pools(&self) -> AdapterResult<Vec<String>>;

    /// Every filesystem, volume, and snapshot under `dataset`, optionally recursive.
    /// Does not include `dataset` itself.
    fn children(&self, dataset: &str, recursive: bool) -> AdapterResult<Vec<String>>;

    /// Raw property values and their sources, verbatim from ZFS.
    fn properties(&self, dataset: &str) -> AdapterResult<PropertyMap>;

    /// Atomic at the ZFS level for `recursive = false`; for `recursive = true`,
    /// creates one snapshot per descendant simultaneously.
    fn create_snapshot(&self, parent: &str, snap_name: &str, recursive: bool) -> AdapterResult<()>;

    /// Creates `target` as a clone of `snapshot`, applying `properties` at creation time.
    fn clone_snapshot(
        &self,
        snapshot: &str,
        target: &str,
        properties: &BTreeMap<String, String>,
    ) -> AdapterResult<()>;

    /// Reverses the origin relationship between `dataset` and its origin snapshot's
    /// lineage.
    fn promote(&self, dataset: &str) -> AdapterResult<()>;

    /// Destroys exactly one dataset or snapshot. Fails if it has live clones.
    fn destroy(&self, dataset: &str) -> AdapterResult<()>;

    fn set_property(&self, dataset: &str, name: &str, value: &str) -> AdapterResult<()>;

    fn inherit_property(&self, dataset: &str, name: &str) -> AdapterResult<()>;
}
