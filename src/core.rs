//! The Operation Engine: the five mutating verbs plus the read-only `scan`.
//!
//! Every verb shares one prologue — lock, re-scan, validate — and one
//! guarantee: on any validation failure the in-memory state and ZFS itself
//! are both left exactly as they were.

use crate::adapter::ZfsAdapter;
use crate::config::ZfsCoreConfig;
use crate::dataset::{derive_clone_name, CanMount, DatasetNameExt, PropertySource};
use crate::errors::{Error, Result};
use crate::log::GlobalLogger;
use crate::properties::{PropertyClass, PropertyRules};
use crate::scanner::{Scan, Scanner};
use crate::transaction::{Transaction, UndoStep};
use slog::Logger;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const CANMOUNT_PROPERTY: &str = "canmount";
pub const MOUNTPOINT_PROPERTY: &str = "mountpoint";
pub const MOUNTED_PROPERTY: &str = "mounted";
/// Default native property name backing [`crate::dataset::TrackedProperty::Bootfs`].
/// Overridable per-core via [`ZfsCoreConfig::bootfs_property`].
pub const BOOTFS_PROPERTY: &str = "bootfs";
/// Default user-property name backing [`crate::dataset::TrackedProperty::BootfsDatasets`].
/// Overridable per-core via [`ZfsCoreConfig::bootfs_datasets_property`].
pub const BOOTFS_DATASETS_PROPERTY: &str = "org.zsys:bootfs-datasets";
/// Default property name backing [`crate::dataset::TrackedProperty::LastUsed`] — ZFS's own
/// `creation` property. Overridable per-core via [`ZfsCoreConfig::last_used_property`].
pub const LAST_USED_PROPERTY: &str = "creation";

/// Sentinel value for `SetProperty` signaling "clear this property" (inherit or
/// remove it, depending on its class).
pub const CLEAR_VALUE: &str = "";

pub struct ZfsCore {
    adapter: Box<dyn ZfsAdapter>,
    config: ZfsCoreConfig,
    lock: Mutex<()>,
    logger: Logger,
}

impl ZfsCore {
    pub fn new(adapter: Box<dyn ZfsAdapter>, config: ZfsCoreConfig) -> Self {
        let logger = GlobalLogger::get().new(o!("module" => "core"));
        ZfsCore { adapter, config, lock: Mutex::new(()), logger }
    }

    pub fn config(&self) -> &ZfsCoreConfig { &self.config }

    /// Opens a transactional scope. The transaction inherits the `transactions`
    /// flag from this core's config; when that flag is `false`, pushes onto it
    /// are no-ops and `done`/`cancel` exist purely for lifecycle symmetry.
    pub fn begin_transaction(&self) -> Transaction<'_> {
        Transaction::new(self.adapter.as_ref(), self.config.transactions)
    }

    /// A read-only snapshot of every dataset and snapshot in every pool.
    pub fn scan(&self) -> Result<Scan> { Ok(Scanner::scan(self.adapter.as_ref(), &self.config)?) }

    pub fn snapshot(
        &self,
        tx: &Transaction,
        dataset: &str,
        snap_name: &str,
        recursive: bool,
    ) -> Result<()> {
        let _guard = self.lock.lock().expect("core lock poisoned");

        if snap_name.is_empty() || snap_name.contains('@') {
            return Err(Error::InvalidArgument(format!("invalid snapshot name: {}", snap_name)));
        }

        let scan = self.scan()?;
        let target = scan.find(dataset).ok_or_else(|| Error::NotFound(dataset.to_string()))?;
        if target.is_snapshot() {
            return Err(Error::InvalidArgument(format!("{} is a snapshot", dataset)));
        }

        let mut targets = vec![dataset.to_string()];
        if recursive {
            targets.extend(descendants_of(&scan, dataset));
        }
        for t in &targets {
            let full = format!("{}@{}", t, snap_name);
            if scan.exists(&full) {
                return Err(Error::AlreadyExists(full));
            }
        }

        debug!(self.logger, "snapshot"; "dataset" => dataset, "name" => snap_name, "recursive" => recursive);
        self.adapter.create_snapshot(dataset, snap_name, recursive)?;

        let mut destroy_order: Vec<String> =
            targets.iter().map(|t| format!("{}@{}", t, snap_name)).collect();
        destroy_order.reverse();
        tx.push(UndoStep::DestroyMany(destroy_order));
        Ok(())
    }

    pub fn clone(
        &self,
        tx: &Transaction,
        snapshot: &str,
        suffix: &str,
        skip_bootfs: bool,
        recursive: bool,
    ) -> Result<String> {
        let _guard = self.lock.lock().expect("core lock poisoned");

        if !snapshot.is_snapshot() {
            return Err(Error::InvalidArgument(format!("{} is not a snapshot", snapshot)));
        }
        if suffix.is_empty() {
            return Err(Error::InvalidArgument("suffix must not be empty".to_string()));
        }

        let scan = self.scan()?;
        let source_snap = scan.find(snapshot).ok_or_else(|| Error::NotFound(snapshot.to_string()))?;
        let source_dataset_name =
            source_snap.snapshot_parent().expect("scan entry is a snapshot").to_string();
        let source_dataset = scan
            .find(&source_dataset_name)
            .ok_or_else(|| Error::NotFound(source_dataset_name.clone()))?;

        if source_dataset.parent_dataset().is_none() {
            return Err(Error::InvalidArgument("cannot clone a pool root".to_string()));
        }

        let target_root = derive_clone_name(&source_dataset_name, suffix);
        if scan.exists(&target_root) {
            return Err(Error::AlreadyExists(target_root));
        }

        let short_name = source_snap.name().snapshot_short_name().unwrap_or("").to_string();

        let mut plan = vec![(source_dataset_name.clone(), target_root.clone())];
        if recursive {
            for descendant in descendants_of(&scan, &source_dataset_name) {
                let descendant_snap = format!("{}@{}", descendant, short_name);
                if !scan.exists(&descendant_snap) {
                    if has_descendant_with_snapshot(&scan, &descendant, &short_name) {
                        return Err(Error::MissingIntermediate(descendant));
                    }
                    continue;
                }
                let relative = descendant
                    .strip_prefix(&format!("{}/", source_dataset_name))
                    .unwrap_or(&descendant);
                plan.push((descendant, format!("{}/{}", target_root, relative)));
            }
        }

        let mut created = Vec::new();
        let mut skipped_branches: Vec<String> = Vec::new();
        for (source, target) in &plan {
            if skip_bootfs {
                let under_skipped_branch = skipped_branches
                    .iter()
                    .any(|root| source.starts_with(&format!("{}/", root)));
                if under_skipped_branch {
                    continue;
                }
                if scan.find(source).map(|d| *d.bootfs()).unwrap_or(false) {
                    skipped_branches.push(source.clone());
                    continue;
                }
            }
            let source_ds = scan.find(source).expect("plan entries come from scan");
            let mut props = BTreeMap::new();
            let new_canmount = match source_ds.canmount() {
                CanMount::Off => CanMount::Off,
                CanMount::NoAuto => CanMount::NoAuto,
                CanMount::On => CanMount::NoAuto,
            };
            props.insert(CANMOUNT_PROPERTY.to_string(), new_canmount.as_ref().to_string());
            if source_ds.source_of(crate::dataset::TrackedProperty::MountPoint).is_local() {
                props.insert(MOUNTPOINT_PROPERTY.to_string(), source_ds.mountpoint().clone());
            }

            let source_snap_name = format!("{}@{}", source, short_name);
            debug!(self.logger, "clone"; "snapshot" => &source_snap_name, "target" => target);
            self.adapter.clone_snapshot(&source_snap_name, target, &props)?;
            created.push(target.clone());
        }

        let mut destroy_order = created.clone();
        destroy_order.reverse();
        tx.push(UndoStep::DestroyMany(destroy_order));
        Ok(target_root)
    }

    pub fn promote(&self, tx: &Transaction, dataset: &str) -> Result<()> {
        let _guard = self.lock.lock().expect("core lock poisoned");

        let scan = self.scan()?;
        let target = scan.find(dataset).ok_or_else(|| Error::NotFound(dataset.to_string()))?;
        if target.is_snapshot() {
            return Err(Error::InvalidArgument(format!("{} is a snapshot", dataset)));
        }
        if !target.has_origin() {
            return Ok(());
        }

        // Promote is an involution between whichever side currently holds the
        // origin: after promoting `dataset`, its former origin dataset is the
        // one left holding a (reversed) origin, so undoing means promoting
        // *that* dataset back — not `dataset` again, which is no longer a clone.
        let former_origin_dataset =
            target.origin().snapshot_parent().unwrap_or(target.origin()).to_string();

        debug!(self.logger, "promote"; "dataset" => dataset);
        self.adapter.promote(dataset)?;
        // Pushed as soon as this step succeeds, not after the whole verb: a later
        // descendant promote can still fail, and partial-promote recovery needs
        // this inverse on the stack regardless of how the rest turns out.
        tx.push(UndoStep::Promote(former_origin_dataset));

        for descendant in descendants_of(&scan, dataset) {
            let d = scan.find(&descendant).expect("from scan");
            if !d.has_origin() {
                continue;
            }
            let origin_dataset = d.origin().snapshot_parent().unwrap_or(d.origin()).to_string();
            let origin_in_subtree = origin_dataset == dataset
                || origin_dataset.starts_with(&format!("{}/", dataset));
            if origin_in_subtree {
                continue;
            }
            self.adapter.promote(&descendant)?;
        }

        Ok(())
    }

    pub fn destroy(&self, tx: &Transaction, dataset: &str) -> Result<()> {
        let _guard = self.lock.lock().expect("core lock poisoned");

        if tx.is_open() {
            return Err(Error::TransactionViolation(
                "destroy is not allowed inside an open transaction".to_string(),
            ));
        }

        let scan = self.scan()?;
        let target = scan.find(dataset).ok_or_else(|| Error::NotFound(dataset.to_string()))?;

        let mut subtree = vec![dataset.to_string()];
        if !target.is_snapshot() {
            subtree.extend(descendants_of(&scan, dataset));
        }

        for name in &subtree {
            if let Some(d) = scan.find(name) {
                if d.is_snapshot() {
                    let clones = scan.clones_of(name);
                    if !clones.is_empty() {
                        return Err(Error::HasClones(
                            dataset.to_string(),
                            clones.into_iter().map(|c| c.name().clone()).collect(),
                        ));
                    }
                } else {
                    for snap in snapshots_of(&scan, name) {
                        let clones = scan.clones_of(&snap);
                        if !clones.is_empty() {
                            return Err(Error::HasClones(
                                dataset.to_string(),
                                clones.into_iter().map(|c| c.name().clone()).collect(),
                            ));
                        }
                    }
                }
            }
        }

        let mut filesystems_leaf_first = subtree.clone();
        filesystems_leaf_first.reverse();

        let mut destroy_order = Vec::new();
        for name in &filesystems_leaf_first {
            match scan.find(name) {
                Some(d) if d.is_snapshot() => destroy_order.push(name.clone()),
                _ => {
                    destroy_order.extend(snapshots_of(&scan, name));
                    destroy_order.push(name.clone());
                },
            }
        }

        debug!(self.logger, "destroy"; "dataset" => dataset);
        for name in &destroy_order {
            self.adapter.destroy(name)?;
        }
        Ok(())
    }

    pub fn set_property(
        &self,
        tx: &Transaction,
        dataset: &str,
        name: &str,
        value: &str,
        force: bool,
    ) -> Result<()> {
        let _guard = self.lock.lock().expect("core lock poisoned");

        let class = PropertyRules::classify(name);
        if matches!(class, PropertyClass::Forbidden) {
            return Err(Error::PropertyPolicy(format!("{} may not be set", name)));
        }

        let scan = self.scan()?;
        let target = scan.find(dataset).ok_or_else(|| Error::NotFound(dataset.to_string()))?;
        if target.is_snapshot() {
            return Err(Error::InvalidArgument(format!("{} is a snapshot", dataset)));
        }

        let current_properties = self.adapter.properties(dataset)?;
        let (previous_value, previous_source) = current_properties
            .get(name)
            .map(|(v, s)| (v.clone(), s.clone()))
            .unwrap_or((String::new(), PropertySource::None));
        if previous_source.is_inherited() && !force {
            return Err(Error::PropertyPolicy(format!(
                "{} is inherited on {}; pass force to override",
                name, dataset
            )));
        }

        debug!(self.logger, "set_property"; "dataset" => dataset, "name" => name);
        if value == CLEAR_VALUE {
            self.adapter.inherit_property(dataset, name)?;
        } else {
            self.adapter.set_property(dataset, name, value)?;
        }

        tx.push(UndoStep::SetProperty {
            dataset: dataset.to_string(),
            name: name.to_string(),
            previous_source,
            previous_value,
        });
        Ok(())
    }
}

fn descendants_of(scan: &Scan, dataset: &str) -> Vec<String> {
    let prefix = format!("{}/", dataset);
    scan.datasets()
        .iter()
        .filter(|d| !d.is_snapshot() && d.name().starts_with(&prefix))
        .map(|d| d.name().clone())
        .collect()
}

fn snapshots_of(scan: &Scan, dataset: &str) -> Vec<String> {
    let prefix = format!("{}@", dataset);
    scan.datasets()
        .iter()
        .filter(|d| d.name().starts_with(&prefix))
        .map(|d| d.name().clone())
        .collect()
}

fn has_descendant_with_snapshot(scan: &Scan, dataset: &str, snap_name: &str) -> bool {
    let prefix = format!("{}/", dataset);
    scan.datasets().iter().any(|d| {
        !d.is_snapshot()
            && d.name().starts_with(&prefix)
            && scan.exists(&format!("{}@{}", d.name(), snap_name))
    })
}
