//! The Scanner: turns Adapter calls into the in-memory [`Dataset`] model.
//!
//! Pure with respect to ZFS state — every other component's precondition
//! checks and post-condition verification run against a fresh scan, never
//! against memoized state.

use crate::adapter::ZfsAdapter;
use crate::clock::Clock;
use crate::config::ZfsCoreConfig;
use crate::dataset::{CanMount, Dataset, PropertySource, TrackedProperty};
use crate::errors::Result;
use crate::log::GlobalLogger;
use std::collections::BTreeMap;
use std::str::FromStr;

/// The full result of one scan: every dataset and snapshot across every pool.
#[derive(Debug, Clone)]
pub struct Scan {
    datasets: Vec<Dataset>,
    compare_sources: bool,
}

impl Scan {
    pub fn new(mut datasets: Vec<Dataset>) -> Self {
        datasets.sort();
        Scan { datasets, compare_sources: false }
    }

    pub fn datasets(&self) -> &[Dataset] { &self.datasets }

    pub fn find(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name() == name)
    }

    pub fn exists(&self, name: &str) -> bool { self.find(name).is_some() }

    /// Every dataset whose `origin` is exactly `snapshot`.
    pub fn clones_of(&self, snapshot: &str) -> Vec<&Dataset> {
        self.datasets.iter().filter(|d| d.origin() == snapshot).collect()
    }

    /// Opts into strict comparison: `PartialEq` also compares per-property sources.
    /// By default sources are excluded, since golden-file-style comparisons key on
    /// effective values, not on where each one came from.
    pub fn with_sources(mut self) -> Self {
        self.compare_sources = true;
        self
    }

    /// Rewrites every `last_used` within `window` seconds of `clock.now()` to `constant`,
    /// so golden-file-style comparisons don't flake on wall-clock time. Values outside the
    /// window (e.g. a dataset untouched for years) are left alone — a stale timestamp is
    /// itself meaningful and shouldn't collapse into the same bucket as "just touched".
    pub fn normalizing_last_used(mut self, clock: &dyn Clock, window: i64, constant: i64) -> Self {
        let now = clock.now();
        for dataset in &mut self.datasets {
            if (now - *dataset.last_used()).abs() <= window {
                dataset.set_last_used(constant);
            }
        }
        self
    }
}

impl PartialEq for Scan {
    fn eq(&self, other: &Self) -> bool {
        if self.datasets.len() != other.datasets.len() {
            return false;
        }
        self.datasets.iter().zip(other.datasets.iter()).all(|(a, b)| {
            if self.compare_sources || other.compare_sources {
                a == b
            } else {
                a.name() == b.name()
                    && a.mountpoint() == b.mountpoint()
                    && a.canmount() == b.canmount()
                    && a.mounted() == b.mounted()
                    && a.bootfs() == b.bootfs()
                    && a.last_used() == b.last_used()
                    && a.bootfs_datasets() == b.bootfs_datasets()
                    && a.origin() == b.origin()
            }
        })
    }
}

pub struct Scanner;

impl Scanner {
    pub fn scan(adapter: &dyn ZfsAdapter, config: &ZfsCoreConfig) -> Result<Scan> {
        let logger = GlobalLogger::get().new(o!("module" => "scanner"));
        let mut datasets = Vec::new();

        for pool in adapter.pools()? {
            debug!(logger, "scanning pool"; "pool" => &pool);
            let mut names = vec![pool.clone()];
            names.extend(adapter.children(&pool, true)?);

            for name in names {
                let props = adapter.properties(&name)?;
                trace!(logger, "scanned dataset"; "dataset" => &name);
                datasets.push(build_dataset(name, props, config));
            }
        }

        Ok(Scan::new(datasets))
    }
}

fn build_dataset(
    name: String,
    props: BTreeMap<String, (String, PropertySource)>,
    config: &ZfsCoreConfig,
) -> Dataset {
    let mountpoint = value_of(&props, "mountpoint");
    let canmount = props
        .get("canmount")
        .and_then(|(v, _)| CanMount::from_str(v).ok())
        .unwrap_or_default();
    let mounted = value_of(&props, "mounted") == "yes";
    let bootfs = value_of(&props, &config.bootfs_property) == "yes";
    let last_used = props
        .get(&config.last_used_property)
        .and_then(|(v, _)| v.parse::<i64>().ok())
        .unwrap_or(0);
    let bootfs_datasets = value_of(&props, &config.bootfs_datasets_property);
    let origin = value_of(&props, "origin");

    let mut sources = BTreeMap::new();
    insert_source(&mut sources, &props, "mountpoint", TrackedProperty::MountPoint);
    insert_source(&mut sources, &props, "canmount", TrackedProperty::CanMount);
    insert_source(&mut sources, &props, "mounted", TrackedProperty::Mounted);
    insert_source(&mut sources, &props, &config.bootfs_property, TrackedProperty::Bootfs);
    insert_source(&mut sources, &props, &config.last_used_property, TrackedProperty::LastUsed);
    insert_source(
        &mut sources,
        &props,
        &config.bootfs_datasets_property,
        TrackedProperty::BootfsDatasets,
    );
    insert_source(&mut sources, &props, "origin", TrackedProperty::Origin);

    Dataset::new(name, mountpoint, canmount, mounted, bootfs, last_used, bootfs_datasets, origin, sources)
}

fn value_of(props: &BTreeMap<String, (String, PropertySource)>, key: &str) -> String {
    props.get(key).map(|(v, _)| v.clone()).unwrap_or_default()
}

fn insert_source(
    sources: &mut BTreeMap<TrackedProperty, PropertySource>,
    props: &BTreeMap<String, (String, PropertySource)>,
    key: &str,
    tracked: TrackedProperty,
) {
    let source = props.get(key).map(|(_, s)| s.clone()).unwrap_or(PropertySource::None);
    sources.insert(tracked, source);
}
