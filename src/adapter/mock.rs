//! An in-memory [`ZfsAdapter`] double for exercising the core without a real pool.

use crate::adapter::{AdapterError, AdapterResult, PropertyMap, ZfsAdapter};
use crate::dataset::PropertySource;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub(crate) struct MockDataset {
    pub properties: BTreeMap<String, String>,
    /// Overrides the reported source for a property name, e.g. to simulate
    /// inheritance for the force-required precondition tests. Absent entries
    /// default to [`PropertySource::Local`].
    pub sources: BTreeMap<String, PropertySource>,
}

/// Keyed by full dataset/snapshot name. `children`/`pools` are derived from the
/// key set by `/`-prefix, mirroring how a real pool has no separate index.
pub(crate) struct MockAdapter {
    datasets: RefCell<BTreeMap<String, MockDataset>>,
    /// Datasets on which the next `promote` call should fail, simulating an
    /// adapter error partway through a multi-step verb.
    poisoned_promotes: RefCell<BTreeSet<String>>,
}

impl MockAdapter {
    pub(crate) fn new() -> Self {
        MockAdapter {
            datasets: RefCell::new(BTreeMap::new()),
            poisoned_promotes: RefCell::new(BTreeSet::new()),
        }
    }

    /// Makes `promote(dataset)` fail exactly once, so tests can exercise
    /// partial-failure recovery for multi-step verbs.
    pub(crate) fn poison_promote(&self, dataset: &str) {
        self.poisoned_promotes.borrow_mut().insert(dataset.to_string());
    }

    pub(crate) fn seed(&self, name: &str, properties: &[(&str, &str)]) {
        let mut ds = MockDataset::default();
        for (k, v) in properties {
            ds.properties.insert((*k).to_string(), (*v).to_string());
        }
        self.datasets.borrow_mut().insert(name.to_string(), ds);
    }

    /// Marks `property` on `dataset` as inherited from `from`, so tests can exercise the
    /// force-required-on-inherited precondition without a real ZFS pool's lineage.
    pub(crate) fn seed_inherited(&self, dataset: &str, property: &str, from: &str) {
        let mut datasets = self.datasets.borrow_mut();
        let ds = datasets.entry(dataset.to_string()).or_default();
        ds.sources.insert(property.to_string(), PropertySource::Inherited(from.to_string()));
    }

    fn exists(&self, name: &str) -> bool { self.datasets.borrow().contains_key(name) }

    fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{}/", name);
        self.datasets.borrow().keys().any(|k| k.starts_with(&prefix))
    }
}

impl ZfsAdapter for MockAdapter {
    fn pools(&self) -> AdapterResult<Vec<String>> {
        Ok(self
            .datasets
            .borrow()
            .keys()
            .filter(|k| !k.contains('/') && !k.contains('@'))
            .cloned()
            .collect())
    }

    fn children(&self, dataset: &str, recursive: bool) -> AdapterResult<Vec<String>> {
        if !self.exists(dataset) {
            return Err(AdapterError::DatasetNotFound(dataset.to_string()));
        }
        let prefix = format!("{}/", dataset);
        let snap_prefix = format!("{}@", dataset);
        Ok(self
            .datasets
            .borrow()
            .keys()
            .filter(|k| {
                if k.starts_with(&snap_prefix) {
                    return true;
                }
                if !k.starts_with(&prefix) {
                    return false;
                }
                if recursive {
                    return true;
                }
                let rest = &k[prefix.len()..];
                !rest.split('@').next().unwrap_or(rest).contains('/')
            })
            .cloned()
            .collect())
    }

    fn properties(&self, dataset: &str) -> AdapterResult<PropertyMap> {
        let datasets = self.datasets.borrow();
        let ds = datasets
            .get(dataset)
            .ok_or_else(|| AdapterError::DatasetNotFound(dataset.to_string()))?;
        Ok(ds
            .properties
            .iter()
            .map(|(k, v)| {
                let source = ds.sources.get(k).cloned().unwrap_or(PropertySource::Local);
                (k.clone(), (v.clone(), source))
            })
            .collect())
    }

    fn create_snapshot(&self, parent: &str, snap_name: &str, recursive: bool) -> AdapterResult<()> {
        if !self.exists(parent) {
            return Err(AdapterError::DatasetNotFound(parent.to_string()));
        }
        let targets: Vec<String> = if recursive {
            let prefix = format!("{}/", parent);
            let mut t: Vec<String> = self
                .datasets
                .borrow()
                .keys()
                .filter(|k| k.starts_with(&prefix) && !k.contains('@'))
                .cloned()
                .collect();
            t.push(parent.to_string());
            t
        } else {
            vec![parent.to_string()]
        };
        for target in targets {
            self.datasets
                .borrow_mut()
                .insert(format!("{}@{}", target, snap_name), MockDataset::default());
        }
        Ok(())
    }

    fn clone_snapshot(
        &self,
        snapshot: &str,
        target: &str,
        properties: &BTreeMap<String, String>,
    ) -> AdapterResult<()> {
        if !self.exists(snapshot) {
            return Err(AdapterError::DatasetNotFound(snapshot.to_string()));
        }
        if self.exists(target) {
            return Err(AdapterError::Unrecognized(format!("{} already exists", target)));
        }
        let mut ds = MockDataset::default();
        ds.properties.insert("origin".to_string(), snapshot.to_string());
        ds.properties.extend(properties.clone());
        self.datasets.borrow_mut().insert(target.to_string(), ds);
        Ok(())
    }

    fn promote(&self, dataset: &str) -> AdapterResult<()> {
        if self.poisoned_promotes.borrow_mut().remove(dataset) {
            return Err(AdapterError::Unrecognized(format!("poisoned promote: {}", dataset)));
        }
        let mut datasets = self.datasets.borrow_mut();
        if !datasets.contains_key(dataset) {
            return Err(AdapterError::DatasetNotFound(dataset.to_string()));
        }
        let origin = datasets.get(dataset).and_then(|ds| ds.properties.get("origin").cloned());
        if let Some(origin_snap) = origin {
            datasets.get_mut(dataset).unwrap().properties.remove("origin");
            let origin_dataset = origin_snap.split('@').next().unwrap_or(&origin_snap).to_string();
            if let Some(od) = datasets.get_mut(&origin_dataset) {
                od.properties.insert("origin".to_string(), format!("{}@promoted", dataset));
            }
        }
        Ok(())
    }

    fn destroy(&self, dataset: &str) -> AdapterResult<()> {
        if !self.exists(dataset) {
            return Err(AdapterError::DatasetNotFound(dataset.to_string()));
        }
        if self.has_children(dataset) {
            return Err(AdapterError::Unrecognized(format!(
                "cannot destroy '{}': filesystem has children",
                dataset
            )));
        }
        self.datasets.borrow_mut().remove(dataset);
        Ok(())
    }

    fn set_property(&self, dataset: &str, name: &str, value: &str) -> AdapterResult<()> {
        let mut datasets = self.datasets.borrow_mut();
        let ds = datasets
            .get_mut(dataset)
            .ok_or_else(|| AdapterError::DatasetNotFound(dataset.to_string()))?;
        ds.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn inherit_property(&self, dataset: &str, name: &str) -> AdapterResult<()> {
        let mut datasets = self.datasets.borrow_mut();
        let ds = datasets
            .get_mut(dataset)
            .ok_or_else(|| AdapterError::DatasetNotFound(dataset.to_string()))?;
        ds.properties.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seeded_pool_is_listed() {
        let adapter = MockAdapter::new();
        adapter.seed("rpool", &[]);
        adapter.seed("rpool/ROOT", &[]);
        assert_eq!(vec!["rpool".to_string()], adapter.pools().unwrap());
    }

    #[test]
    fn destroy_rejects_parent_with_children() {
        let adapter = MockAdapter::new();
        adapter.seed("rpool", &[]);
        adapter.seed("rpool/ROOT", &[]);
        assert!(adapter.destroy("rpool").is_err());
        assert!(adapter.destroy("rpool/ROOT").is_ok());
    }
}
