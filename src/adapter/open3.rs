//! The shipped [`ZfsAdapter`] implementation: shells out to `zfs(8)` and parses its
//! tabular stdout and stderr with the grammar in [`crate::parsers::zfs`].

use crate::adapter::{AdapterError, AdapterResult, PropertyMap, ZfsAdapter};
use crate::dataset::PropertySource;
use crate::log::GlobalLogger;
use crate::parsers::zfs::{Rule, ZfsParser};
use pest::Parser;
use slog::Logger;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::process::{Command, Output};

pub struct Open3Adapter {
    cmd_name: OsString,
    logger: Logger,
}

impl Open3Adapter {
    pub fn new() -> Self {
        let logger = GlobalLogger::get().new(o!("module" => "adapter", "impl" => "open3"));
        let cmd_name = std::env::var_os("ZFS_CMD").unwrap_or_else(|| "zfs".into());
        Open3Adapter { cmd_name, logger }
    }

    fn zfs(&self) -> Command { Command::new(&self.cmd_name) }

    fn run(&self, mut cmd: Command) -> AdapterResult<Output> {
        debug!(self.logger, "executing"; "cmd" => format_args!("{:?}", cmd));
        let out = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AdapterError::CommandNotFound
            } else {
                AdapterError::from(e)
            }
        })?;
        if out.status.success() {
            Ok(out)
        } else {
            Err(self.adapter_error_from_stderr(&out.stderr))
        }
    }

    fn adapter_error_from_stderr(&self, stderr: &[u8]) -> AdapterError {
        let text = String::from_utf8_lossy(stderr);
        let trimmed = text.trim();
        match ZfsParser::parse(Rule::error, trimmed) {
            Ok(mut pairs) => {
                let inner = pairs.next().unwrap().into_inner().next().unwrap();
                let dataset = inner.into_inner().next().map(|p| p.as_str().to_string());
                match inner.as_rule() {
                    Rule::dataset_not_found | Rule::permission_denied => {
                        AdapterError::DatasetNotFound(dataset.unwrap_or_default())
                    },
                    Rule::already_exists => AdapterError::AlreadyExists(dataset.unwrap_or_default()),
                    Rule::has_clones => AdapterError::HasClones(dataset.unwrap_or_default()),
                    _ => AdapterError::Unrecognized(trimmed.to_string()),
                }
            },
            Err(_) => AdapterError::Unrecognized(trimmed.to_string()),
        }
    }

    fn names_from_list_output(&self, out: &Output) -> AdapterResult<Vec<String>> {
        let stdout = String::from_utf8_lossy(&out.stdout);
        ZfsParser::parse(Rule::datasets, &stdout)
            .map(|mut pairs| {
                pairs
                    .next()
                    .unwrap()
                    .into_inner()
                    .map(|pair| pair.as_str().to_string())
                    .collect()
            })
            .map_err(|_| AdapterError::Parse(stdout.into_owned()))
    }
}

impl Default for Open3Adapter {
    fn default() -> Self { Open3Adapter::new() }
}

impl ZfsAdapter for Open3Adapter {
    fn pools(&self) -> AdapterResult<Vec<String>> {
        let mut z = self.zfs();
        z.args(&["list", "-H", "-o", "name", "-d", "0"]);
        let out = self.run(z)?;
        self.names_from_list_output(&out)
    }

    fn children(&self, dataset: &str, recursive: bool) -> AdapterResult<Vec<String>> {
        let mut z = self.zfs();
        z.args(&["list", "-H", "-o", "name", "-t", "filesystem,volume,snapshot"]);
        if recursive {
            z.arg("-r");
        } else {
            z.args(&["-d", "1"]);
        }
        z.arg(dataset);
        let out = self.run(z)?;
        let mut names = self.names_from_list_output(&out)?;
        names.retain(|n| n != dataset);
        Ok(names)
    }

    fn properties(&self, dataset: &str) -> AdapterResult<PropertyMap> {
        let mut z = self.zfs();
        z.args(&["get", "-Hp", "-o", "property,value,source", "all"]);
        z.arg(dataset);
        let out = self.run(z)?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        let mut pairs = ZfsParser::parse(Rule::properties, &stdout)
            .map_err(|_| AdapterError::Parse(stdout.clone().into_owned()))?;

        let mut map: PropertyMap = BTreeMap::new();
        for line in pairs.next().unwrap().into_inner() {
            let mut columns = line.into_inner();
            let name = columns.next().unwrap().as_str().to_string();
            let value = columns.next().unwrap().as_str().to_string();
            let source_text = columns.next().unwrap().as_str();
            let source = if let Some(rest) = source_text.strip_prefix("inherited from ") {
                PropertySource::Inherited(rest.to_string())
            } else if source_text == "local" {
                PropertySource::Local
            } else if source_text == "default" {
                PropertySource::Default
            } else {
                PropertySource::None
            };
            map.insert(name, (value, source));
        }
        Ok(map)
    }

    fn create_snapshot(&self, parent: &str, snap_name: &str, recursive: bool) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.arg("snapshot");
        if recursive {
            z.arg("-r");
        }
        z.arg(format!("{}@{}", parent, snap_name));
        self.run(z).map(|_| ())
    }

    fn clone_snapshot(
        &self,
        snapshot: &str,
        target: &str,
        properties: &BTreeMap<String, String>,
    ) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.arg("clone");
        for (name, value) in properties {
            z.arg("-o");
            z.arg(format!("{}={}", name, value));
        }
        z.arg(snapshot);
        z.arg(target);
        self.run(z).map(|_| ())
    }

    fn promote(&self, dataset: &str) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.args(&["promote", dataset]);
        self.run(z).map(|_| ())
    }

    fn destroy(&self, dataset: &str) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.args(&["destroy", dataset]);
        self.run(z).map(|_| ())
    }

    fn set_property(&self, dataset: &str, name: &str, value: &str) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.args(&["set", &format!("{}={}", name, value), dataset]);
        self.run(z).map(|_| ())
    }

    fn inherit_property(&self, dataset: &str, name: &str) -> AdapterResult<()> {
        let mut z = self.zfs();
        z.args(&["inherit", name, dataset]);
        self.run(z).map(|_| ())
    }
}
