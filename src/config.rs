//! Construction-time configuration surface for [`crate::core::ZfsCore`].

use derive_builder::Builder;

/// - `transactions` toggles whether mutating verbs keep a revert stack.
/// - the three `*_property` fields let an embedder point the namespaced
///   bootfs/bootfs-datasets/last-used properties at whatever user-property
///   keys their own tooling already uses, rather than hardcoding one vendor's
///   namespace into the core.
#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct ZfsCoreConfig {
    #[builder(default = "false")]
    pub transactions: bool,

    #[builder(default = "\"bootfs\".to_string()")]
    pub bootfs_property: String,

    #[builder(default = "\"org.zsys:bootfs-datasets\".to_string()")]
    pub bootfs_datasets_property: String,

    #[builder(default = "\"creation\".to_string()")]
    pub last_used_property: String,
}

impl Default for ZfsCoreConfig {
    fn default() -> Self {
        ZfsCoreConfigBuilder::default().build().expect("all fields default")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_enables_no_transactions() {
        let config = ZfsCoreConfig::default();
        assert!(!config.transactions);
        assert_eq!("bootfs", config.bootfs_property);
        assert_eq!("creation", config.last_used_property);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = ZfsCoreConfigBuilder::default()
            .transactions(true)
            .bootfs_property("local:bootfs")
            .build()
            .unwrap();
        assert!(config.transactions);
        assert_eq!("local:bootfs", config.bootfs_property);
    }
}
