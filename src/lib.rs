#![recursion_limit = "256"]

#[macro_use]
extern crate derive_builder;
extern crate pest;
extern crate pest_derive;
#[macro_use]
extern crate quick_error;
#[macro_use]
pub extern crate slog;
extern crate slog_stdlog;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapter;
pub mod clock;
pub mod config;
pub mod core;
pub mod dataset;
pub mod errors;
pub mod log;
pub mod ordering;
pub mod parsers;
pub mod properties;
pub mod scanner;
pub mod transaction;

pub use adapter::{AdapterError, Open3Adapter, ZfsAdapter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ZfsCoreConfig, ZfsCoreConfigBuilder};
pub use core::{
    ZfsCore, BOOTFS_DATASETS_PROPERTY, BOOTFS_PROPERTY, CANMOUNT_PROPERTY, LAST_USED_PROPERTY,
    MOUNTED_PROPERTY, MOUNTPOINT_PROPERTY,
};
pub use dataset::{CanMount, Dataset, DatasetNameExt, PropertySource, TrackedProperty};
pub use errors::{Error, ErrorKind, Result};
pub use log::GlobalLogger;
pub use properties::{AuthorizedProperty, PropertyClass, PropertyRules};
pub use scanner::Scan;
pub use transaction::Transaction;
