pub mod zfs;
pub use zfs::{Rule, ZfsParser};
