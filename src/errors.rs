//! Error taxonomy for the core's public verbs.
//!
//! One variant per error kind named in the design: a verb either succeeds
//! and the in-memory state changes in exactly the documented way, or it
//! fails with one of these and the state is provably unchanged.

use crate::adapter::AdapterError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// Named dataset/snapshot absent.
        NotFound(dataset: String) {
            display("dataset not found: {}", dataset)
        }
        /// Target name is already in use.
        AlreadyExists(dataset: String) {
            display("already exists: {}", dataset)
        }
        /// Empty names, `@` in a snapshot short name, root-pool clone, missing suffix, etc.
        InvalidArgument(reason: String) {
            display("invalid argument: {}", reason)
        }
        /// Attempt to set an unauthorized property, or set an inherited one without force.
        PropertyPolicy(reason: String) {
            display("property policy violation: {}", reason)
        }
        /// Destroy blocked by one or more live clones.
        HasClones(dataset: String, clones: Vec<String>) {
            display("{} has live clones: {:?}", dataset, clones)
        }
        /// A recursive operation requires a snapshot at an interior level that doesn't exist.
        MissingIntermediate(dataset: String) {
            display("missing intermediate snapshot at {}", dataset)
        }
        /// Destroy was called while a transaction is open.
        TransactionViolation(reason: String) {
            display("transaction violation: {}", reason)
        }
        /// Passthrough from the ZFS Adapter.
        Adapter(err: AdapterError) {
            cause(err)
            from()
            display("adapter error: {}", err)
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::PropertyPolicy(_) => ErrorKind::PropertyPolicy,
            Error::HasClones(..) => ErrorKind::HasClones,
            Error::MissingIntermediate(_) => ErrorKind::MissingIntermediate,
            Error::TransactionViolation(_) => ErrorKind::TransactionViolation,
            Error::Adapter(_) => ErrorKind::Adapter,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    PropertyPolicy,
    HasClones,
    MissingIntermediate,
    TransactionViolation,
    Adapter,
}
