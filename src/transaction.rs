//! Transaction Manager: an optional LIFO revert stack behind the core's five
//! mutating verbs.
//!
//! `Transaction` is a scope guard. Every mutating verb computes its inverse
//! regardless of whether transactions are enabled; only an enabled
//! transaction actually keeps the stack, so the cost of tracking is paid
//! only by embedders who asked for it.

use crate::adapter::ZfsAdapter;
use crate::dataset::PropertySource;
use crate::log::GlobalLogger;
use slog::Logger;
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone)]
pub(crate) enum UndoStep {
    /// Destroy each name in order — already arranged leaf-first by the caller.
    DestroyMany(Vec<String>),
    Promote(String),
    SetProperty {
        dataset: String,
        name: String,
        previous_source: PropertySource,
        previous_value: String,
    },
}

/// Scope guard for one transactional lifetime. Exactly one of [`Transaction::done`]
/// or [`Transaction::cancel`] must be called before it goes out of scope.
pub struct Transaction<'a> {
    adapter: &'a dyn ZfsAdapter,
    enabled: bool,
    stack: RefCell<Vec<UndoStep>>,
    finished: Cell<bool>,
    logger: Logger,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(adapter: &'a dyn ZfsAdapter, enabled: bool) -> Self {
        Transaction {
            adapter,
            enabled,
            stack: RefCell::new(Vec::new()),
            finished: Cell::new(false),
            logger: GlobalLogger::get().new(o!("module" => "transaction")),
        }
    }

    pub(crate) fn push(&self, step: UndoStep) {
        if self.enabled {
            self.stack.borrow_mut().push(step);
        }
    }

    pub(crate) fn is_open(&self) -> bool { self.enabled && !self.stack.borrow().is_empty() }

    /// Discards the revert stack; the transaction is considered committed.
    pub fn done(&self) {
        self.finished.set(true);
        self.stack.borrow_mut().clear();
    }

    /// Pops and applies each inverse step in LIFO order, best-effort. Failures are
    /// logged and do not stop the unwind.
    pub fn cancel(&self) {
        self.finished.set(true);
        let mut stack = self.stack.borrow_mut();
        while let Some(step) = stack.pop() {
            if let Err(e) = self.apply(&step) {
                warn!(self.logger, "revert step failed"; "error" => format_args!("{}", e));
            }
        }
    }

    fn apply(&self, step: &UndoStep) -> Result<(), crate::adapter::AdapterError> {
        match step {
            UndoStep::DestroyMany(names) => {
                for name in names {
                    self.adapter.destroy(name)?;
                }
                Ok(())
            },
            UndoStep::Promote(dataset) => self.adapter.promote(dataset),
            UndoStep::SetProperty { dataset, name, previous_source, previous_value } => {
                match previous_source {
                    PropertySource::Local => self.adapter.set_property(dataset, name, previous_value),
                    PropertySource::Inherited(_) | PropertySource::Default | PropertySource::None => {
                        self.adapter.inherit_property(dataset, name)
                    },
                }
            },
        }
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if self.enabled && !self.finished.get() {
            warn!(self.logger, "transaction dropped without done() or cancel()");
        }
    }
}
