//! The storage-engine seam and the scoped transaction guard.

use crate::directive::DirectiveValue;
use thiserror::Error;
use tracing::warn;

/// A fault raised by the storage engine, classified into the two
/// conditions the protocol reacts to plus a catch-all.
///
/// Adapters perform this classification once, at the engine boundary;
/// the protocol only ever matches on the variant.
#[derive(Debug, Error)]
pub enum EngineFault {
    /// The file is not a recognized database. On an encrypted file
    /// this is what a wrong key looks like: the pages decrypt to
    /// noise and the header check fails.
    #[error("file is not a recognized database: {0}")]
    NotADatabase(String),

    /// The connection has no write permission.
    #[error("connection is read-only: {0}")]
    ReadOnly(String),

    /// Any other engine fault.
    #[error("{0}")]
    Other(String),
}

/// Capability the protocol requires from a storage-engine connection.
///
/// One implementor owns one connection; the protocol assumes
/// exclusive logical use of it for the duration of an invocation.
pub trait KeyingEngine {
    /// Applies a named setting and returns the engine's
    /// acknowledgment text (empty when the engine says nothing).
    fn execute_directive(
        &mut self,
        name: &str,
        value: &DirectiveValue,
    ) -> Result<String, EngineFault>;

    /// Reads a named setting without changing it.
    fn query_directive(&mut self, name: &str) -> Result<String, EngineFault>;

    /// Opens a deferred transaction.
    fn begin_transaction(&mut self) -> Result<(), EngineFault>;

    /// Commits the open transaction.
    fn commit(&mut self) -> Result<(), EngineFault>;

    /// Rolls back the open transaction.
    fn rollback(&mut self) -> Result<(), EngineFault>;

    /// Whether the connection currently has an open transaction.
    fn in_transaction(&self) -> bool;
}

/// Scoped transaction: rolls back on drop unless committed.
///
/// Guarantees commit-or-rollback on every exit path, which is what
/// makes the write-back probe safe to interrupt.
pub struct TransactionGuard<'a, E: KeyingEngine + ?Sized> {
    engine: &'a mut E,
    done: bool,
}

impl<'a, E: KeyingEngine + ?Sized> TransactionGuard<'a, E> {
    /// Opens a transaction and returns the guard.
    pub fn begin(engine: &'a mut E) -> Result<Self, EngineFault> {
        engine.begin_transaction()?;
        Ok(Self {
            engine,
            done: false,
        })
    }

    /// Access to the guarded engine.
    pub fn engine(&mut self) -> &mut E {
        self.engine
    }

    /// Commits and disarms the guard.
    pub fn commit(mut self) -> Result<(), EngineFault> {
        self.done = true;
        self.engine.commit()
    }
}

impl<E: KeyingEngine + ?Sized> Drop for TransactionGuard<'_, E> {
    fn drop(&mut self) {
        if !self.done {
            // Nothing further can be done about a failed rollback
            // here; the connection is likely unusable anyway.
            if let Err(fault) = self.engine.rollback() {
                warn!("transaction rollback failed: {fault}");
            }
        }
    }
}
