//! Engine-agnostic key application for transparently encrypted SQLite
//! databases.
//!
//! Setting an encryption key on a SQLCipher-style database is
//! deceptively fragile: the engine acknowledges a key pragma without
//! validating it, configuration pragmas must run in a specific order,
//! and an empty file is not materialized as an encrypted container
//! until the first write. This crate implements the full protocol:
//!
//! - Directives are classified and ordered (cipher selection first,
//!   legacy reset, tuning, then exactly one key directive last).
//! - Each directive's acknowledgment is validated against the value
//!   the engine is expected to echo back.
//! - A read probe of `user_version` forces a page read, surfacing
//!   wrong keys on populated files as [`KeyingError::WrongKeyOrFormat`].
//! - A transactional write-back of `user_version` forces population
//!   of empty files, tolerating read-only connections.
//!
//! The storage engine itself is abstracted behind [`KeyingEngine`];
//! see the companion `cipherkey-db` crate for the rusqlite/SQLCipher
//! implementation.

mod apply;
mod directive;
mod engine;
mod error;
mod plan;

pub use apply::apply_keying;
pub use directive::{Directive, DirectiveKind, DirectiveValue, Directives};
pub use engine::{EngineFault, KeyingEngine, TransactionGuard};
pub use error::{KeyingError, KeyingResult};
pub use plan::OrderedPlan;
