//! SQLCipher keying engine for cipherkey.
//!
//! Implements [`cipherkey_core::KeyingEngine`] over a
//! [`rusqlite::Connection`] built with the `bundled-sqlcipher`
//! feature, so the key-application protocol can run against real
//! SQLCipher databases:
//!
//! ```no_run
//! use cipherkey_core::Directives;
//! use cipherkey_db::SqlCipherEngine;
//!
//! let conn = rusqlite::Connection::open("notes.db")?;
//! let mut engine = SqlCipherEngine::new(conn);
//! engine.apply(Directives::new().with("key", "correct horse battery staple"))?;
//! let conn = engine.into_inner();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod engine;

pub use engine::SqlCipherEngine;
