//! rusqlite-backed implementation of the keying engine.

use cipherkey_core::{
    apply_keying, Directives, DirectiveValue, EngineFault, KeyingEngine, KeyingResult,
};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

/// A SQLCipher connection exposed as a [`KeyingEngine`].
///
/// Owns the connection for the duration of keying; recover it with
/// [`into_inner`](Self::into_inner) afterwards. The protocol never
/// retries on a locked database — callers sharing the file with other
/// connections should set a busy timeout on the connection before
/// keying (`PRAGMA busy_timeout`), which restores tolerance of
/// transient locks without a retry loop here.
pub struct SqlCipherEngine {
    conn: Connection,
}

impl SqlCipherEngine {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Runs the key-application protocol on this connection.
    pub fn apply(&mut self, directives: Directives) -> KeyingResult<()> {
        apply_keying(self, directives)
    }

    /// Borrow the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Unwraps the connection.
    #[must_use]
    pub fn into_inner(self) -> Connection {
        self.conn
    }

    /// Runs a pragma statement and returns its first result column,
    /// if the pragma produced any rows at all.
    fn run_pragma(&mut self, sql: &str) -> Result<Option<String>, EngineFault> {
        let mut stmt = self.conn.prepare(sql).map_err(map_fault)?;
        let mut rows = stmt.query([]).map_err(map_fault)?;
        match rows.next().map_err(map_fault)? {
            Some(row) => {
                let value: Value = row.get(0).map_err(map_fault)?;
                Ok(Some(render_value(value)))
            }
            None => Ok(None),
        }
    }
}

impl KeyingEngine for SqlCipherEngine {
    fn execute_directive(
        &mut self,
        name: &str,
        value: &DirectiveValue,
    ) -> Result<String, EngineFault> {
        let name = checked_pragma_name(name)?;
        let sql = format!("PRAGMA {name} = {}", quote_value(value));
        debug!("setting pragma '{name}'");
        if let Some(ack) = self.run_pragma(&sql)? {
            // Key pragmas and some settings acknowledge directly.
            return Ok(ack);
        }
        // SQLCipher sets most configuration pragmas silently; the
        // acknowledgment is the setting read back, so an ignored or
        // out-of-range value shows up as a mismatch.
        Ok(self.run_pragma(&format!("PRAGMA {name}"))?.unwrap_or_default())
    }

    fn query_directive(&mut self, name: &str) -> Result<String, EngineFault> {
        let name = checked_pragma_name(name)?;
        Ok(self.run_pragma(&format!("PRAGMA {name}"))?.unwrap_or_default())
    }

    fn begin_transaction(&mut self) -> Result<(), EngineFault> {
        // Deferred, so read-only connections can still enter the
        // probe and fail only at the write itself.
        self.conn.execute_batch("BEGIN").map_err(map_fault)
    }

    fn commit(&mut self) -> Result<(), EngineFault> {
        self.conn.execute_batch("COMMIT").map_err(map_fault)
    }

    fn rollback(&mut self) -> Result<(), EngineFault> {
        self.conn.execute_batch("ROLLBACK").map_err(map_fault)
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

/// Pragma names are interpolated into SQL, so only identifier
/// characters are allowed through.
fn checked_pragma_name(name: &str) -> Result<&str, EngineFault> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(name)
    } else {
        Err(EngineFault::Other(format!(
            "invalid pragma name: '{name}'"
        )))
    }
}

/// Renders a directive value as a pragma argument, single-quoting
/// and escaping text.
fn quote_value(value: &DirectiveValue) -> String {
    match value {
        DirectiveValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        DirectiveValue::Int(i) => i.to_string(),
    }
}

/// Stringifies a pragma result the way SQLite would cast it to text.
fn render_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}

/// Classifies a rusqlite error into the fault kinds the protocol
/// distinguishes.
fn map_fault(err: rusqlite::Error) -> EngineFault {
    if let rusqlite::Error::SqliteFailure(code, _) = &err {
        match code.code {
            ErrorCode::NotADatabase => return EngineFault::NotADatabase(err.to_string()),
            ErrorCode::ReadOnly => return EngineFault::ReadOnly(err.to_string()),
            _ => {}
        }
    }
    EngineFault::Other(err.to_string())
}
