//! Relational storage collaborator
//!
//! The host does not execute SQL itself. A [`StorageEngine`] does, and
//! [`Storage`] wraps it with the tick-level transaction: the first write of a
//! tick opens a transaction, [`Storage::commit_tick`] closes it once every
//! plugin has rendered.

use gridwell_core::TypedArg;

use crate::error::StorageError;

/// A row of query results.
pub type Row = Vec<TypedArg>;

/// External SQL engine.
pub trait StorageEngine: Send {
    fn begin(&mut self) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    /// Run a statement, returning the number of rows changed.
    fn execute(&mut self, sql: &str, params: &[TypedArg]) -> Result<u64, StorageError>;

    fn query(&mut self, sql: &str, params: &[TypedArg]) -> Result<Vec<Row>, StorageError>;

    fn last_insert_id(&self) -> i64;
}

/// Engine used when no database is configured.
#[derive(Debug, Default)]
pub struct NullStorage;

impl StorageEngine for NullStorage {
    fn begin(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn execute(&mut self, _sql: &str, _params: &[TypedArg]) -> Result<u64, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn query(&mut self, _sql: &str, _params: &[TypedArg]) -> Result<Vec<Row>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn last_insert_id(&self) -> i64 {
        0
    }
}

/// Engine plus per-tick transaction bookkeeping.
pub struct Storage {
    engine: Box<dyn StorageEngine>,
    tx_open: bool,
    changes: u64,
    last_error: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(Box::new(NullStorage))
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("tx_open", &self.tx_open)
            .field("changes", &self.changes)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Storage {
    pub fn new(engine: Box<dyn StorageEngine>) -> Self {
        Self {
            engine,
            tx_open: false,
            changes: 0,
            last_error: String::new(),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.tx_open
    }

    /// Rows changed by the last successful statement.
    pub fn changes(&self) -> u64 {
        self.changes
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn last_insert_id(&self) -> i64 {
        self.engine.last_insert_id()
    }

    fn fail(&mut self, e: StorageError) -> StorageError {
        self.last_error = e.to_string();
        e
    }

    fn ensure_tx(&mut self) -> Result<(), StorageError> {
        if !self.tx_open {
            self.engine.begin().map_err(|e| self.fail(e))?;
            self.tx_open = true;
        }
        Ok(())
    }

    pub fn execute(&mut self, sql: &str, params: &[TypedArg]) -> Result<u64, StorageError> {
        self.ensure_tx()?;
        match self.engine.execute(sql, params) {
            Ok(n) => {
                self.changes = n;
                self.last_error.clear();
                Ok(n)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn query(&mut self, sql: &str, params: &[TypedArg]) -> Result<Vec<Row>, StorageError> {
        self.ensure_tx()?;
        match self.engine.query(sql, params) {
            Ok(rows) => {
                self.last_error.clear();
                Ok(rows)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Commit the transaction opened during this tick, if any.
    pub fn commit_tick(&mut self) -> Result<(), StorageError> {
        if !self.tx_open {
            return Ok(());
        }
        self.tx_open = false;
        self.engine.commit().map_err(|e| self.fail(e))
    }
}
