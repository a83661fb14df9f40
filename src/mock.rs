//! In-memory executor for tests.
//!
//! [`MockExecutor`] records every statement it is handed and answers from a
//! queue of canned results, so statement building, rendering and record
//! decoding can be tested without a database.
//!
//! ```rust
//! use buoy::mock::MockExecutor;
//! use buoy::{select_from, Dsl, Field, Table};
//! use sea_query::Value;
//!
//! let id: Field<i32> = Field::column("id");
//! let test = Table::builder("test").primary_key(&id).build();
//!
//! let mock = MockExecutor::new();
//! mock.push_rows(vec![vec![Value::Int(Some(1))]]);
//!
//! let dsl = Dsl::new(&mock);
//! let record = dsl.fetch_one(select_from(&test).filter(id.eq(1))).unwrap().unwrap();
//! assert_eq!(record.get(&id), Some(&1));
//! assert_eq!(mock.statements()[0].sql, "SELECT id FROM test WHERE id = $1");
//! ```

use crate::executor::{DriverError, Executor, RawRow};
use crate::query::render::BindParam;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A statement as the executor received it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<BindParam>,
}

#[derive(Debug)]
enum Reply {
    Rows(Vec<RawRow>),
    Affected(u64),
    Fail(String),
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<RecordedStatement>,
    replies: VecDeque<Reply>,
}

/// Executor that records statements and replays queued results
///
/// With nothing queued, `execute` reports zero affected rows and `query`
/// returns no rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<State>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue rows for the next call.
    pub fn push_rows(&self, rows: Vec<RawRow>) {
        self.state().replies.push_back(Reply::Rows(rows));
    }

    /// Queue an affected-row count for the next call.
    pub fn push_affected(&self, count: u64) {
        self.state().replies.push_back(Reply::Affected(count));
    }

    /// Queue a driver failure for the next call.
    pub fn push_error(&self, message: &str) {
        self.state()
            .replies
            .push_back(Reply::Fail(message.to_string()));
    }

    /// Every statement received so far, oldest first.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<RecordedStatement> {
        self.state().statements.last().cloned()
    }

    fn record(&self, sql: &str, params: &[BindParam]) -> Option<Reply> {
        let mut state = self.state();
        state.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        state.replies.pop_front()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, sql: &str, params: &[BindParam]) -> Result<u64, DriverError> {
        match self.record(sql, params) {
            Some(Reply::Affected(count)) => Ok(count),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            Some(Reply::Fail(message)) => Err(DriverError::Other(message)),
            None => Ok(0),
        }
    }

    fn query(&self, sql: &str, params: &[BindParam]) -> Result<Vec<RawRow>, DriverError> {
        match self.record(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
            Some(Reply::Fail(message)) => Err(DriverError::Other(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StoredType;
    use sea_query::Value;

    #[test]
    fn test_records_and_replays_in_order() {
        let mock = MockExecutor::new();
        mock.push_affected(3);
        mock.push_rows(vec![vec![Value::Int(Some(1))]]);

        let params = vec![BindParam {
            value: Value::Int(Some(9)),
            stored_type: StoredType::Integer,
        }];
        assert_eq!(mock.execute("UPDATE t SET a = $1", &params).expect("execute"), 3);
        assert_eq!(mock.query("SELECT a FROM t", &[]).expect("query").len(), 1);
        assert!(mock.query("SELECT a FROM t", &[]).expect("query").is_empty());

        let statements = mock.statements();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].params, params);
        assert_eq!(
            mock.last_statement().map(|s| s.sql),
            Some("SELECT a FROM t".to_string())
        );
    }

    #[test]
    fn test_queued_error() {
        let mock = MockExecutor::new();
        mock.push_error("relation \"t\" does not exist");
        match mock.execute("TRUNCATE t", &[]) {
            Err(DriverError::Other(message)) => assert!(message.contains("does not exist")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
