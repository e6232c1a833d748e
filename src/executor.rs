//! Sequential execution of gated statements.
//!
//! ```text
//! extracted SQL ──split──▶ stmt₁ ──gate──▶ run ──▶ emit
//!                          stmt₂ ──gate──▶ run ──▶ emit
//!                          stmt₃ ──gate──✗ abort (stmt₄.. never run)
//! ```
//!
//! The executor is fail-fast: the first rejected statement ends the batch
//! with an error. Statements that already ran keep their results (and have
//! already been emitted); nothing after the rejected one is attempted.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{AppResult, rejected_statement_error},
    extract::split_statements,
    gate::ValidationGate
};

/// Rows returned by one statement, values in PostgreSQL text format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSet {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows, each with one value per column (`None` for SQL NULL)
    pub rows:    Vec<Vec<Option<String>>>
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as column-name keyed maps, preserving column order
    pub fn records(&self) -> Vec<IndexMap<&str, Option<&str>>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(Option::as_deref))
                    .collect()
            })
            .collect()
    }
}

/// One statement that ran, together with its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementResult {
    /// Statement text as executed
    pub statement: String,
    /// Returned rows
    pub rows:      RowSet
}

/// An open session able to run a single statement.
#[async_trait]
pub trait StatementRunner: Send + Sync {
    /// Execute one already-validated statement
    async fn run(&self, statement: &str) -> AppResult<RowSet>;
}

/// Validate and run every statement in `sql`, in order
///
/// `emit` sees each result as soon as its statement finishes, so output for
/// earlier statements is not lost when a later one is rejected.
///
/// # Errors
///
/// Returns the gate rejection for the first invalid statement, or the
/// runner's error for the first statement that fails to execute. Either way
/// no further statements run.
pub async fn execute_statements<R, F>(
    runner: &R,
    sql: &str,
    gate: &ValidationGate,
    mut emit: F
) -> AppResult<Vec<StatementResult>>
where
    R: StatementRunner + ?Sized,
    F: FnMut(&StatementResult)
{
    let statements = split_statements(sql);
    let mut results = Vec::with_capacity(statements.len());
    for statement in statements {
        if let Err(rejection) = gate.check(statement) {
            warn!(%rejection, statement, "statement rejected, aborting remaining statements");
            return Err(rejected_statement_error(statement, &rejection));
        }
        info!(statement, "executing query");
        let rows = runner.run(statement).await?;
        info!(rows = rows.len(), "query returned");
        let result = StatementResult {
            statement: statement.to_string(),
            rows
        };
        emit(&result);
        results.push(result);
    }
    Ok(results)
}
