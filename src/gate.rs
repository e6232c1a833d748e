//! Read-only validation gate between model output and the database.
//!
//! Every statement the model produces passes through [`ValidationGate`]
//! before it reaches a connection. The gate is a whitelist: a statement is
//! accepted only when it starts with `select` and mentions none of the
//! data-modifying keywords.
//!
//! # Keyword policy
//!
//! The check runs on a trimmed, lower-cased copy of the statement:
//!
//! 1. It must begin with `select`.
//! 2. It must not contain any of [`PROHIBITED_KEYWORDS`] as a substring.
//!
//! Matching is unanchored, so `select update_count from t` is rejected even
//! though `update_count` is only a column name. The gate knows nothing about
//! quoting or comments and errs on the side of refusing.
//!
//! # Strict mode
//!
//! [`GateMode::Strict`] runs the keyword policy first and then parses the
//! statement with `sqlparser`. The parsed tree must be a single query with no
//! `SELECT ... INTO`, no row locks and no data-modifying set expression.
//! Derived tables, joins and subqueries in the select list, `WHERE` and
//! `HAVING` are held to the same rules.
//!
//! # Example
//!
//! ```
//! use sql_ask::gate::{GateMode, Rejection, ValidationGate, validate};
//!
//! assert!(validate("SELECT id FROM users"));
//! assert!(!validate("DELETE FROM users"));
//!
//! let gate = ValidationGate::new(GateMode::Keywords);
//! assert_eq!(
//!     gate.check("select * from t; drop table t"),
//!     Err(Rejection::ProhibitedKeyword("drop"))
//! );
//! ```

use std::fmt;

use serde::Deserialize;
use sqlparser::{
    ast::{Expr, Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins},
    dialect::PostgreSqlDialect,
    parser::Parser
};
use tracing::debug;

/// Keywords that must not appear anywhere in an accepted statement.
///
/// Checked in this order; the first match is reported.
pub const PROHIBITED_KEYWORDS: [&str; 10] = [
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "merge", "grant",
    "revoke"
];

/// Reason a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Statement does not begin with `select`
    NotSelect,
    /// Statement contains a prohibited keyword
    ProhibitedKeyword(&'static str),
    /// Strict mode: statement could not be parsed
    Unparsable(String),
    /// Strict mode: fragment holds more than one statement
    MultipleStatements(usize),
    /// Strict mode: statement parsed but is not a query
    NotAQuery,
    /// Strict mode: `SELECT ... INTO` creates a table
    SelectInto,
    /// Strict mode: `FOR UPDATE` / `FOR SHARE` takes row locks
    LockingClause,
    /// Strict mode: set expression modifies data
    DataModifying
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelect => write!(f, "only SELECT queries are allowed"),
            Self::ProhibitedKeyword(keyword) => {
                write!(f, "query contains prohibited keyword: {}", keyword)
            }
            Self::Unparsable(message) => write!(f, "query could not be parsed: {}", message),
            Self::MultipleStatements(count) => {
                write!(f, "expected a single statement, found {}", count)
            }
            Self::NotAQuery => write!(f, "statement is not a query"),
            Self::SelectInto => write!(f, "SELECT INTO is not allowed"),
            Self::LockingClause => write!(f, "row locking clauses are not allowed"),
            Self::DataModifying => write!(f, "query modifies data")
        }
    }
}

/// How thoroughly the gate inspects statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Prefix and keyword substring checks only
    #[default]
    Keywords,
    /// Keyword checks plus a PostgreSQL parse of the statement
    Strict
}

/// Whitelist check applied to every statement before execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationGate {
    mode: GateMode
}

impl ValidationGate {
    pub fn new(mode: GateMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Accept or reject a single statement
    ///
    /// # Errors
    ///
    /// Returns the first [`Rejection`] that applies.
    pub fn check(&self, statement: &str) -> Result<(), Rejection> {
        check_keywords(statement)?;
        if self.mode == GateMode::Strict {
            check_parsed(statement)?;
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check)
    pub fn validate(&self, statement: &str) -> bool {
        match self.check(statement) {
            Ok(()) => true,
            Err(rejection) => {
                debug!(%rejection, "statement rejected");
                false
            }
        }
    }
}

/// Validate a statement with the default keyword policy
pub fn validate(statement: &str) -> bool {
    ValidationGate::default().validate(statement)
}

fn check_keywords(statement: &str) -> Result<(), Rejection> {
    let lowered = statement.trim().to_lowercase();
    if !lowered.starts_with("select") {
        return Err(Rejection::NotSelect);
    }
    match PROHIBITED_KEYWORDS
        .into_iter()
        .find(|keyword| lowered.contains(*keyword))
    {
        Some(keyword) => Err(Rejection::ProhibitedKeyword(keyword)),
        None => Ok(())
    }
}

fn check_parsed(statement: &str) -> Result<(), Rejection> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, statement)
        .map_err(|e| Rejection::Unparsable(e.to_string()))?;
    match statements.as_slice() {
        [Statement::Query(query)] => inspect_query(query),
        [_] => Err(Rejection::NotAQuery),
        [] => Err(Rejection::Unparsable(String::from("empty statement"))),
        many => Err(Rejection::MultipleStatements(many.len()))
    }
}

fn inspect_query(query: &Query) -> Result<(), Rejection> {
    if !query.locks.is_empty() {
        return Err(Rejection::LockingClause);
    }
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            inspect_query(&cte.query)?;
        }
    }
    inspect_set_expr(&query.body)
}

fn inspect_set_expr(expr: &SetExpr) -> Result<(), Rejection> {
    match expr {
        SetExpr::Select(select) => inspect_select(select),
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
        SetExpr::Query(query) => inspect_query(query),
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            inspect_set_expr(left)?;
            inspect_set_expr(right)
        }
        _ => Err(Rejection::DataModifying)
    }
}

fn inspect_select(select: &Select) -> Result<(), Rejection> {
    if select.into.is_some() {
        return Err(Rejection::SelectInto);
    }
    for table in &select.from {
        inspect_table_with_joins(table)?;
    }
    for item in &select.projection {
        if let SelectItem::UnnamedExpr(expr)
        | SelectItem::ExprWithAlias {
            expr, ..
        } = item
        {
            inspect_expr(expr)?;
        }
    }
    if let Some(selection) = &select.selection {
        inspect_expr(selection)?;
    }
    if let Some(having) = &select.having {
        inspect_expr(having)?;
    }
    Ok(())
}

fn inspect_table_with_joins(table: &TableWithJoins) -> Result<(), Rejection> {
    inspect_table_factor(&table.relation)?;
    for join in &table.joins {
        inspect_table_factor(&join.relation)?;
    }
    Ok(())
}

fn inspect_table_factor(factor: &TableFactor) -> Result<(), Rejection> {
    match factor {
        TableFactor::Derived {
            subquery, ..
        } => inspect_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => inspect_table_with_joins(table_with_joins),
        _ => Ok(())
    }
}

/// Descend into subqueries nested in an expression
fn inspect_expr(expr: &Expr) -> Result<(), Rejection> {
    match expr {
        Expr::Subquery(query)
        | Expr::Exists {
            subquery: query, ..
        } => inspect_query(query),
        Expr::InSubquery {
            expr,
            subquery,
            ..
        } => {
            inspect_expr(expr)?;
            inspect_query(subquery)
        }
        Expr::BinaryOp {
            left,
            right,
            ..
        } => {
            inspect_expr(left)?;
            inspect_expr(right)
        }
        Expr::UnaryOp {
            expr, ..
        }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr) => inspect_expr(expr),
        Expr::InList {
            expr,
            list,
            ..
        } => {
            inspect_expr(expr)?;
            list.iter().try_for_each(inspect_expr)
        }
        Expr::Between {
            expr,
            low,
            high,
            ..
        } => {
            inspect_expr(expr)?;
            inspect_expr(low)?;
            inspect_expr(high)
        }
        _ => Ok(())
    }
}
