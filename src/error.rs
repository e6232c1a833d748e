pub use masterror::{AppError, AppResult};

use crate::gate::Rejection;

/// Create usage error for a missing or empty question
pub fn usage_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create schema parse error with optional position info
pub fn schema_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Schema parse error", &msg))
}

/// Create LLM API error
pub fn llm_api_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create HTTP error
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    AppError::service(msg)
}

/// Create database error
///
/// Server-side errors carry a SQLSTATE code and a message from the backend;
/// both end up in the text so the diagnostic is readable on its own.
pub fn database_error(context: &str, err: tokio_postgres::Error) -> AppError {
    let msg = match err.as_db_error() {
        Some(db) => format!(
            "{}: {} (SQLSTATE {})",
            context,
            db.message(),
            db.code().code()
        ),
        None => format!("{}: {}", context, err)
    };
    AppError::service(msg)
}

/// Create error for a statement stopped by the validation gate
pub fn rejected_statement_error(statement: &str, rejection: &Rejection) -> AppError {
    AppError::bad_request(format!(
        "Invalid query, only SELECT queries are allowed ({}): {}",
        rejection, statement
    ))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Format SQL error with position highlighting
fn format_sql_error(prefix: &str, message: &str) -> String {
    // sqlparser format: "... at Line: X, Column: Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "{} at line {}, column {}:\n  {}",
            prefix, pos.line, pos.column, message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let line_start = message.find(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit())?;
    let line = rest[..line_end].parse().ok()?;

    let col_marker = "Column";
    let col_start = rest.find(col_marker)? + col_marker.len();
    let col_rest = rest[col_start..].trim_start_matches([':', ' ']);
    let col_end = col_rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(col_rest.len());
    let column = col_rest[..col_end].parse().ok()?;

    Some(SqlPosition { line, column })
}
