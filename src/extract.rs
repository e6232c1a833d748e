//! Turning raw completion text into executable statements.

/// Strip markdown code fences from model output
///
/// Scans left to right and removes each "```sql" or "```" marker, the longer
/// one winning where both match, then trims. Text without fences only gets
/// trimmed, so the transform is idempotent.
pub fn extract_sql(raw: &str) -> String {
    let mut sql = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("```") {
        sql.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        rest = rest.strip_prefix("sql").unwrap_or(rest);
    }
    sql.push_str(rest);
    sql.trim().to_string()
}

/// Split extracted SQL into statements
///
/// Splits on every `;`, including ones inside string literals; fragments are
/// trimmed and empty ones dropped.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
