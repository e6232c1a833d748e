//! Schema description used to ground query generation.
//!
//! A [`SchemaDescription`] maps table names to their columns in the order the
//! catalog (or the DDL file) listed them, and renders itself as pseudo-DDL for
//! the prompt.
//!
//! # Example
//!
//! ```
//! use sql_ask::schema::SchemaDescription;
//!
//! let sql = r#"
//!     CREATE TABLE users (
//!         id INT NOT NULL,
//!         email VARCHAR(255)
//!     );
//! "#;
//!
//! let schema = SchemaDescription::parse(sql).unwrap();
//! assert_eq!(
//!     schema.to_ddl(),
//!     "CREATE TABLE users (\n  id INT NOT NULL,\n  email VARCHAR(255)\n);"
//! );
//! ```

use indexmap::IndexMap;
use sqlparser::{
    ast::{ColumnOption, Statement},
    dialect::PostgreSqlDialect,
    parser::Parser
};

use crate::error::{AppResult, schema_parse_error};

/// A single column as described to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name
    pub name:      String,
    /// SQL data type as reported by the catalog or written in DDL
    pub data_type: String,
    /// Whether NULL values are allowed
    pub nullable:  bool
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable
        }
    }

    fn to_ddl(&self) -> String {
        let not_null = if self.nullable { "" } else { " NOT NULL" };
        format!(
            "{} {}{}",
            self.name,
            self.data_type.to_uppercase(),
            not_null
        )
    }
}

/// Tables and columns of the target database.
///
/// Tables keep insertion order, which is catalog order for introspected
/// schemas and declaration order for parsed DDL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescription {
    /// Map of table name to its columns
    pub tables: IndexMap<String, Vec<ColumnDescriptor>>
}

impl SchemaDescription {
    /// Append a column to a table, creating the table on first use
    pub fn push_column(&mut self, table: impl Into<String>, column: ColumnDescriptor) {
        self.tables.entry(table.into()).or_default().push(column);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Build a schema from `CREATE TABLE` statements
    ///
    /// Statements other than `CREATE TABLE` are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the SQL does not parse as PostgreSQL
    pub fn parse(sql: &str) -> AppResult<Self> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| schema_parse_error(e.to_string()))?;
        let mut schema = Self::default();
        for stmt in statements {
            if let Statement::CreateTable(create) = stmt {
                let table_name = create.name.to_string();
                let columns = schema.tables.entry(table_name).or_default();
                for column in create.columns {
                    let not_null = column
                        .options
                        .iter()
                        .any(|opt| matches!(opt.option, ColumnOption::NotNull));
                    columns.push(ColumnDescriptor {
                        name:      column.name.to_string(),
                        data_type: column.data_type.to_string(),
                        nullable:  !not_null
                    });
                }
            }
        }
        Ok(schema)
    }

    /// Render as pseudo `CREATE TABLE` blocks separated by blank lines
    pub fn to_ddl(&self) -> String {
        let mut ddl = String::new();
        for (table, columns) in &self.tables {
            let body = columns
                .iter()
                .map(ColumnDescriptor::to_ddl)
                .collect::<Vec<_>>()
                .join(",\n  ");
            ddl.push_str(&format!("CREATE TABLE {} (\n  {}\n);\n\n", table, body));
        }
        ddl.trim().to_string()
    }
}
