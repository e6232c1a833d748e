//! Prompt construction for the completion request.

/// System and user instructions for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Instruction carrying the schema, server version and constraints
    pub system: String,
    /// The user's question, verbatim
    pub user:   String
}

impl Prompt {
    /// Compose the fixed instruction template
    ///
    /// `version` is present for introspected databases and absent when the
    /// schema came from a file.
    pub fn build(schema_ddl: &str, version: Option<&str>, question: &str) -> Self {
        let target = match version {
            Some(version) => format!("PostgreSQL version {}", version),
            None => String::from("PostgreSQL")
        };
        let system = format!(
            "You are a SQL expert. Write only SELECT queries for {target}. \
             Given the following database schema:\n{schema}\n\
             Write a SQL query to answer the user's question. \
             Respond only with the SQL query.",
            target = target,
            schema = schema_ddl
        );
        Self {
            system,
            user: question.to_string()
        }
    }
}
