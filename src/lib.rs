//! # sql-ask
//!
//! Ask a PostgreSQL database a question in plain language.
//!
//! The schema of the database is handed to an LLM together with the question;
//! the model answers with SQL, which is stripped of markdown fences, split
//! into statements and pushed through a read-only [`gate`] before anything
//! touches the database. Accepted statements run one after another and their
//! rows are printed.
//!
//! # Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! sql-ask how many orders were placed last month
//!
//! # Schema from a DDL file, only show the prompt
//! sql-ask --schema-file schema.sql --dry-run top five customers by revenue
//!
//! # Parse every statement as well as checking keywords
//! sql-ask --strict --provider ollama --model sqlcoder list active users
//! ```
//!
//! # Modules
//!
//! - [`gate`] - Read-only validation of generated statements
//! - [`executor`] - Statement splitting and fail-fast execution
//! - [`catalog`] - PostgreSQL introspection and scoped connections
//! - [`schema`] - Schema description and pseudo-DDL rendering
//! - [`prompt`] - Prompt template
//! - [`llm`] - Completion clients (OpenAI, Anthropic, Ollama)
//! - [`extract`] - Code fence stripping and statement splitting
//! - [`config`] - Configuration loading and validation
//! - [`output`] - Result formatting
//! - [`error`] - Error constructors

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod gate;
pub mod llm;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod schema;
