//! Application logic for the sql-ask CLI.
//!
//! This module wires the pipeline together and keeps it separate from the
//! entry point so it can be driven from tests with in-memory databases and
//! completion clients.
//!
//! ```text
//! question ─▶ schema (+ version) ─▶ prompt ─▶ completion ─▶ extract
//!                                                             │
//!                  rows ◀── execute ◀── gate (per statement) ◀┘
//! ```

use std::{
    fs::read_to_string,
    path::Path,
    time::{Duration, Instant}
};

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::{
    catalog::{Database, PgDatabase},
    cli::{Cli, Format},
    config::{Config, DatabaseSettings, LlmSettings},
    error::{AppResult, file_read_error, usage_error},
    executor::StatementResult,
    extract::extract_sql,
    gate::{GateMode, ValidationGate},
    llm::{CompletionClient, LlmClient},
    logging::init_logging,
    output::{OutputFormat, OutputOptions, format_prompt, format_statement_result},
    prompt::Prompt,
    schema::SchemaDescription
};

/// Message shown when no question was given
pub const USAGE_MESSAGE: &str = "Please provide a question as a command-line argument.";

/// Where the schema shown to the model comes from.
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// Introspect the database catalog and report the server version
    Catalog,
    /// Use a schema parsed from a DDL file; no version lookup
    Static(SchemaDescription)
}

impl SchemaSource {
    /// Parse a DDL file into a static schema
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let sql = read_to_string(path)
            .map_err(|e| file_read_error(&path.display().to_string(), e))?;
        Ok(Self::Static(SchemaDescription::parse(&sql)?))
    }
}

/// Gather schema (and version) and compose the prompt
///
/// # Errors
///
/// Propagates schema or version lookup failures
pub async fn build_prompt(
    database: &dyn Database,
    source: &SchemaSource,
    question: &str
) -> AppResult<Prompt> {
    match source {
        SchemaSource::Catalog => {
            let schema = database.describe_schema().await?;
            let version = database.server_version().await?;
            Ok(Prompt::build(&schema.to_ddl(), Some(&version), question))
        }
        SchemaSource::Static(schema) => Ok(Prompt::build(&schema.to_ddl(), None, question))
    }
}

/// Send the prompt, extract the SQL and run it through the gate
///
/// Exactly one completion request is made. Nothing reaches the database
/// unless the completion produced text.
///
/// # Errors
///
/// Returns completion errors, gate rejections and database errors
pub async fn answer(
    database: &dyn Database,
    completion: &dyn CompletionClient,
    prompt: &Prompt,
    gate: &ValidationGate,
    emit: &mut dyn FnMut(&StatementResult)
) -> AppResult<Vec<StatementResult>> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Waiting for the model...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let raw = completion.complete(prompt).await;
    spinner.finish_and_clear();

    let sql = extract_sql(&raw?);
    info!(%sql, "extracted SQL query");
    database.execute(&sql, gate, emit).await
}

/// Full pipeline for one question
///
/// # Errors
///
/// Returns a usage error for a blank question before any I/O happens, then
/// whatever [`build_prompt`] or [`answer`] returns.
pub async fn ask(
    database: &dyn Database,
    completion: &dyn CompletionClient,
    source: &SchemaSource,
    gate: &ValidationGate,
    question: &str,
    emit: &mut dyn FnMut(&StatementResult)
) -> AppResult<Vec<StatementResult>> {
    let question = question.trim();
    if question.is_empty() {
        return Err(usage_error(USAGE_MESSAGE));
    }
    let prompt = build_prompt(database, source, question).await?;
    answer(database, completion, &prompt, gate, emit).await
}

/// Fold command-line overrides into the loaded configuration
pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(provider) = cli.provider.and_then(|p| p.to_possible_value()) {
        config.llm.provider = Some(provider.get_name().to_string());
    }
    if let Some(api_key) = &cli.api_key {
        config.llm.api_key = Some(api_key.clone());
    }
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.llm.base_url = Some(base_url.clone());
    }
    if let Some(host) = &cli.db_host {
        config.database.host = Some(host.clone());
    }
    if let Some(port) = cli.db_port {
        config.database.port = Some(port);
    }
    if let Some(user) = &cli.db_user {
        config.database.user = Some(user.clone());
    }
    if let Some(dbname) = &cli.db_name {
        config.database.dbname = Some(dbname.clone());
    }
    if cli.strict {
        config.gate.mode = GateMode::Strict;
    }
}

/// Create output options from CLI flags
pub fn create_output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml
        },
        colored: !no_color
    }
}

/// Run the CLI
///
/// Usage and configuration problems are returned as errors. Failures inside
/// the pipeline are logged and the process still finishes normally.
pub async fn run(cli: Cli) -> AppResult<i32> {
    init_logging(cli.verbose, !cli.no_color);
    let question = cli.question().ok_or_else(|| usage_error(USAGE_MESSAGE))?;

    let mut config = Config::load()?;
    apply_cli_overrides(&mut config, &cli);
    let database_settings = DatabaseSettings::resolve(&config.database)?;
    let llm_settings = LlmSettings::resolve(&config.llm)?;
    let source = match &cli.schema_file {
        Some(path) => SchemaSource::from_file(path)?,
        None => SchemaSource::Catalog
    };
    let gate = ValidationGate::new(config.gate.mode);
    let output = create_output_options(cli.output_format, cli.no_color);
    let database = PgDatabase::new(&database_settings);

    let started = Instant::now();
    if cli.dry_run {
        let prompt = build_prompt(&database, &source, &question).await?;
        println!("{}", format_prompt(&prompt, &output));
        return Ok(0);
    }

    let completion = LlmClient::new(llm_settings.into_provider()?);
    let mut emit = |result: &StatementResult| {
        println!("{}", format_statement_result(result, &output));
    };
    match ask(&database, &completion, &source, &gate, &question, &mut emit).await {
        Ok(results) => info!(statements = results.len(), "all statements executed"),
        Err(e) => error!(error = %e, "pipeline aborted")
    }
    info!(elapsed = ?started.elapsed(), "done");
    Ok(0)
}
