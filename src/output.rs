use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{executor::StatementResult, prompt::Prompt};

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// Statement result shaped for serialization
#[derive(Debug, Serialize)]
struct SerializedResult<'a> {
    statement: &'a str,
    columns:   &'a [String],
    rows:      Vec<IndexMap<&'a str, Option<&'a str>>>
}

/// Format the rows of one executed statement
pub fn format_statement_result(result: &StatementResult, opts: &OutputOptions) -> String {
    let serialized = SerializedResult {
        statement: &result.statement,
        columns:   &result.rows.columns,
        rows:      result.rows.records()
    };
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(&serialized).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(&serialized).unwrap_or_default(),
        OutputFormat::Text => format_text_result(result, opts)
    }
}

fn format_text_result(result: &StatementResult, opts: &OutputOptions) -> String {
    let mut output = String::new();
    let header = format!("Query Result: {}", result.statement);
    if opts.colored {
        output.push_str(&header.bold().to_string());
    } else {
        output.push_str(&header);
    }
    output.push('\n');

    if !result.rows.columns.is_empty() {
        output.push_str(&build_table(result, opts).to_string());
        output.push('\n');
    }

    let count = result.rows.len();
    let footer = format!("({} row{})", count, if count == 1 { "" } else { "s" });
    if opts.colored {
        output.push_str(&footer.bright_black().to_string());
    } else {
        output.push_str(&footer);
    }
    output.push('\n');
    output
}

fn build_table(result: &StatementResult, opts: &OutputOptions) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if !opts.colored {
        table.force_no_tty();
    }

    table.set_header(result.rows.columns.iter().map(|name| {
        let cell = Cell::new(name).add_attribute(Attribute::Bold);
        if opts.colored { cell.fg(Color::Cyan) } else { cell }
    }));

    for row in &result.rows.rows {
        table.add_row(row.iter().map(|value| match value {
            Some(value) => Cell::new(value),
            None if opts.colored => Cell::new("NULL").fg(Color::DarkGrey),
            None => Cell::new("NULL")
        }));
    }
    table
}

/// Format the prompt shown by `--dry-run`
pub fn format_prompt(prompt: &Prompt, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::json!({
            "system": prompt.system,
            "user": prompt.user
        })
        .to_string(),
        OutputFormat::Yaml => {
            let mut map = IndexMap::new();
            map.insert("system", prompt.system.as_str());
            map.insert("user", prompt.user.as_str());
            serde_yaml::to_string(&map).unwrap_or_default()
        }
        OutputFormat::Text => {
            let (system_title, user_title) = if opts.colored {
                (
                    "=== System ===".cyan().bold().to_string(),
                    "=== User ===".cyan().bold().to_string()
                )
            } else {
                (String::from("=== System ==="), String::from("=== User ==="))
            };
            format!(
                "=== DRY RUN - Would send to LLM ===\n\n{}\n{}\n\n{}\n{}\n",
                system_title, prompt.system, user_title, prompt.user
            )
        }
    }
}
