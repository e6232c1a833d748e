use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// sql-ask - Answer plain-language questions with read-only SQL written by an
/// LLM
#[derive(Parser, Debug)]
#[command(name = "sql-ask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Question to answer, e.g. `how many users signed up last week`
    ///
    /// Options may appear before, between or after the words. Words starting
    /// with `-` go after `--`.
    pub question: Vec<String>,

    /// LLM provider to use
    #[arg(short, long, value_enum)]
    pub provider: Option<Provider>,

    /// API key for OpenAI or Anthropic
    #[arg(short, long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// API root for OpenAI-compatible servers or Ollama
    #[arg(long)]
    pub base_url: Option<String>,

    /// Read the schema from a DDL file instead of the database catalog
    #[arg(short, long)]
    pub schema_file: Option<PathBuf>,

    /// Also parse each statement and reject anything that is not a plain query
    #[arg(long)]
    pub strict: bool,

    /// Print the prompt that would be sent and stop
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for result rows
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub output_format: Format,

    /// Database host
    #[arg(long)]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long)]
    pub db_port: Option<u16>,

    /// Database user
    #[arg(long)]
    pub db_user: Option<String>,

    /// Database name
    #[arg(long)]
    pub db_name: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool
}

impl Cli {
    /// Question words joined with single spaces, `None` when blank
    pub fn question(&self) -> Option<String> {
        let question = self.question.join(" ");
        let trimmed = question.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama
}

impl Provider {
    /// Get default model for provider
    pub fn default_model(&self) -> &str {
        match self {
            Self::OpenAI => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.2"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
    Yaml
}
