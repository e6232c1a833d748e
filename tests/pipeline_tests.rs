// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering}
};

use async_trait::async_trait;
use sql_ask::{
    app::{SchemaSource, answer, ask, build_prompt},
    catalog::Database,
    error::{AppError, AppResult},
    executor::{RowSet, StatementResult, StatementRunner, execute_statements},
    gate::ValidationGate,
    llm::{CompletionClient, require_text},
    prompt::Prompt,
    schema::{ColumnDescriptor, SchemaDescription}
};

/// In-memory database counting every call it receives.
#[derive(Default)]
struct FakeDatabase {
    version_calls: AtomicUsize,
    schema_calls:  AtomicUsize,
    execute_calls: AtomicUsize,
    executed:      Mutex<Vec<String>>
}

impl FakeDatabase {
    fn total_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
            + self.schema_calls.load(Ordering::SeqCst)
            + self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatementRunner for FakeDatabase {
    async fn run(&self, statement: &str) -> AppResult<RowSet> {
        self.executed.lock().unwrap().push(statement.to_string());
        let mut rows = RowSet::new(vec![String::from("count")]);
        rows.rows.push(vec![Some(String::from("42"))]);
        Ok(rows)
    }
}

#[async_trait(?Send)]
impl Database for FakeDatabase {
    async fn server_version(&self) -> AppResult<String> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::from("16.2"))
    }

    async fn describe_schema(&self) -> AppResult<SchemaDescription> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        let mut schema = SchemaDescription::default();
        schema.push_column("users", ColumnDescriptor::new("id", "integer", false));
        Ok(schema)
    }

    async fn execute(
        &self,
        sql: &str,
        gate: &ValidationGate,
        emit: &mut dyn for<'r> FnMut(&'r StatementResult)
    ) -> AppResult<Vec<StatementResult>> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        execute_statements(self, sql, gate, |r| emit(r)).await
    }
}

/// Completion client answering with a canned body.
struct CannedCompletion {
    body:    Option<&'static str>,
    calls:   AtomicUsize,
    prompts: Mutex<Vec<Prompt>>
}

impl CannedCompletion {
    fn new(body: Option<&'static str>) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new())
        }
    }
}

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, prompt: &Prompt) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        require_text(self.body.map(str::to_string), "test")
    }
}

/// Completion client whose request always fails.
struct FailingCompletion;

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _prompt: &Prompt) -> AppResult<String> {
        Err(AppError::service("connection refused"))
    }
}

#[tokio::test]
async fn test_full_pipeline_executes_extracted_sql() {
    let db = FakeDatabase::default();
    let llm = CannedCompletion::new(Some("```sql\nSELECT count(*) FROM users;\n```"));
    let mut printed = Vec::new();

    let results = ask(
        &db,
        &llm,
        &SchemaSource::Catalog,
        &ValidationGate::default(),
        "how many users?",
        &mut |r| printed.push(r.statement.clone())
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(printed, vec!["SELECT count(*) FROM users"]);
    assert_eq!(*db.executed.lock().unwrap(), vec!["SELECT count(*) FROM users"]);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(db.version_calls.load(Ordering::SeqCst), 1);
    assert_eq!(db.schema_calls.load(Ordering::SeqCst), 1);

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].system.contains("PostgreSQL version 16.2"));
    assert!(prompts[0].system.contains("CREATE TABLE users"));
    assert_eq!(prompts[0].user, "how many users?");
}

#[tokio::test]
async fn test_blank_question_makes_no_calls() {
    for question in ["", "   ", "\n\t"] {
        let db = FakeDatabase::default();
        let llm = CannedCompletion::new(Some("SELECT 1"));
        let result = ask(
            &db,
            &llm,
            &SchemaSource::Catalog,
            &ValidationGate::default(),
            question,
            &mut |_| {}
        )
        .await;

        assert!(result.is_err());
        assert_eq!(db.total_calls(), 0);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_empty_completion_executes_nothing() {
    for body in [None, Some(""), Some("   \n")] {
        let db = FakeDatabase::default();
        let llm = CannedCompletion::new(body);
        let result = ask(
            &db,
            &llm,
            &SchemaSource::Catalog,
            &ValidationGate::default(),
            "anything",
            &mut |_| {}
        )
        .await;

        assert!(result.is_err());
        assert_eq!(db.execute_calls.load(Ordering::SeqCst), 0);
        assert!(db.executed.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_completion_failure_executes_nothing() {
    let db = FakeDatabase::default();
    let prompt = Prompt::build("", None, "q");
    let result = answer(
        &db,
        &FailingCompletion,
        &prompt,
        &ValidationGate::default(),
        &mut |_| {}
    )
    .await;

    assert!(result.is_err());
    assert_eq!(db.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_model_output_is_not_executed() {
    let db = FakeDatabase::default();
    let llm = CannedCompletion::new(Some("DELETE FROM users;"));
    let result = ask(
        &db,
        &llm,
        &SchemaSource::Catalog,
        &ValidationGate::default(),
        "remove everyone",
        &mut |_| {}
    )
    .await;

    assert!(result.is_err());
    assert_eq!(db.execute_calls.load(Ordering::SeqCst), 1);
    assert!(db.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_static_schema_skips_database_lookups() {
    let db = FakeDatabase::default();
    let schema = SchemaDescription::parse("CREATE TABLE books (isbn TEXT NOT NULL);").unwrap();

    let prompt = build_prompt(&db, &SchemaSource::Static(schema), "list books")
        .await
        .unwrap();

    assert_eq!(db.total_calls(), 0);
    assert!(prompt.system.contains("CREATE TABLE books (\n  isbn TEXT NOT NULL\n);"));
    assert!(prompt.system.contains("for PostgreSQL. Given"));
}

#[test]
fn test_require_text() {
    assert_eq!(
        require_text(Some(String::from("SELECT 1")), "test").unwrap(),
        "SELECT 1"
    );
    assert!(require_text(None, "test").is_err());
    assert!(require_text(Some(String::from(" ")), "test").is_err());
}
