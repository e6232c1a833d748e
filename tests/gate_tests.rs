// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_ask::gate::{GateMode, PROHIBITED_KEYWORDS, Rejection, ValidationGate, validate};

fn strict() -> ValidationGate {
    ValidationGate::new(GateMode::Strict)
}

#[test]
fn test_accepts_plain_select() {
    assert!(validate("SELECT id, name FROM users WHERE id = 1"));
}

#[test]
fn test_accepts_mixed_case_and_leading_whitespace() {
    assert!(validate("   \n\tSeLeCt count(*) FROM orders"));
}

#[test]
fn test_rejects_empty_string() {
    assert!(!validate(""));
    assert_eq!(ValidationGate::default().check("   "), Err(Rejection::NotSelect));
}

#[test]
fn test_rejects_non_select_leading_tokens() {
    for sql in [
        "with x as (select 1) select * from x",
        "explain select 1",
        "show server_version",
        "-- comment\nselect 1",
        "(select 1)"
    ] {
        assert_eq!(
            ValidationGate::default().check(sql),
            Err(Rejection::NotSelect),
            "{sql}"
        );
    }
}

#[test]
fn test_rejects_every_prohibited_keyword() {
    for keyword in PROHIBITED_KEYWORDS {
        let sql = format!("select 1; {} something", keyword.to_uppercase());
        assert_eq!(
            ValidationGate::default().check(&sql),
            Err(Rejection::ProhibitedKeyword(keyword)),
            "{sql}"
        );
    }
}

#[test]
fn test_keyword_inside_identifier_is_rejected() {
    // Substring matching refuses legitimate column names too.
    assert_eq!(
        ValidationGate::default().check("select update_count from t"),
        Err(Rejection::ProhibitedKeyword("update"))
    );
    assert!(!validate("select created_at from users"));
}

#[test]
fn test_keyword_inside_string_literal_is_rejected() {
    assert!(!validate("select * from logs where message = 'drop shipped'"));
}

#[test]
fn test_first_keyword_in_list_order_is_reported() {
    assert_eq!(
        ValidationGate::default().check("select * from t where a = 'revoke' or b = 'insert'"),
        Err(Rejection::ProhibitedKeyword("insert"))
    );
}

#[test]
fn test_select_prefix_is_not_a_word_boundary_check() {
    assert!(validate("selectivity"));
}

#[test]
fn test_rejection_messages_name_the_rule() {
    assert_eq!(
        Rejection::NotSelect.to_string(),
        "only SELECT queries are allowed"
    );
    assert_eq!(
        Rejection::ProhibitedKeyword("drop").to_string(),
        "query contains prohibited keyword: drop"
    );
}

#[test]
fn test_default_mode_is_keywords() {
    assert_eq!(ValidationGate::default().mode(), GateMode::Keywords);
}

#[test]
fn test_keyword_mode_accepts_unparsable_select() {
    assert!(validate("select from where ((("));
}

#[test]
fn test_strict_accepts_joins_ctes_and_unions() {
    let gate = strict();
    assert_eq!(
        gate.check("SELECT u.id, o.total FROM users u JOIN orders o ON u.id = o.user_id"),
        Ok(())
    );
    assert_eq!(
        gate.check("SELECT * FROM (WITH x AS (SELECT 1 AS n) SELECT n FROM x) AS sub"),
        Ok(())
    );
    assert_eq!(gate.check("SELECT id FROM a UNION ALL SELECT id FROM b"), Ok(()));
}

#[test]
fn test_strict_rejects_unparsable_text() {
    assert!(matches!(
        strict().check("select from where((("),
        Err(Rejection::Unparsable(_))
    ));
}

#[test]
fn test_strict_rejects_select_into() {
    assert_eq!(
        strict().check("SELECT * INTO backup_users FROM users"),
        Err(Rejection::SelectInto)
    );
}

#[test]
fn test_strict_rejects_locking_clause() {
    assert_eq!(
        strict().check("SELECT * FROM accounts FOR SHARE"),
        Err(Rejection::LockingClause)
    );
}

#[test]
fn test_strict_rejects_locking_clause_in_derived_table() {
    let gate = strict();
    assert_eq!(
        gate.check("SELECT * FROM (SELECT * FROM accounts FOR SHARE) AS s"),
        Err(Rejection::LockingClause)
    );
    assert_eq!(
        gate.check(
            "SELECT u.id FROM users u JOIN (SELECT * FROM accounts FOR SHARE) a ON a.id = u.id"
        ),
        Err(Rejection::LockingClause)
    );
}

#[test]
fn test_strict_rejects_locking_clause_in_subquery_expression() {
    let gate = strict();
    assert_eq!(
        gate.check("SELECT * FROM t WHERE id IN (SELECT id FROM accounts FOR SHARE)"),
        Err(Rejection::LockingClause)
    );
    assert_eq!(
        gate.check("SELECT * FROM t WHERE EXISTS (SELECT 1 FROM accounts FOR SHARE)"),
        Err(Rejection::LockingClause)
    );
    assert_eq!(
        gate.check("SELECT (SELECT max(id) FROM accounts FOR SHARE) AS newest"),
        Err(Rejection::LockingClause)
    );
}

#[test]
fn test_strict_accepts_plain_subqueries() {
    let gate = strict();
    assert!(gate.validate("SELECT * FROM (SELECT id FROM accounts) AS s"));
    assert!(gate.validate(
        "SELECT * FROM t WHERE id IN (SELECT id FROM accounts) AND NOT EXISTS (SELECT 1 FROM bans)"
    ));
}

#[test]
fn test_strict_rejects_multiple_statements() {
    assert_eq!(
        strict().check("SELECT 1; SELECT 2"),
        Err(Rejection::MultipleStatements(2))
    );
}

#[test]
fn test_strict_runs_keyword_policy_first() {
    assert_eq!(
        strict().check("select update_count from t"),
        Err(Rejection::ProhibitedKeyword("update"))
    );
}

#[test]
fn test_gate_mode_deserializes_lowercase() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        mode: GateMode
    }
    let parsed: Wrapper = toml::from_str("mode = \"strict\"").unwrap();
    assert_eq!(parsed.mode, GateMode::Strict);
}
