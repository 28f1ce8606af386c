//! Safety Validator Adversarial Corpus
//!
//! Hand-written adversarial SQL strings, including case-insensitive,
//! whitespace-obfuscated, and comment-obfuscated variants. Every entry
//! in the blocked corpus must raise at least one critical flag; every
//! entry in the safe corpus must raise none.

use quillspace_ai::{SchemaDescription, SqlSafetyValidator, TableSchema};

fn schema() -> SchemaDescription {
    SchemaDescription::new(vec![
        TableSchema::new("users", vec!["id", "name", "email", "created_at"]),
        TableSchema::new("orders", vec!["id", "user_id", "total", "status"]),
    ])
}

/// Statements that must always be blocked.
const BLOCKED: &[&str] = &[
    // DROP variants
    "DROP TABLE users",
    "drop table users",
    "DrOp TaBlE users",
    "DROP    TABLE    users",
    "drop\ntable\nusers",
    "drop\t\ttable\tusers",
    "DROP/**/TABLE users",
    "DROP /* harmless comment */ TABLE users",
    "DROP TABLE IF EXISTS users",
    "DROP DATABASE quillspace",
    "drop database quillspace",
    "DROP SCHEMA public",
    // TRUNCATE variants
    "TRUNCATE users",
    "TRUNCATE TABLE users",
    "truncate\ttable users",
    "TrUnCaTe users",
    // DELETE without WHERE
    "DELETE FROM users",
    "delete from users",
    "DELETE\n\nFROM\nusers",
    "delete /* all of them */ from users",
    // UPDATE without WHERE
    "UPDATE users SET name = 'x'",
    "update users set email = NULL",
    // Unknown schema objects
    "SELECT * FROM secrets",
    "SELECT password FROM users WHERE id = 1",
    // Smuggled behind a harmless statement
    "SELECT id FROM users WHERE id = 1; DROP TABLE users",
    "SELECT id FROM users WHERE id = 1; DELETE FROM orders",
];

/// Statements that must pass with no critical flag.
const SAFE: &[&str] = &[
    "SELECT id, name FROM users WHERE id = 1 LIMIT 10",
    "SELECT email FROM users WHERE created_at > '2024-01-01' LIMIT 50",
    "DELETE FROM users WHERE id = 42",
    "UPDATE users SET name = 'x' WHERE id = 42",
    "SELECT u.name, o.total FROM users u JOIN orders o ON u.id = o.user_id WHERE o.status = 'paid' LIMIT 25",
    "SELECT count(*) FROM orders WHERE status = 'open' LIMIT 1",
];

#[test]
fn test_blocked_corpus_is_fully_blocked() {
    let validator = SqlSafetyValidator::default();
    let schema = schema();

    assert!(BLOCKED.len() >= 20, "corpus must stay adversarial");
    for sql in BLOCKED {
        let flags = validator.validate(sql, &schema);
        assert!(
            flags.iter().any(|f| f.is_critical()),
            "expected a critical flag for {:?}, got {:?}",
            sql,
            flags
        );
    }
}

#[test]
fn test_safe_corpus_raises_no_criticals() {
    let validator = SqlSafetyValidator::default();
    let schema = schema();

    for sql in SAFE {
        let flags = validator.validate(sql, &schema);
        assert!(
            !flags.iter().any(|f| f.is_critical()),
            "unexpected critical flag for {:?}: {:?}",
            sql,
            flags
        );
    }
}

#[test]
fn test_safe_corpus_reparses() {
    let validator = SqlSafetyValidator::default();
    for sql in SAFE {
        validator.parse(sql).expect("safe statement parses");
    }
}

#[test]
fn test_validation_is_deterministic() {
    let validator = SqlSafetyValidator::default();
    let schema = schema();
    for sql in BLOCKED.iter().chain(SAFE) {
        let first = validator.validate(sql, &schema);
        let second = validator.validate(sql, &schema);
        assert_eq!(first, second, "validation diverged for {:?}", sql);
    }
}
