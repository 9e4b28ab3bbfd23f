//! Read-only statement guard.
//!
//! The model is *instructed* to produce a single SELECT, and the database
//! role behind the execution function is expected to be read-only, but
//! neither is enforced by this process. This guard closes that gap: a
//! statement that is not provably a single read-only query never leaves the
//! process.
//!
//! The check is deliberately conservative. Comments and string literals are
//! stripped first, then the statement must start with SELECT or WITH, must
//! not contain a second statement, and must not contain any data-modifying
//! keyword anywhere (which also catches `SELECT ... FOR UPDATE` and
//! modifying CTEs).

use once_cell::sync::Lazy;
use regex::Regex;

use geny_utils::error::StoreError;

static DENIED_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(insert|update|delete|merge|upsert|drop|alter|create|grant|revoke|truncate|copy|vacuum|execute|call|do|lock|listen|notify|refresh|reindex|cluster|comment|set|reset|prepare|deallocate)\b",
    )
    .unwrap()
});

/// Validate that `sql` is a single read-only statement.
///
/// # Errors
///
/// Returns `StoreError::QueryRejected` naming the reason; the statement must
/// not be executed afterwards.
pub fn ensure_read_only(sql: &str) -> Result<(), StoreError> {
    let stripped = strip_comments_and_literals(sql);
    let body = stripped.trim();

    if body.is_empty() {
        return Err(StoreError::QueryRejected(
            "empty statement".to_string(),
        ));
    }

    // A single trailing semicolon is tolerated; anything after it is not.
    let body = body.strip_suffix(';').unwrap_or(body).trim_end();
    if body.contains(';') {
        return Err(StoreError::QueryRejected(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let first_word: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    if first_word != "SELECT" && first_word != "WITH" {
        return Err(StoreError::QueryRejected(format!(
            "only SELECT statements are allowed, found '{first_word}'"
        )));
    }

    if let Some(found) = DENIED_KEYWORD_RE.find(body) {
        return Err(StoreError::QueryRejected(format!(
            "statement contains forbidden keyword '{}'",
            found.as_str().to_ascii_uppercase()
        )));
    }

    Ok(())
}

/// Remove `--` line comments, `/* */` block comments, and the contents of
/// single-quoted literals so keyword scanning sees only structure.
fn strip_comments_and_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '\'' => {
                // Consume the literal, honoring '' escapes.
                loop {
                    match chars.next() {
                        Some('\'') => {
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                out.push_str("''");
            }
            _ => out.push(c),
        }
    }

    out
}
