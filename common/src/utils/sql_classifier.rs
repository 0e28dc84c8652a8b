//! SQL statement classifier.
//!
//! Assigns a safety class to raw SQL text before it reaches a backend. This is
//! an allow-list, not a parser: only statements whose first keyword is
//! positively identified as `SELECT` or `INSERT` are accepted, everything
//! else is rejected.

use serde::Serialize;

/// Safety class of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatementClass {
    /// Read-only query returning rows.
    Read,
    /// Insert returning an affected-row count.
    Write,
    /// Anything the policy cannot positively identify.
    Rejected,
}

/// Classifies SQL statements.
pub struct SqlClassifier;

impl SqlClassifier {
    /// Classifies `sql` by its first keyword.
    ///
    /// Leading whitespace, `-- line` comments and `/* block */` comments are
    /// skipped. Text containing a second statement after a `;` is rejected, as
    /// is any MySQL executable comment (`/*!` or `/*M!`) anywhere in the text.
    pub fn classify(sql: &str) -> StatementClass {
        if sql.contains("/*!") || sql.contains("/*M!") {
            return StatementClass::Rejected;
        }
        let Some(start) = skip_trivia(sql, 0) else {
            return StatementClass::Rejected;
        };
        if start >= sql.len() {
            return StatementClass::Rejected;
        }

        let keyword: String = sql[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        let class = match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => StatementClass::Read,
            "INSERT" => StatementClass::Write,
            _ => return StatementClass::Rejected,
        };

        if has_trailing_statement(sql, start) {
            return StatementClass::Rejected;
        }
        class
    }

    /// Returns the leading keyword in upper case, used in rejection messages.
    pub fn leading_keyword(sql: &str) -> Option<String> {
        let start = skip_trivia(sql, 0)?;
        let keyword: String = sql[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if keyword.is_empty() {
            None
        } else {
            Some(keyword.to_ascii_uppercase())
        }
    }
}

/// Skips whitespace and comments from byte offset `pos`.
///
/// Returns `None` for a block comment that [`skip_block_comment`] refuses.
fn skip_trivia(sql: &str, mut pos: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes[pos..].starts_with(b"--") {
            match sql[pos..].find('\n') {
                Some(offset) => pos += offset + 1,
                None => return Some(bytes.len()),
            }
        } else if bytes[pos..].starts_with(b"/*") {
            pos = skip_block_comment(sql, pos)?;
        } else {
            return Some(pos);
        }
    }
}

/// Byte offset just past the block comment opening at `pos`.
///
/// `None` when the comment is unterminated or contains another `/*`. Postgres
/// nests block comments while MySQL and SQLite end them at the first `*/`, so a
/// nested opener leaves the comment's extent backend dependent.
fn skip_block_comment(sql: &str, pos: usize) -> Option<usize> {
    let body = pos + 2;
    let close = body + sql[body..].find("*/")?;
    // include the closer's `*` so `/*/*/` counts as nested
    if sql[body..=close].contains("/*") {
        return None;
    }
    Some(close + 2)
}

/// Whether anything other than trivia follows a `;` outside quotes/comments.
fn has_trailing_statement(sql: &str, start: usize) -> bool {
    let bytes = sql.as_bytes();
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'\'' | b'"' | b'`') => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                // unterminated quotes are left for the backend to reject
                pos += 1;
            }
            b'-' if bytes[pos..].starts_with(b"--") => match sql[pos..].find('\n') {
                Some(offset) => pos += offset + 1,
                None => return false,
            },
            b'/' if bytes[pos..].starts_with(b"/*") => match skip_block_comment(sql, pos) {
                Some(next) => pos = next,
                None => return true,
            },
            b';' => {
                return match skip_trivia(sql, pos + 1) {
                    Some(next) if next >= bytes.len() => false,
                    Some(next) if bytes[next] == b';' => has_trailing_statement(sql, next),
                    _ => true,
                };
            }
            _ => pos += 1,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_read() {
        assert_eq!(SqlClassifier::classify("SELECT * FROM users"), StatementClass::Read);
        assert_eq!(SqlClassifier::classify("  \n\tselect 1"), StatementClass::Read);
        assert_eq!(SqlClassifier::classify("SeLeCt 1;"), StatementClass::Read);
    }

    #[test]
    fn test_insert_is_write() {
        assert_eq!(
            SqlClassifier::classify("insert into t (a) values (1)"),
            StatementClass::Write
        );
    }

    #[test]
    fn test_everything_else_is_rejected() {
        for sql in [
            "UPDATE t SET a = 1",
            "DELETE FROM t",
            "DROP TABLE users",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "",
            "   ",
            "-- only a comment",
            "SELECTED FROM t",
            "(SELECT 1)",
            "/* /* */ SELECT 1 */ DELETE FROM t",
            "/*!UPDATE t SET a = 1 WHERE id IN (*/ SELECT id FROM u)",
        ] {
            assert_eq!(SqlClassifier::classify(sql), StatementClass::Rejected, "{sql}");
        }
    }

    #[test]
    fn test_leading_comments_are_skipped() {
        assert_eq!(
            SqlClassifier::classify("-- DROP TABLE users\nSELECT 1"),
            StatementClass::Read
        );
        assert_eq!(
            SqlClassifier::classify("/* SELECT */ DELETE FROM t"),
            StatementClass::Rejected
        );
        assert_eq!(
            SqlClassifier::classify("/* note */ -- x\n  INSERT INTO t VALUES (1)"),
            StatementClass::Write
        );
    }

    #[test]
    fn test_unterminated_block_comment_is_rejected() {
        assert_eq!(SqlClassifier::classify("/* SELECT 1"), StatementClass::Rejected);
    }

    #[test]
    fn test_nested_block_comments_are_rejected() {
        // Postgres runs only the DELETE here
        assert_eq!(
            SqlClassifier::classify("/* /* */ SELECT 1 */ DELETE FROM t"),
            StatementClass::Rejected
        );
        assert_eq!(
            SqlClassifier::classify("/* a /* b */ c */ SELECT 1"),
            StatementClass::Rejected
        );
        assert_eq!(SqlClassifier::classify("/*/*/ SELECT 1"), StatementClass::Rejected);
        assert_eq!(
            SqlClassifier::classify("SELECT 1 /* /* */ ; DELETE FROM t -- */"),
            StatementClass::Rejected
        );
        assert_eq!(SqlClassifier::classify("/**/ SELECT 1"), StatementClass::Read);
        assert_eq!(SqlClassifier::classify("/* a * / b */ SELECT 1"), StatementClass::Read);
    }

    #[test]
    fn test_executable_comments_are_rejected() {
        for sql in [
            "/*!UPDATE t SET a = 1 WHERE id IN (*/ SELECT id FROM u)",
            "SELECT 1 /*!50000 , SLEEP(10) */",
            "/*M!100000 DELETE FROM t */ SELECT 1",
            "INSERT INTO t VALUES (1) /*! ; DROP TABLE t */",
        ] {
            assert_eq!(SqlClassifier::classify(sql), StatementClass::Rejected, "{sql}");
        }
        // optimizer hints are plain comments
        assert_eq!(
            SqlClassifier::classify("SELECT /*+ MAX_EXECUTION_TIME(100) */ 1"),
            StatementClass::Read
        );
    }

    #[test]
    fn test_multi_statement_is_rejected() {
        assert_eq!(
            SqlClassifier::classify("SELECT 1; DROP TABLE users"),
            StatementClass::Rejected
        );
        assert_eq!(
            SqlClassifier::classify("SELECT 1; /* hidden */ DELETE FROM t"),
            StatementClass::Rejected
        );
    }

    #[test]
    fn test_semicolons_inside_literals_and_comments_are_ignored() {
        assert_eq!(
            SqlClassifier::classify("SELECT 'a;b', \"c;d\" FROM t -- trailing; note"),
            StatementClass::Read
        );
        assert_eq!(SqlClassifier::classify("SELECT 1 ;  -- done"), StatementClass::Read);
        assert_eq!(SqlClassifier::classify("SELECT 1;;"), StatementClass::Read);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let sql = "  SELECT name FROM t";
        assert_eq!(SqlClassifier::classify(sql), SqlClassifier::classify(sql));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(
            SqlClassifier::leading_keyword("/* x */ delete from t").as_deref(),
            Some("DELETE")
        );
        assert_eq!(SqlClassifier::leading_keyword("  "), None);
    }
}
