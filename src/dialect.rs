/// SQL dialect of a backend. Dialect differences are resolved entirely by the
/// statement compiler; drivers only report which dialect they speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Rewrites the compiler's canonical `?` placeholders into the backend's
    /// native form. SQLite takes `?` as-is; PostgreSQL wants numbered `$n`
    /// placeholders, assigned left to right.
    ///
    /// Question marks inside single-quoted literals are left untouched.
    pub fn finalize(&self, sql: &str) -> String {
        match self {
            Dialect::Sqlite => sql.to_string(),
            Dialect::Postgres => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut position = 0usize;
                let mut in_literal = false;
                for ch in sql.chars() {
                    match ch {
                        '\'' => {
                            in_literal = !in_literal;
                            out.push(ch);
                        }
                        '?' if !in_literal => {
                            position += 1;
                            out.push('$');
                            out.push_str(&position.to_string());
                        }
                        _ => out.push(ch),
                    }
                }
                out
            }
        }
    }

    /// The expression used for random row ordering.
    pub fn random_order(&self) -> &'static str {
        match self {
            Dialect::Postgres => "RANDOM()",
            Dialect::Sqlite => "RANDOM()",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_keeps_question_marks() {
        let sql = "SELECT * FROM users WHERE a = ? AND b = ?";
        assert_eq!(Dialect::Sqlite.finalize(sql), sql);
    }

    #[test]
    fn test_postgres_numbers_placeholders_in_order() {
        let sql = "SELECT * FROM users WHERE a = ? AND b IN (?, ?)";
        assert_eq!(
            Dialect::Postgres.finalize(sql),
            "SELECT * FROM users WHERE a = $1 AND b IN ($2, $3)"
        );
    }

    #[test]
    fn test_postgres_skips_quoted_literals() {
        let sql = "SELECT * FROM users WHERE a = '?' AND b = ?";
        assert_eq!(
            Dialect::Postgres.finalize(sql),
            "SELECT * FROM users WHERE a = '?' AND b = $1"
        );
    }
}
