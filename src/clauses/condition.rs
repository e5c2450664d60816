use crate::types::SqlValue;

/// Comparison operator for a parameterized predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

/// A single WHERE predicate fragment.
///
/// Each variant renders its SQL text with `?` placeholders and pushes its
/// bindings in the same pass, so placeholder order and binding order cannot
/// drift apart.
#[derive(Debug, Clone)]
pub enum Condition {
    /// column op ?
    Compare {
        column: String,
        op: Operator,
        value: SqlValue,
    },
    /// column IN (?, ?, …)
    In {
        column: String,
        values: Vec<SqlValue>,
    },
    /// column IS NULL
    IsNull { column: String },
    /// column IS NOT NULL
    IsNotNull { column: String },
    /// Opaque predicate text, no bindings. Trusted caller input.
    Fragment { sql: String },
    /// (left OR right)
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Appends this fragment's SQL and bindings.
    pub(crate) fn push_sql(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        match self {
            Condition::Compare { column, op, value } => {
                sql.push_str(column);
                sql.push(' ');
                sql.push_str(op.as_sql());
                sql.push_str(" ?");
                params.push(value.clone());
            }
            Condition::In { column, values } => {
                sql.push_str(column);
                sql.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    params.push(value.clone());
                }
                sql.push(')');
            }
            Condition::IsNull { column } => {
                sql.push_str(column);
                sql.push_str(" IS NULL");
            }
            Condition::IsNotNull { column } => {
                sql.push_str(column);
                sql.push_str(" IS NOT NULL");
            }
            Condition::Fragment { sql: fragment } => {
                sql.push_str(fragment);
            }
            Condition::Or(left, right) => {
                sql.push('(');
                left.push_sql(sql, params);
                sql.push_str(" OR ");
                right.push_sql(sql, params);
                sql.push(')');
            }
        }
    }

    /// True when some nested `In` variant carries no values, which would
    /// compile to invalid `IN ()` SQL.
    pub(crate) fn has_empty_in(&self) -> bool {
        match self {
            Condition::In { values, .. } => values.is_empty(),
            Condition::Or(left, right) => left.has_empty_in() || right.has_empty_in(),
            _ => false,
        }
    }
}

/// One multi-column fuzzy-search group: `(c1 LIKE ? OR c2 LIKE ? …)`,
/// binding `%value%` once per column.
#[derive(Debug, Clone)]
pub struct SearchGroup {
    pub columns: Vec<String>,
    pub value: String,
}

impl SearchGroup {
    pub(crate) fn push_sql(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        sql.push('(');
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str(column);
            sql.push_str(" LIKE ?");
            params.push(SqlValue::Text(format!("%{}%", self.value)));
        }
        sql.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(condition: &Condition) -> (String, Vec<SqlValue>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        condition.push_sql(&mut sql, &mut params);
        (sql, params)
    }

    #[test]
    fn test_compare() {
        let condition = Condition::Compare {
            column: "name".to_string(),
            op: Operator::Eq,
            value: SqlValue::from("John"),
        };
        let (sql, params) = render(&condition);
        assert_eq!(sql, "name = ?");
        assert_eq!(params, vec![SqlValue::Text("John".to_string())]);
    }

    #[test]
    fn test_in_list() {
        let condition = Condition::In {
            column: "id".to_string(),
            values: vec![SqlValue::Int32(1), SqlValue::Int32(2), SqlValue::Int32(3)],
        };
        let (sql, params) = render(&condition);
        assert_eq!(sql, "id IN (?, ?, ?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let (sql, params) = render(&Condition::IsNull {
            column: "deleted_at".to_string(),
        });
        assert_eq!(sql, "deleted_at IS NULL");
        assert!(params.is_empty());

        let (sql, params) = render(&Condition::IsNotNull {
            column: "email".to_string(),
        });
        assert_eq!(sql, "email IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_or_combination_binds_left_then_right() {
        let condition = Condition::Or(
            Box::new(Condition::Compare {
                column: "a".to_string(),
                op: Operator::Eq,
                value: SqlValue::Int32(1),
            }),
            Box::new(Condition::Compare {
                column: "b".to_string(),
                op: Operator::Eq,
                value: SqlValue::Int32(2),
            }),
        );
        let (sql, params) = render(&condition);
        assert_eq!(sql, "(a = ? OR b = ?)");
        assert_eq!(params, vec![SqlValue::Int32(1), SqlValue::Int32(2)]);
    }

    #[test]
    fn test_empty_in_is_detected_through_or() {
        let condition = Condition::Or(
            Box::new(Condition::Compare {
                column: "a".to_string(),
                op: Operator::Eq,
                value: SqlValue::Int32(1),
            }),
            Box::new(Condition::In {
                column: "id".to_string(),
                values: vec![],
            }),
        );
        assert!(condition.has_empty_in());
    }

    #[test]
    fn test_search_group() {
        let group = SearchGroup {
            columns: vec!["name".to_string(), "email".to_string()],
            value: "bob".to_string(),
        };
        let mut sql = String::new();
        let mut params = Vec::new();
        group.push_sql(&mut sql, &mut params);
        assert_eq!(sql, "(name LIKE ? OR email LIKE ?)");
        assert_eq!(
            params,
            vec![
                SqlValue::Text("%bob%".to_string()),
                SqlValue::Text("%bob%".to_string()),
            ]
        );
    }
}
