use crate::clauses::Operator;

/// Join flavor; rendered as the corresponding SQL keyword pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// A single join fragment. Either a full ON predicate over two columns, or a
/// raw join expression with no generated ON clause. All text is trusted
/// caller input.
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    target: String,
    on: Option<String>,
}

impl Join {
    pub fn on(kind: JoinKind, table: &str, first: &str, op: Operator, second: &str) -> Self {
        Self {
            kind,
            target: table.to_string(),
            on: Some(format!("{} {} {}", first, op.as_sql(), second)),
        }
    }

    pub fn raw(kind: JoinKind, expression: &str) -> Self {
        Self {
            kind,
            target: expression.to_string(),
            on: None,
        }
    }

    pub(crate) fn push_sql(&self, sql: &mut String) {
        sql.push_str(self.kind.as_sql());
        sql.push(' ');
        sql.push_str(&self.target);
        if let Some(on) = &self.on {
            sql.push_str(" ON ");
            sql.push_str(on);
        }
    }
}
