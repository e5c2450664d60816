use std::fmt;

/// Represents a SQL parameter or result value in a driver-agnostic way.
/// Drivers are responsible for converting these to and from their native types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
}

impl SqlValue {
    /// Returns the value as an i64 where it carries one.
    /// Textual values are parsed, since some backends report counts as text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int32(v) => Some(i64::from(*v)),
            SqlValue::Int64(v) => Some(*v),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Int32(v) => write!(f, "{}", v),
            SqlValue::Int64(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_i64_parses_text() {
        assert_eq!(SqlValue::Text("42".to_string()).as_i64(), Some(42));
        assert_eq!(SqlValue::Int32(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3)), SqlValue::Int32(3));
    }
}
