mod row;
mod sql_value;

pub use row::{RawQueryResult, Row};
pub use sql_value::SqlValue;
