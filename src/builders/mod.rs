mod query;

pub use query::{Aggregate, QueryBuilder, SortOrder};
