mod condition;
mod join;

pub use condition::{Condition, Operator, SearchGroup};
pub use join::{Join, JoinKind};
