pub mod search;

pub use search::{Comparison, NumericField, SearchFilter, parse_search};
