pub mod advanced_results;

pub use advanced_results::{advanced_results, ListQuery, Pagination};
