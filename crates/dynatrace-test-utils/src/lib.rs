pub mod helpers;
pub mod mock_query;

pub use helpers::*;
pub use mock_query::MockQueryService;
