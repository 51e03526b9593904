pub mod identity;
pub mod pagination;
pub mod query;

pub use identity::ClientIdentity;
pub use pagination::{DeepPaginationError, DepthCap, PageWindow};
pub use query::{PageBounds, SearchRequest, SearchTerms, ValidationErrors, parse_search_request};
