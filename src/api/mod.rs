pub mod endpoints;
pub mod error;
pub mod router;

pub use endpoints::ApiContext;
pub use error::ApiError;
pub use router::build_router;
