pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod tls;
pub mod utils;

pub use router::build_router;
