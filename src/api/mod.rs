pub mod actor;
pub mod branch_handlers;
pub mod handlers;
pub mod merge_handlers;
pub mod routes;

pub use branch_handlers::*;
pub use handlers::*;
pub use merge_handlers::*;
pub use routes::*;
