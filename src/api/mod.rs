pub mod error;
pub mod handlers;
pub mod routes;

pub use handlers::AppContext;
pub use routes::routes;
