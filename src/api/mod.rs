pub mod error;
pub mod handlers;
pub mod page;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, serve, AppState};
