//! Account HTTP module: guarded account deletion.

mod dto;
mod handlers;
mod routes;

pub use handlers::AccountAppState;
pub use routes::account_routes;
