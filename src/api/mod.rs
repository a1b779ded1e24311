mod extract;
pub mod handlers;
pub mod response;
mod routes;

pub use extract::{CurrentUser, MaybeUser};
pub use routes::create_router;
