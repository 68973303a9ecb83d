pub mod handlers;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod sessions;
pub mod ws;

pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage};
