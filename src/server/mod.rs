mod handlers;
mod page;
mod responses;
mod server;

pub use responses::ApiError;
pub use server::{AppState, StationServer, StationServerBuilder};
