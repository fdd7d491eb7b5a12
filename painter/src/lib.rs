pub mod api;
pub mod config;
pub mod connection;
pub mod defend;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod notify;
pub mod quantize;
pub mod scheduler;
pub mod seed;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{Config, Pacing};
pub use error::PainterError;
pub use scheduler::{Placer, PlacerState, Strategy};
pub use session::Session;
