pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod memory;
pub mod object_id;
pub mod recipes;
pub mod state;

pub use app::build_app;
pub use state::AppState;
