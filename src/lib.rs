pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod tui;
pub mod utils;
pub mod views;

pub use config::Config;
pub use utils::Profile;
