pub mod cli;
pub mod load_config;
pub mod services;
pub mod surfaces;

pub use cli::{run, Cli, Commands};
