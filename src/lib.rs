pub mod cli;
pub mod client;
pub mod config;
pub mod contract;
pub mod editor;
pub mod errors;
pub mod fixtures;
pub mod form;
pub mod list;
pub mod load_config;
pub mod model;
pub mod routes;
pub mod scope;
pub mod shell;
pub mod slug;

pub use cli::{run, Cli, Commands};
