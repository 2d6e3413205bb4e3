pub mod cli;
pub mod config;
pub mod expander;
pub mod generator;
pub mod helpers;
pub mod parser;
pub mod profile;
pub mod routing;
pub mod settings;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
