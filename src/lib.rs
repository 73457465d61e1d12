pub mod config;
pub mod db;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod schema;
pub mod zones;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use pipeline::{run, Summary};
