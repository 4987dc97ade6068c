pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod dest;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod load;
pub mod pipeline;
pub mod schema;
pub mod window;

pub use config::Config;
pub use error::TableError;
pub use pipeline::{execute, run, sync_table, RunContext, RunSummary, TableReport};
