pub mod constants;
pub mod errors;
pub mod extent;
pub mod models;
pub mod mtime;
pub mod node;

pub use extent::Extent;
pub use mtime::{next_modified_time, MTime, TimeStamp};

// Re-exports
pub use indexmap;
pub use log;
pub use parking_lot;
#[macro_use]
pub extern crate prettytable;
pub use schemars;
pub use serde;
pub use serde_json;
pub use serde_yaml;
pub use thiserror;
pub use tracing;
