//! Demand-driven execution of visualization pipelines.
//!
//! Algorithms are added to a [`Dag`] and connected port to port. A
//! [`DagExecutor`](executor::DagExecutor) brings any output up to date by sending the four
//! pipeline requests through the nodes it depends on, executing only the nodes whose
//! parameters, inputs or requests changed since they last ran.

pub mod as_any;
pub mod collector;
mod dag_impl;
pub use dag_impl::*;
pub mod data_object;
mod error_manager;
pub use error_manager::ErrorManager;
pub mod errors;
pub mod executor;
pub mod information;
pub mod node;
pub mod trivial_producer;


pub use daggy::{self, petgraph};
