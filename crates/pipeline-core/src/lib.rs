pub mod ai;
pub mod bottle;
pub mod claim;
pub mod config;
pub mod content;
pub mod create;
pub mod draft;
pub mod error;
pub mod io;
pub mod objects;
pub mod paths;
pub mod product;
pub mod queue;
pub mod review;
pub mod state;
pub mod store;
pub mod types;
pub mod user;
pub mod workflow;
pub mod workspace;

pub use error::{PipelineError, Result};
