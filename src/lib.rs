pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
