//! Resolution of relative markdown and wiki link references into files and
//! repository URLs, with memoized references invalidated by rename notifications.

pub mod cache;
pub mod changes;
pub mod check;
pub mod config;
pub mod document;
pub mod error;
pub mod file_reference;
pub mod file_system;
pub mod path_info;
pub mod path_resolver;
pub mod repository;
pub mod rule;
pub mod scanner;
pub mod strategy;
pub mod workspace;

pub use error::Error;
