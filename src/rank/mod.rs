pub mod archive;
pub mod audit;
pub mod cache;
pub mod config;
pub mod consolidate;
pub mod export;
pub mod lock;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod report_writer;
pub mod reshape;
pub mod schema;
pub mod selector;
pub mod util;
pub mod warn;
