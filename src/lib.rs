pub mod prelude;
pub mod error;
pub mod config;
pub mod divider;
pub mod builder;
pub mod scene;
