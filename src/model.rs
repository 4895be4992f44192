mod app_config;
mod university;

pub use app_config::*;
pub use university::*;
