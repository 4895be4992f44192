pub mod cache;
pub mod cors;
