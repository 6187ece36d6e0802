pub mod config;
pub mod decision;
pub mod drift;
pub mod review;
pub mod types;
