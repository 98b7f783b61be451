pub mod config;
pub mod descriptor;
pub mod label;
pub mod programs;
pub mod types;
pub mod workflow;
