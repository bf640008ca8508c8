#[path = "../common/mod.rs"]
mod common;

mod catalog;
mod config;
mod hierarchy;
mod lifecycle;
mod mock_tracer;
