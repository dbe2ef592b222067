pub mod cli;
pub mod config;
pub mod contrast;
pub mod core;
pub mod dom;
pub mod engine;
pub mod exit;
pub mod filters;
pub mod guidance;
pub mod logging;
pub mod messages;
pub mod overlay;
pub mod report;
pub mod rules;
pub mod scan;
pub mod store;
pub mod tui;
pub mod ui;
