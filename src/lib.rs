pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod ui;
pub mod wizard;
