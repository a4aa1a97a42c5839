mod error;
pub use error::*;

pub mod account;
pub mod api;
pub mod config;
pub mod crypto;
pub mod database;
pub mod forms;
pub mod menu;
pub mod models;
pub(crate) mod time_utils;
pub mod ui;
