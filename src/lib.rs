// Allow non-snake_case names for JSON serialization compatibility with the web frontend
#![allow(non_snake_case)]

pub mod bridge;
pub mod commands;
pub mod error;
pub mod models;
pub mod rpc;
pub mod storage;

pub use error::{AppError, Result};
pub use rpc::{invoke, Reply};
pub use storage::{initStorage, Storage, StorageState};

pub const APP_NAME: &str = "Kanban Board";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
