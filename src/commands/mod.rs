// Commands module - exports all command handlers
// One submodule per area of the RPC surface; rpc::invoke routes to them

pub mod app;
pub mod attachment;
pub mod backup;
pub mod bundle;
pub mod common;
pub mod data;
pub mod dialog;
pub mod notification;
pub mod settings;
