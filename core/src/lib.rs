//! Overtime slot allocation and bumping engine.
//!
//! LAYERS (leaf first):
//!   types, config, clock   closed domain types, policy, injected time
//!   window                 time-window classification
//!   priority, weekend      occupant ordering and weekend part resolution
//!   store                  SQLite slot store, the only code that runs SQL
//!   engine                 signup decisions under the slot lock
//!   admin, roster          admin mutations and read-only views
//!   command                kiosk JSON protocol
//!   event, notifier        post-commit change notification

pub mod admin;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod notifier;
pub mod priority;
pub mod roster;
pub mod store;
pub mod types;
pub mod weekend;
pub mod window;
