//! drillbook: coaching session planner.
//!
//! The heart of the crate is [`composer`], which splits a session's minutes
//! across training components, lets the coach retime them, and tracks which
//! catalog drills fill each component. The remaining modules host it: a
//! SQLite catalog and saved-session store ([`db`]), an HTTP API ([`api`]),
//! and a client for remote catalogs ([`client`]).

pub mod api;
pub mod backend;
pub mod client;
pub mod composer;
pub mod config;
pub mod db;
pub mod models;
