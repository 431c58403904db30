// tailnet-admin: Tailscale tailnet administration
// Exposes the tag engine and its API client as a library

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod executor;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod tag;
