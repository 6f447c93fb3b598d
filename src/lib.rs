//! Reddit client with cached feed controllers and polling change monitors.

pub mod cli;
pub mod client;
pub mod config;
pub mod controllers;
pub mod models;
pub mod monitor;
pub mod operations;
