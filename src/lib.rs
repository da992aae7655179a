pub mod account;
pub mod cli;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod module_client;
pub mod modules;
pub mod move_types;
pub mod persist;
pub mod rest;
pub mod transaction;
