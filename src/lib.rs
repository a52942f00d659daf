#![forbid(unsafe_code)]

pub mod actors;
pub mod app;
pub mod config;
pub mod lifecycle;
pub mod links;
pub mod models;
pub mod repository;
pub mod services;
pub mod side_effects;
pub mod utils;
