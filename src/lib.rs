pub mod activity;
pub mod alerts;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod control;
pub mod error;
pub mod sensors;
pub mod store;
