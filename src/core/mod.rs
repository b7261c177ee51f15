pub mod config;
pub mod context;
pub mod event;
pub mod message;
pub mod view;
