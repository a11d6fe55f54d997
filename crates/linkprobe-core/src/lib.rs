pub mod config;
pub mod logging;

pub mod artifact;
pub mod codec;
pub mod engine;
pub mod host;
pub mod local;
pub mod playlist;
pub mod service;
pub mod session;
pub mod task;
