//! # SchoolHub Application Library
//!
//! The async shell around `schoolhub-core`: HTTP API, CLI, configuration
//! and the notification poller. Exposed as a library so integration tests
//! can build the router without binding a socket.

pub mod api;
pub mod cli;
pub mod config;
pub mod scheduler;
