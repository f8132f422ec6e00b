//! Playlist PCM streaming engine.
//!
//! Walks a music directory, normalizes every track to 44.1 kHz 16-bit PCM and
//! serves the result as exactly-sized frame blocks to a downstream consumer,
//! with transport controls that can be used while the stream is being pulled.

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod mpris;
pub mod runtime;
pub mod ui;

pub use error::{Error, Result};
