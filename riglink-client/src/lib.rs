//! RigLink Operator Engine
//!
//! Duplex audio transport and PTT synchronization for operating a remote
//! transceiver over WebSockets. The [`session`] module is the public entry
//! point; the rest are its building blocks, exposed for embedding
//! applications and integration testing.

pub mod args;
pub mod audio;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod jitter;
pub mod ptt;
pub mod session;
pub mod telemetry;
