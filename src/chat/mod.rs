//! Generic typed chat client over a WebSocket transport.

pub mod client;

pub use client::{Client, DecodeFn, EncodeFn};
