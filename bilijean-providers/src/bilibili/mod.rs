//! Bilibili web API client

pub mod client;
pub mod format;
pub mod service;
pub mod types;

pub use client::{BilibiliClient, DEFAULT_API_BASE};
pub use format::FormatNumberValue;
pub use service::{BilibiliInterface, NOT_LOGGED_IN_CODE};
