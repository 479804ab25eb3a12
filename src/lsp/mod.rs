//! Sorbet language-server adapter for [`crate::hover::HoverService`].

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::LspClient;
