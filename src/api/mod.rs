//! Client for the remote catalog/price source

pub mod client;

pub use client::{CardSource, HttpCardSource, DEFAULT_PAGE_SIZE};
