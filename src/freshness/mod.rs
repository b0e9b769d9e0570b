//! Change detection: blake3 content fingerprints gate modify notifications.

mod cache;
mod hash;

pub use cache::ChangeCache;
