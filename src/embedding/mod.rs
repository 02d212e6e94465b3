//! Embedding generation and caching.
//!
//! Turning text into vectors is the latency-bound resource of this core:
//! every call crosses into an external provider (or an in-process model
//! behind a blocking boundary). The cache in this module guarantees that
//! identical normalized text is never re-embedded while an entry is live.

mod cache;
mod provider;

pub use cache::{EmbeddingCache, fingerprint, normalize_text};
pub use provider::{EmbeddingProvider, FastEmbedProvider};

#[cfg(test)]
pub(crate) use provider::testing;
