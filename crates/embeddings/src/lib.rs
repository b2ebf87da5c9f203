//! # ctxai Embeddings
//!
//! Pluggable embedding providers behind a single async trait.
//!
//! Three real backends plus a deterministic stub:
//! - **local**: FastEmbed models running in-process (no network after
//!   the first download)
//! - **openai**: any OpenAI-compatible `/embeddings` endpoint
//! - **huggingface**: the Hugging Face inference API
//! - **stub**: hash-derived vectors for tests and offline smoke runs
//!
//! Local failures are fatal (a broken model breaks every batch); remote
//! failures are retried with bounded backoff and then reported per
//! batch, so one bad batch does not sink the run.

mod error;
mod factory;
mod local;
mod provider;
mod remote;
mod stub;

pub use error::{EmbeddingError, Result};
pub use factory::{create_provider, ProviderConfig, ProviderKind};
pub use local::LocalProvider;
pub use provider::EmbeddingProvider;
pub use remote::{HuggingFaceProvider, OpenAiProvider};
pub use stub::StubProvider;
