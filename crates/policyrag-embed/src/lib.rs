//! Embedding providers: BGE-M3 through Candle, plus a hashing embedder for
//! tests and model-free runs.

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

use anyhow::{bail, Result};

use policyrag_core::config::EmbeddingSettings;
use policyrag_core::traits::Embedder;

pub use hash::HashEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing embedder regardless of configuration.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake {
        tracing::info!(dim = settings.dim, "using hash embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Box::new(HashEmbedder::new(settings.dim)));
    }
    match settings.provider.as_str() {
        "hash" => Ok(Box::new(HashEmbedder::new(settings.dim))),
        "local" => Ok(Box::new(EmbeddingModel::new(settings)?)),
        other => bail!("unknown embedding provider '{other}' (expected 'local' or 'hash')"),
    }
}
