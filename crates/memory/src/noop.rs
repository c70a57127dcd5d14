//! No-op cache — used when caching is disabled.

use async_trait::async_trait;
use calmwire_core::analysis::AnalysisResult;
use calmwire_core::cache::{CacheKey, ResponseCache};
use calmwire_core::error::CacheError;

/// A cache that never remembers anything.
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    fn name(&self) -> &str {
        "none"
    }

    async fn get(&self, _key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _result: AnalysisResult) -> Result<(), CacheError> {
        Ok(())
    }

    async fn len(&self) -> Result<usize, CacheError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
