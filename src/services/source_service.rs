use std::sync::Arc;

use gateway::{Gateway, Route};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::{ResetReport, Source};
use crate::errors::AppResult;
use crate::storage::Collection;

/// Source catalog maintenance.
pub struct SourceService {
    gateway: Arc<Gateway>,
    sources: Collection<Source>,
}

impl SourceService {
    pub fn new(gateway: Arc<Gateway>, sources: Collection<Source>) -> Self {
        Self { gateway, sources }
    }

    /// Restores the default catalog. With a backend, the catalog it returns
    /// replaces the local one.
    pub async fn reset_sources(&self) -> AppResult<ResetReport> {
        let sources = match self.reset_remote().await? {
            Some(sources) => self.sources.replace_all(sources).await?,
            None => self.sources.reset().await?,
        };

        info!(count = sources.len(), "reset sources");
        Ok(ResetReport {
            success: true,
            message: format!("{} fonte(s) restauradas para o conjunto padrão.", sources.len()),
            sources,
        })
    }

    /// `None` when there is no backend or it did not send a catalog.
    async fn reset_remote(&self) -> AppResult<Option<Vec<Source>>> {
        if !self.gateway.is_route_configured(Route::ResetSources) {
            return Ok(None);
        }

        let body = self.gateway.post(Route::ResetSources, &json!({})).await?;
        let Some(Value::Array(items)) = body.into_json().and_then(|mut json| json.get_mut("sources").map(Value::take))
        else {
            warn!("backend reset response carried no sources, restoring local defaults");
            return Ok(None);
        };

        let sources = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Source>(item) {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable source from backend");
                    None
                }
            })
            .collect();
        Ok(Some(sources))
    }

    pub async fn list(&self) -> AppResult<Vec<Source>> {
        self.sources.list(None, None).await
    }

    /// Flips `is_active` and returns the stored source.
    pub async fn toggle(&self, id: &str) -> AppResult<Source> {
        self.sources
            .update_with(id, |source| source.is_active = !source.is_active)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Record, UpdateMethod};
    use crate::errors::AppError;
    use crate::storage::BlobStore;
    use gateway::GatewayConfig;
    use std::time::Duration;

    fn setup() -> (SourceService, Collection<Source>) {
        let sources: Collection<Source> = Collection::new(BlobStore::in_memory()).with_latency(Duration::ZERO);
        let gateway = Arc::new(Gateway::new(GatewayConfig::new()).unwrap());
        (SourceService::new(gateway, sources.clone()), sources)
    }

    #[tokio::test]
    async fn test_reset_restores_defaults_locally() {
        let (service, sources) = setup();
        sources.clear().await.unwrap();
        sources.create(Source::new("Blog", UpdateMethod::Api)).await.unwrap();

        let report = service.reset_sources().await.unwrap();

        assert!(report.success);
        assert_eq!(report.sources.len(), 3);
        assert_eq!(report.message, "3 fonte(s) restauradas para o conjunto padrão.");
        assert_eq!(sources.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_toggle_flips_activation() {
        let (service, _) = setup();

        let toggled = service.toggle("source_forum").await.unwrap();
        assert!(toggled.is_active);

        let toggled = service.toggle("source_forum").await.unwrap();
        assert!(!toggled.is_active);
    }

    #[tokio::test]
    async fn test_toggle_unknown_source() {
        let (service, _) = setup();

        let result = service.toggle("nope").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (service, _) = setup();

        let listed = service.list().await.unwrap();

        assert_eq!(listed[0].id(), "source_receita");
    }
}
