use crate::{CatalogSource, ClientError};
use scanwiz_core::{CatalogKind, ResourceCatalogs};
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches the model, environment, and probe catalogs.
///
/// Failures never propagate: the affected catalog comes back empty with an
/// issue attached, and the others are unaffected.
#[derive(Clone)]
pub struct ResourceCatalogClient {
    source: Arc<dyn CatalogSource>,
}

impl ResourceCatalogClient {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    pub async fn load(&self) -> ResourceCatalogs {
        let (models, environments, probes) = tokio::join!(
            self.source.models(),
            self.source.environments(),
            self.source.probes(),
        );

        let mut catalogs = ResourceCatalogs::default();

        match flatten(models.map(|r| (r.models, r.error))) {
            Ok(models) => catalogs.models = models,
            Err(reason) => degrade(&mut catalogs, CatalogKind::Models, reason),
        }
        match flatten(environments.map(|r| (r.environments, r.error))) {
            Ok(environments) => catalogs.environments = environments,
            Err(reason) => degrade(&mut catalogs, CatalogKind::Environments, reason),
        }
        match flatten(probes.map(|r| (r.probes, r.error))) {
            Ok(probes) => catalogs.probes = probes,
            Err(reason) => degrade(&mut catalogs, CatalogKind::Probes, reason),
        }

        info!(
            models = catalogs.models.len(),
            environments = catalogs.environments.len(),
            probes = catalogs.probes.len(),
            "Loaded resource catalogs"
        );
        catalogs
    }
}

/// A listing that reports an error is treated as failed even if it carries items.
fn flatten<T>(result: Result<(Vec<T>, Option<String>), ClientError>) -> Result<Vec<T>, String> {
    match result {
        Ok((_, Some(reported))) => Err(ClientError::Reported(reported).to_string()),
        Ok((items, None)) => Ok(items),
        Err(e) => Err(e.to_string()),
    }
}

fn degrade(catalogs: &mut ResourceCatalogs, kind: CatalogKind, reason: String) {
    warn!("Failed to fetch {}: {}", kind.label(), reason);
    catalogs.degrade(kind, reason);
}
