//! Options resolution: layered configuration for a document snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::contract::{ConfigurationService, ServiceError};
use crate::document::{Configuration, Document, DocumentId};
use crate::error::PipelineError;

/// Resolves the effective [`Configuration`] for a document, honouring cancellation.
#[derive(Clone)]
pub struct OptionsResolver {
    service: Arc<dyn ConfigurationService>,
    defaults: Configuration,
}

impl OptionsResolver {
    /// `defaults` is returned whenever the service fails for a reason other than cancellation.
    pub fn new(service: Arc<dyn ConfigurationService>, defaults: Configuration) -> Self {
        Self { service, defaults }
    }

    pub async fn resolve(
        &self,
        document: &Document,
        token: CancellationToken,
    ) -> Result<Configuration, PipelineError> {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        debug!(document = %document.id, project = %document.project, "[OPTIONS] Resolving options");
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            result = self.service.get_options(document, token.clone()) => result,
        };
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match result {
            Ok(config) => {
                info!(document = %document.id, keys = config.len(), "[OPTIONS] Options resolved");
                Ok(config)
            }
            Err(e) => {
                warn!(
                    document = %document.id,
                    error = %e,
                    "[OPTIONS] Falling back to default options"
                );
                Ok(self.defaults.clone())
            }
        }
    }
}

/// [`ConfigurationService`] over global, workspace, project and document layers.
///
/// Later layers override earlier ones key by key.
#[derive(Debug, Clone, Default)]
pub struct LayeredOptionStore {
    global: Configuration,
    workspace: Configuration,
    projects: HashMap<String, Configuration>,
    documents: HashMap<DocumentId, Configuration>,
}

impl LayeredOptionStore {
    pub fn new(global: Configuration) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    pub fn with_workspace(mut self, workspace: Configuration) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_project(mut self, name: impl Into<String>, config: Configuration) -> Self {
        self.projects.insert(name.into(), config);
        self
    }

    pub fn with_document(mut self, id: DocumentId, config: Configuration) -> Self {
        self.documents.insert(id, config);
        self
    }

    pub fn defaults(&self) -> &Configuration {
        &self.global
    }

    /// Synchronous merge of all layers applying to `document`.
    pub fn resolve_for(&self, document: &Document) -> Configuration {
        let mut effective = self.global.clone();
        effective.merge(&self.workspace);
        if let Some(project) = self.projects.get(&document.project) {
            effective.merge(project);
        }
        if let Some(overrides) = self.documents.get(&document.id) {
            effective.merge(overrides);
        }
        effective
    }
}

#[async_trait]
impl ConfigurationService for LayeredOptionStore {
    async fn get_options(
        &self,
        document: &Document,
        _token: CancellationToken,
    ) -> Result<Configuration, ServiceError> {
        Ok(self.resolve_for(document))
    }
}
