//! Primary/legacy executor pair.
//!
//! Tries the primary executor and, when it fails for a reason the legacy
//! surface might not share, retries once on the legacy executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{Completion, ExecutionOptions, ProviderExecutor};
use crate::types::{Message, Provider};
use crate::{OrchestratorError, Result};

/// Executor that falls back from a primary to a legacy API surface.
pub struct TieredExecutor {
    primary: Arc<dyn ProviderExecutor>,
    legacy: Arc<dyn ProviderExecutor>,
}

impl TieredExecutor {
    pub fn new(primary: Arc<dyn ProviderExecutor>, legacy: Arc<dyn ProviderExecutor>) -> Self {
        Self { primary, legacy }
    }
}

/// Errors the legacy surface would reproduce.
fn shared_by_legacy(err: &OrchestratorError) -> bool {
    matches!(
        err,
        OrchestratorError::ContentFiltered { .. }
            | OrchestratorError::AuthenticationFailed
            | OrchestratorError::InvalidInput(_)
    )
}

#[async_trait]
impl ProviderExecutor for TieredExecutor {
    fn provider(&self) -> Provider {
        self.primary.provider()
    }

    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        options: &ExecutionOptions,
    ) -> Result<Completion> {
        let primary_err = match self.primary.complete(messages, model, options).await {
            Ok(completion) => return Ok(completion),
            Err(e) if shared_by_legacy(&e) => return Err(e),
            Err(e) => e,
        };

        warn!(
            primary = self.primary.name(),
            legacy = self.legacy.name(),
            error = %primary_err,
            "primary API failed, trying legacy API"
        );
        match self.legacy.complete(messages, model, options).await {
            Ok(mut completion) => {
                completion.warnings.push(format!(
                    "{} primary API failed ({primary_err}); served by legacy API",
                    self.primary.name()
                ));
                Ok(completion)
            }
            Err(legacy_err) => {
                warn!(error = %legacy_err, "legacy API failed");
                Err(primary_err)
            }
        }
    }
}
