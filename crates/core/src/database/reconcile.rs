//! Design-document reconciliation.
//!
//! Publishing a design document is idempotent: absent documents are
//! created, changed documents are updated, identical documents are left
//! untouched. A racing writer surfaces as a revision conflict; the first
//! conflict triggers exactly one retry of the whole protocol, which reads
//! the winner's revision and either converges as a no-op or republishes on
//! top of it. A second conflict is fatal.

use super::{AccessOptions, Database, ReconcileOptions};
use crate::Error;
use crate::design::DesignDocument;
use crate::error::StatusClass;

impl Database {
    /// Ensure the given design document exists in the store with the
    /// desired content.
    ///
    /// Returns the newly written revision, or `None` when the stored
    /// content already matched and no write was performed. On a successful
    /// write the design is registered under its name for
    /// [`view`](Database::view) validation; a no-op leaves the registry
    /// as-is.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` when a concurrent writer wins both attempts (or
    /// the single retry is disabled via `options`); translated store
    /// errors otherwise.
    pub async fn insert_design(
        &self,
        design: &DesignDocument,
        options: ReconcileOptions,
    ) -> Result<Option<String>, Error> {
        tracing::debug!(db = %self.name, design = design.name(), "reconciling design document");

        let mut is_retry = false;
        loop {
            // Always read the store directly; a cached design document
            // could carry a stale revision and guarantee a conflict.
            let existing = match self.get(design.id(), AccessOptions::no_cache()).await {
                Ok(document) => Some(document),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err),
            };

            if let Some(existing) = &existing
                && existing.content_fingerprint() == design.fingerprint()
            {
                tracing::debug!(
                    design = design.name(),
                    rev = existing.rev(),
                    "design document unchanged"
                );
                return Ok(None);
            }

            let mut desired = design.document().clone();
            match existing.as_ref().and_then(|document| document.rev()) {
                Some(rev) => {
                    desired.set_rev(rev);
                }
                None => {
                    desired.clear_rev();
                }
            }

            match self.store.insert(&desired).await {
                Ok(rev) => {
                    self.designs.write().await.insert(design.name().to_string(), design.clone());
                    tracing::info!(design = design.name(), rev = %rev, "updated design document");
                    return Ok(Some(rev));
                }
                Err(err) if err.status() == StatusClass::Conflict => {
                    if is_retry || !options.retry_on_conflict {
                        return Err(Error::Conflict(format!(
                            "failed to update design document \"{}\": update conflict",
                            design.name()
                        )));
                    }
                    tracing::debug!(
                        design = design.name(),
                        "design document conflict; retrying once"
                    );
                    is_retry = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
