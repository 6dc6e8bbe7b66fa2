//! Version label allocation.
//!
//! Labels are never reused, so each deployment needs a fresh
//! `{base}-{n}`. The bucket itself is the record of which labels are
//! taken: a label is free exactly when no bundle object exists under
//! its key.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DeployError, DeployResult, DeployStage};
use crate::store::BundleStore;

/// Upper bound on candidate labels probed per allocation.
pub const MAX_LABEL_ATTEMPTS: usize = 100;

/// A label that was free at probe time, plus the object key derived
/// from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedLabel {
    /// `{label_base}-{n}`.
    pub full_label: String,
    /// `{full_label}.zip`.
    pub key: String,
}

/// Finds the first free `{label_base}-{n}` by probing the bucket in
/// ascending order of `n`.
///
/// The probe and the later upload are not atomic. A concurrent
/// deployment can take the key in between, in which case the upload
/// overwrites; the tool assumes a single operator per application.
pub async fn allocate(
    store: &dyn BundleStore,
    label_base: &str,
    cancel: &CancellationToken,
) -> DeployResult<AllocatedLabel> {
    for attempt in 0..MAX_LABEL_ATTEMPTS {
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled {
                stage: DeployStage::Naming,
            });
        }

        let full_label = format!("{label_base}-{attempt}");
        let key = format!("{full_label}.zip");
        if store.exists(&key).await? {
            debug!(key = %key, "bundle key already taken, trying next suffix");
            continue;
        }
        return Ok(AllocatedLabel { full_label, key });
    }

    Err(DeployError::NamespaceExhausted {
        label_base: label_base.to_owned(),
        container: store.container().to_owned(),
    })
}
