//! Batch execution with partial-success reporting
//!
//! Every mutating operation (archive, unarchive, trash, restore, purge) runs
//! through [`run_batch`]: ids are looked up together, unknown ids are
//! reported as failures, and each found item is acted on independently so
//! one failure never aborts its siblings.

use crate::error::Result;
use crate::providers::FindResult;
use serde::Serialize;
use std::future::Future;

/// Reason recorded for ids the lookup could not resolve
pub const NOT_FOUND_REASON: &str = "session not found";

/// An item found by a batch lookup
#[derive(Debug, Clone, Default)]
pub struct Lookup<I> {
    /// `(requested id, item)` pairs
    pub found: Vec<(String, I)>,
    /// Ids with no matching item
    pub missing: Vec<String>,
}

impl Lookup<String> {
    /// Treats every id as found; used when the action validates ids itself
    pub fn passthrough(ids: Vec<String>) -> Self {
        Self {
            found: ids.into_iter().map(|id| (id.clone(), id)).collect(),
            missing: Vec::new(),
        }
    }
}

impl From<FindResult> for Lookup<crate::providers::SessionItem> {
    fn from(result: FindResult) -> Self {
        Self {
            found: result
                .found
                .into_iter()
                .map(|item| (item.item_id.clone(), item))
                .collect(),
            missing: result.missing,
        }
    }
}

/// A successful item
#[derive(Debug, Clone, Serialize)]
pub struct BatchSuccess<T> {
    /// Requested id
    pub id: String,
    /// Action output
    pub result: T,
}

/// A failed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Requested id
    pub id: String,
    /// Human-readable cause
    pub reason: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport<T> {
    /// Number of ids requested
    pub requested: usize,
    /// Items the action completed for
    pub succeeded: Vec<BatchSuccess<T>>,
    /// Items that were missing or whose action failed
    pub failed: Vec<BatchFailure>,
    /// `succeeded.len()`
    pub succeeded_count: usize,
    /// `failed.len()`
    pub failed_count: usize,
}

impl<T> BatchReport<T> {
    /// Returns true if no item failed
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Looks up `ids` and applies `action` to each found item independently
///
/// # Arguments
///
/// * `ids` - Opaque ids as requested by the caller
/// * `lookup` - Resolves all ids at once
/// * `action` - Runs for one item; its error becomes that item's failure reason
///
/// # Errors
///
/// Only a failing `lookup` fails the whole batch.
///
/// # Examples
///
/// ```
/// use chatshelf::batch::{run_batch, Lookup};
///
/// # tokio_test::block_on(async {
/// let ids = vec!["a".to_string(), "bad".to_string()];
/// let report = run_batch(
///     &ids,
///     |ids| async move { Ok(Lookup::passthrough(ids)) },
///     |id| async move {
///         if id == "bad" {
///             anyhow::bail!("rejected");
///         }
///         Ok(id.len())
///     },
/// )
/// .await
/// .unwrap();
/// assert_eq!(report.succeeded_count, 1);
/// assert_eq!(report.failed[0].reason, "rejected");
/// # });
/// ```
pub async fn run_batch<I, T, L, LF, A, AF>(
    ids: &[String],
    lookup: L,
    mut action: A,
) -> Result<BatchReport<T>>
where
    L: FnOnce(Vec<String>) -> LF,
    LF: Future<Output = Result<Lookup<I>>>,
    A: FnMut(I) -> AF,
    AF: Future<Output = Result<T>>,
{
    let Lookup { found, missing } = lookup(ids.to_vec()).await?;

    let mut failed: Vec<BatchFailure> = missing
        .into_iter()
        .map(|id| BatchFailure {
            id,
            reason: NOT_FOUND_REASON.to_string(),
        })
        .collect();
    let mut succeeded = Vec::new();

    for (id, item) in found {
        match action(item).await {
            Ok(result) => succeeded.push(BatchSuccess { id, result }),
            Err(e) => {
                tracing::debug!(id = %id, error = %e, "Batch item failed");
                failed.push(BatchFailure {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(BatchReport {
        requested: ids.len(),
        succeeded_count: succeeded.len(),
        failed_count: failed.len(),
        succeeded,
        failed,
    })
}
