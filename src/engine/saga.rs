//! Compensating sequence for operations that write more than one document.
//!
//! Each completed write registers an undo step. When a later write fails,
//! `abort` runs the registered undos newest-first and turns the outcome into
//! an error naming the failed step and whether rollback succeeded.

use std::future::Future;

use futures::future::BoxFuture;
use tracing::{error, warn};

use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::store::{StoreError, StoreResult};

pub struct Saga {
    operation: &'static str,
    undo: Vec<(&'static str, BoxFuture<'static, StoreResult<()>>)>,
}

impl Saga {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            undo: Vec::new(),
        }
    }

    pub fn completed<F>(&mut self, step: &'static str, undo: F)
    where
        F: Future<Output = StoreResult<()>> + Send + 'static,
    {
        self.undo.push((step, Box::pin(undo)));
    }

    pub async fn abort(mut self, failed_step: &'static str, cause: StoreError, metrics: &Metrics) -> AppError {
        let operation = self.operation;
        warn!(operation, failed_step, error = %cause, "write failed; rolling back");

        while let Some((step, undo)) = self.undo.pop() {
            if let Err(undo_err) = undo.await {
                metrics
                    .saga_compensations_total
                    .with_label_values(&[operation, "failed"])
                    .inc();
                error!(operation, step, error = %undo_err, "compensation failed; state is inconsistent");
                return AppError::Internal(format!(
                    "{operation}: {failed_step} failed ({cause}); undoing {step} also failed ({undo_err})"
                ));
            }

            metrics
                .saga_compensations_total
                .with_label_values(&[operation, "rolled_back"])
                .inc();
        }

        AppError::Internal(format!(
            "{operation}: {failed_step} failed ({cause}); earlier writes were rolled back"
        ))
    }
}
