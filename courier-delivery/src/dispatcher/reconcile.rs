use courier_common::internal;

use super::Inner;

impl Inner {
    /// Attempt the oldest pending records
    ///
    /// Covers messages that never made it into the work queue (it was full,
    /// or they were left over from a previous run) and messages waiting for a
    /// retry. Only one batch is taken per tick.
    pub(super) async fn reconcile(&self) {
        let batch = match self
            .store
            .list_pending(self.config.reconciliation_batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation failed to list pending messages");
                return;
            }
        };

        if batch.is_empty() {
            internal!("Reconciliation found no pending messages");
            return;
        }

        internal!(
            level = DEBUG,
            "Reconciliation found {} pending messages",
            batch.len()
        );

        for record in batch {
            if self.cancel.is_cancelled() {
                break;
            }

            self.attempt(record).await;
        }
    }
}
