use std::time::SystemTime;

use courier_store::{AuditPartition, MessageRecord};

use super::Inner;
use crate::{RetryDecision, TransportError};

impl Inner {
    /// Run one attempt cycle for a pending record
    ///
    /// Consults the retry policy, calls the transport under the attempt
    /// timeout, and writes the outcome back. The next attempt for the same
    /// message can only start after this returns, because the consumer task
    /// is the only caller.
    pub(super) async fn attempt(&self, mut record: MessageRecord) {
        let id = *record.id();
        let now = SystemTime::now();

        if let RetryDecision::GiveUp(reason) =
            self.policy.evaluate(record.attempts(), record.age(now))
        {
            tracing::warn!(%id, attempts = record.attempts(), %reason, "Giving up on message");
            record.mark_failed(reason.to_string(), now);
            self.promote(&record).await;
            return;
        }

        let timeout = self.config.attempt_timeout();
        let send = tokio::time::timeout(
            timeout,
            self.transport
                .send(record.recipient(), record.subject(), record.body()),
        );

        let outcome = tokio::select! {
            biased;

            () = self.cancel.cancelled() => {
                tracing::debug!(%id, "Delivery attempt abandoned for shutdown");
                return;
            }
            result = send => result.unwrap_or(Err(TransportError::Timeout(timeout))),
        };

        let now = SystemTime::now();
        match outcome {
            Ok(()) => {
                record.mark_sent(now);
                tracing::info!(%id, attempts = record.attempts(), "Message delivered");
                self.promote(&record).await;
            }
            Err(error) => {
                record.record_failure(error.to_string(), now);

                match self.policy.evaluate(record.attempts(), record.age(now)) {
                    RetryDecision::GiveUp(reason) => {
                        tracing::warn!(
                            %id,
                            attempts = record.attempts(),
                            %error,
                            %reason,
                            "Delivery failed, giving up"
                        );
                        record.mark_failed(format!("{reason}; last error: {error}"), now);
                        self.promote(&record).await;
                    }
                    RetryDecision::Proceed => {
                        tracing::warn!(
                            %id,
                            attempts = record.attempts(),
                            remaining = self.policy.remaining_attempts(record.attempts()),
                            %error,
                            "Delivery failed, will retry"
                        );

                        if let Err(e) = self.store.update_retry_state(&record).await {
                            tracing::error!(
                                %id,
                                error = %e,
                                "Failed to record delivery attempt, reconciliation will retry"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Move a terminal record into its audit partition
    ///
    /// A failure leaves the record pending, so the next sweep picks it up.
    async fn promote(&self, record: &MessageRecord) {
        if let Err(e) = self.store.promote(record).await {
            tracing::error!(
                id = %record.id(),
                partition = ?AuditPartition::for_state(record.state()),
                error = %e,
                "Failed to promote message, it remains pending"
            );
        }
    }
}
