//! IntentQueue — redb-backed durable queue of purchase intents.
//!
//! Every mutation runs in a single write transaction, so a lease, a
//! delete and a dead-letter move are each atomic. Values are JSON
//! [`QueueRecord`]s keyed by client token.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use coverpilot_core::config::PurchaserConfig;

use crate::error::{QueueError, QueueResult};
use crate::message::PurchaseIntent;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `QueueError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| QueueError::$variant(e.to_string())
    };
}

/// Lease and redelivery limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueSettings {
    pub visibility_timeout: Duration,
    /// Deliveries allowed before a message is dead-lettered.
    pub max_receives: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from_config(&PurchaserConfig::default())
    }
}

impl QueueSettings {
    pub fn from_config(config: &PurchaserConfig) -> Self {
        Self {
            visibility_timeout: Duration::seconds(config.visibility_timeout_secs as i64),
            max_receives: config.max_receives,
        }
    }
}

/// Thread-safe intent queue backed by redb.
#[derive(Clone)]
pub struct IntentQueue {
    db: Arc<Database>,
    settings: QueueSettings,
}

impl IntentQueue {
    /// Open (or create) a persistent queue at the given path.
    pub fn open(path: &Path, settings: QueueSettings) -> QueueResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let queue = Self {
            db: Arc::new(db),
            settings,
        };
        queue.ensure_tables()?;
        debug!(?path, "intent queue opened");
        Ok(queue)
    }

    /// Create an ephemeral in-memory queue (for testing).
    pub fn open_in_memory(settings: QueueSettings) -> QueueResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let queue = Self {
            db: Arc::new(db),
            settings,
        };
        queue.ensure_tables()?;
        debug!("in-memory intent queue opened");
        Ok(queue)
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    fn ensure_tables(&self) -> QueueResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(INTENTS).map_err(map_err!(Table))?;
        txn.open_table(DEAD_LETTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Producer ───────────────────────────────────────────────────

    /// Enqueue an intent, visible immediately.
    pub fn send(&self, intent: &PurchaseIntent) -> QueueResult<bool> {
        self.send_at(intent, Utc::now())
    }

    /// Enqueue an intent as of `now`. Returns false when the client token
    /// is already live or dead-lettered.
    pub fn send_at(&self, intent: &PurchaseIntent, now: DateTime<Utc>) -> QueueResult<bool> {
        intent.validate()?;
        let key = intent.client_token.to_string();
        let mut record = QueueRecord::planned(intent.to_wire()?, now);
        record.transition(IntentState::Queued)?;
        let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let duplicate;
        {
            let dead = txn.open_table(DEAD_LETTERS).map_err(map_err!(Table))?;
            let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
            duplicate = dead.get(key.as_str()).map_err(map_err!(Read))?.is_some()
                || table.get(key.as_str()).map_err(map_err!(Read))?.is_some();
            if !duplicate {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        if duplicate {
            txn.abort().map_err(map_err!(Transaction))?;
            debug!(%key, "duplicate send ignored");
            return Ok(false);
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(
            %key,
            family = %intent.plan_family,
            commitment = %intent.commitment,
            "intent queued"
        );
        Ok(true)
    }

    // ── Consumer ───────────────────────────────────────────────────

    /// Lease up to `max` visible messages, oldest first.
    ///
    /// Messages that already used all their deliveries, or whose body no
    /// longer parses, are moved to the dead-letter table instead.
    pub fn receive(&self, max: usize, now: DateTime<Utc>) -> QueueResult<Vec<Delivery>> {
        let mut deliveries = Vec::new();
        if max == 0 {
            return Ok(deliveries);
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
            let mut dead = txn.open_table(DEAD_LETTERS).map_err(map_err!(Table))?;

            let mut candidates: Vec<(String, QueueRecord)> = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let record = decode_record(value.value())?;
                if record.is_visible(now) {
                    candidates.push((key.value().to_string(), record));
                }
            }
            candidates.sort_by(|a, b| a.1.enqueued_at.cmp(&b.1.enqueued_at).then_with(|| a.0.cmp(&b.0)));

            for (key, mut record) in candidates {
                if deliveries.len() >= max {
                    break;
                }
                if record.state == IntentState::Dequeued {
                    debug!(%key, "lease expired, message visible again");
                }
                record.release(now)?;

                let intent = match PurchaseIntent::from_wire(&record.body) {
                    Ok(intent) => intent,
                    Err(e) => {
                        let reason = format!("malformed body: {e}");
                        move_to_dead_letters(&mut table, &mut dead, &key, record, reason, now)?;
                        continue;
                    }
                };

                if record.receive_count >= self.settings.max_receives {
                    let last = record
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "lease expired without a decision".to_string());
                    let reason = format!("receive limit {} reached: {last}", self.settings.max_receives);
                    move_to_dead_letters(&mut table, &mut dead, &key, record, reason, now)?;
                    continue;
                }

                let receipt = Uuid::new_v4();
                record.transition(IntentState::Dequeued)?;
                record.receive_count += 1;
                record.receipt = Some(receipt);
                record.visible_at = now + self.settings.visibility_timeout;
                let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;

                deliveries.push(Delivery {
                    intent,
                    receipt,
                    receive_count: record.receive_count,
                });
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;

        if !deliveries.is_empty() {
            debug!(count = deliveries.len(), "messages leased");
        }
        Ok(deliveries)
    }

    /// Remove a leased message after a terminal decision.
    ///
    /// `outcome` must be terminal; retryable failures go through
    /// [`record_failure`](Self::record_failure).
    pub fn delete(&self, client_token: Uuid, receipt: Uuid, outcome: OutcomeStatus) -> QueueResult<()> {
        let key = client_token.to_string();
        let next = IntentState::from(outcome);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let settled = {
            let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
            match get_record(&table, &key)?.filter(|r| r.holds(receipt)) {
                None => Err(QueueError::StaleReceipt(key.clone())),
                Some(record) if !next.is_terminal() => Err(QueueError::InvalidTransition {
                    from: record.state,
                    to: next,
                }),
                Some(mut record) => record.transition(next).and_then(|()| {
                    table.remove(key.as_str()).map_err(map_err!(Write))?;
                    Ok(())
                }),
            }
        };
        if let Err(e) = settled {
            txn.abort().map_err(map_err!(Transaction))?;
            return Err(e);
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, state = %next, "message deleted");
        Ok(())
    }

    /// Release a leased message after a retryable failure.
    ///
    /// The message stays invisible until its lease deadline passes, then
    /// is redelivered (or dead-lettered once its receives are spent).
    pub fn record_failure(&self, client_token: Uuid, receipt: Uuid, reason: &str) -> QueueResult<()> {
        let key = client_token.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let released = {
            let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
            match get_record(&table, &key)?.filter(|r| r.holds(receipt)) {
                None => Err(QueueError::StaleReceipt(key.clone())),
                Some(mut record) => record.transition(IntentState::FailedRetryable).and_then(|()| {
                    record.receipt = None;
                    record.last_error = Some(reason.to_string());
                    let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(map_err!(Write))?;
                    Ok(())
                }),
            }
        };
        if let Err(e) = released {
            txn.abort().map_err(map_err!(Transaction))?;
            return Err(e);
        }
        txn.commit().map_err(map_err!(Transaction))?;
        warn!(%key, reason, "purchase attempt failed, will retry");
        Ok(())
    }

    // ── Review ─────────────────────────────────────────────────────

    /// Delete a message that no consumer currently holds.
    pub fn cancel(&self, client_token: Uuid, now: DateTime<Utc>) -> QueueResult<CancelOutcome> {
        let key = client_token.to_string();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let outcome = {
            let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
            match get_record(&table, &key)? {
                None => Ok(CancelOutcome::NotFound),
                Some(r) if r.is_leased(now) => Ok(CancelOutcome::InFlight),
                Some(mut record) => record
                    .release(now)
                    .and_then(|()| record.transition(IntentState::Cancelled))
                    .and_then(|()| {
                        table.remove(key.as_str()).map_err(map_err!(Write))?;
                        Ok(CancelOutcome::Cancelled)
                    }),
            }
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                txn.abort().map_err(map_err!(Transaction))?;
                return Err(e);
            }
        };
        txn.commit().map_err(map_err!(Transaction))?;
        info!(%key, ?outcome, "cancel requested");
        Ok(outcome)
    }

    /// Live messages, oldest first. Bodies that fail to parse are skipped.
    pub fn list_queued(&self) -> QueueResult<Vec<QueuedIntent>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let record = decode_record(value.value())?;
            match PurchaseIntent::from_wire(&record.body) {
                Ok(intent) => results.push(QueuedIntent {
                    intent,
                    state: record.state,
                    receive_count: record.receive_count,
                    enqueued_at: record.enqueued_at,
                    visible_at: record.visible_at,
                    last_error: record.last_error,
                }),
                Err(e) => warn!(key = key.value(), error = %e, "skipping unparseable message"),
            }
        }
        results.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        Ok(results)
    }

    pub fn list_dead_letters(&self) -> QueueResult<Vec<DeadLetter>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEAD_LETTERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let letter: DeadLetter =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(letter);
        }
        results.sort_by(|a, b| a.dead_lettered_at.cmp(&b.dead_lettered_at));
        Ok(results)
    }

    /// Move a dead letter back onto the queue with a fresh receive budget.
    /// Returns false if no such dead letter exists.
    pub fn redrive_dead_letter(&self, key: &str, now: DateTime<Utc>) -> QueueResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let found;
        {
            let mut dead = txn.open_table(DEAD_LETTERS).map_err(map_err!(Table))?;
            let letter: Option<DeadLetter> = match dead.remove(key).map_err(map_err!(Write))? {
                Some(guard) => Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?),
                None => None,
            };
            found = letter.is_some();
            if let Some(letter) = letter {
                // A redrive starts a fresh lifecycle for the same body.
                let mut record = QueueRecord::planned(letter.body, now);
                record.transition(IntentState::Queued)?;
                let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                let mut table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
                table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
            }
        }
        if !found {
            txn.abort().map_err(map_err!(Transaction))?;
            return Ok(false);
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(%key, "dead letter redriven");
        Ok(true)
    }

    /// Number of live messages, leased or not.
    pub fn len(&self) -> QueueResult<usize> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INTENTS).map_err(map_err!(Table))?;
        let mut count = 0;
        for entry in table.iter().map_err(map_err!(Read))? {
            entry.map_err(map_err!(Read))?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn decode_record(bytes: &[u8]) -> QueueResult<QueueRecord> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

fn get_record(table: &impl ReadableTable<&'static str, &'static [u8]>, key: &str) -> QueueResult<Option<QueueRecord>> {
    match table.get(key).map_err(map_err!(Read))? {
        Some(guard) => Ok(Some(decode_record(guard.value())?)),
        None => Ok(None),
    }
}

fn move_to_dead_letters(
    intents: &mut redb::Table<'_, &'static str, &'static [u8]>,
    dead: &mut redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    mut record: QueueRecord,
    reason: String,
    now: DateTime<Utc>,
) -> QueueResult<()> {
    record.transition(IntentState::DeadLettered)?;
    let letter = DeadLetter {
        client_token: key.to_string(),
        body: record.body,
        receive_count: record.receive_count,
        reason,
        dead_lettered_at: now,
    };
    let value = serde_json::to_vec(&letter).map_err(map_err!(Serialize))?;
    dead.insert(key, value.as_slice()).map_err(map_err!(Write))?;
    intents.remove(key).map_err(map_err!(Write))?;
    error!(%key, reason = %letter.reason, receives = letter.receive_count, "message dead-lettered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coverpilot_core::{PaymentOption, PlanFamily, PlannedPlan, Term};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    fn settings() -> QueueSettings {
        QueueSettings {
            visibility_timeout: Duration::minutes(15),
            max_receives: 3,
        }
    }

    fn queue() -> IntentQueue {
        IntentQueue::open_in_memory(settings()).unwrap()
    }

    fn intent(commitment: f64) -> PurchaseIntent {
        PurchaseIntent::build(
            PlanFamily::Compute,
            "offer-1",
            &PlannedPlan {
                term: Term::OneYear,
                payment_option: PaymentOption::NoUpfront,
                commitment_per_hour: commitment,
            },
            t0(),
            70.0,
            80.0,
        )
        .unwrap()
    }

    #[test]
    fn send_is_idempotent_by_token() {
        let q = queue();
        let i = intent(1.0);
        assert!(q.send_at(&i, t0()).unwrap());
        assert!(!q.send_at(&i, t0()).unwrap());
        assert_eq!(q.len().unwrap(), 1);
    }

    #[test]
    fn receive_leases_oldest_first() {
        let q = queue();
        let a = intent(1.0);
        let b = intent(2.0);
        q.send_at(&b, t0() + Duration::seconds(5)).unwrap();
        q.send_at(&a, t0()).unwrap();

        let got = q.receive(1, t0() + Duration::minutes(1)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].intent, a);
        assert_eq!(got[0].receive_count, 1);

        // a is leased; only b is left to deliver.
        let got = q.receive(10, t0() + Duration::minutes(2)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].intent, b);
    }

    #[test]
    fn message_not_visible_before_send_time() {
        let q = queue();
        q.send_at(&intent(1.0), t0()).unwrap();
        assert!(q.receive(10, t0() - Duration::seconds(1)).unwrap().is_empty());
    }

    #[test]
    fn delete_requires_current_receipt() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        let first = q.receive(1, t0()).unwrap().remove(0);

        // Lease expires and a second consumer takes it.
        let second = q.receive(1, t0() + Duration::minutes(16)).unwrap().remove(0);
        assert_eq!(second.receive_count, 2);

        assert!(matches!(
            q.delete(i.client_token, first.receipt, OutcomeStatus::Executed),
            Err(QueueError::StaleReceipt(_))
        ));
        q.delete(i.client_token, second.receipt, OutcomeStatus::Executed).unwrap();
        assert!(q.is_empty().unwrap());
    }

    #[test]
    fn delete_refuses_a_retryable_outcome() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        let d = q.receive(1, t0()).unwrap().remove(0);

        assert!(matches!(
            q.delete(i.client_token, d.receipt, OutcomeStatus::FailedRetryable),
            Err(QueueError::InvalidTransition {
                from: IntentState::Dequeued,
                to: IntentState::FailedRetryable
            })
        ));
        // Still leased to the same consumer.
        assert_eq!(q.list_queued().unwrap()[0].state, IntentState::Dequeued);
        q.delete(i.client_token, d.receipt, OutcomeStatus::SkippedCapExceeded).unwrap();
        assert!(q.is_empty().unwrap());
    }

    #[test]
    fn failure_redelivers_after_lease_deadline() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        let d = q.receive(1, t0()).unwrap().remove(0);
        q.record_failure(i.client_token, d.receipt, "timeout").unwrap();

        assert!(q.receive(1, t0() + Duration::minutes(1)).unwrap().is_empty());
        let queued = q.list_queued().unwrap();
        assert_eq!(queued[0].state, IntentState::FailedRetryable);
        assert_eq!(queued[0].last_error.as_deref(), Some("timeout"));

        let again = q.receive(1, t0() + Duration::minutes(15)).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].receive_count, 2);
    }

    #[test]
    fn exhausted_message_is_dead_lettered() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();

        let mut now = t0();
        for _ in 0..3 {
            let d = q.receive(1, now).unwrap().remove(0);
            q.record_failure(i.client_token, d.receipt, "transient").unwrap();
            now += Duration::minutes(15);
        }

        assert!(q.receive(1, now).unwrap().is_empty());
        assert!(q.is_empty().unwrap());
        let dead = q.list_dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].receive_count, 3);
        assert!(dead[0].reason.contains("transient"));

        // The token stays claimed while dead-lettered.
        assert!(!q.send_at(&i, now).unwrap());
    }

    #[test]
    fn redrive_restores_receive_budget() {
        let q = IntentQueue::open_in_memory(QueueSettings {
            max_receives: 1,
            ..settings()
        })
        .unwrap();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        q.receive(1, t0()).unwrap();
        let later = t0() + Duration::hours(1);
        assert!(q.receive(1, later).unwrap().is_empty());

        let key = i.client_token.to_string();
        assert!(q.redrive_dead_letter(&key, later).unwrap());
        assert!(!q.redrive_dead_letter(&key, later).unwrap());
        let d = q.receive(1, later).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].receive_count, 1);
    }

    #[test]
    fn cancel_only_outside_active_lease() {
        let q = queue();
        let held = intent(1.0);
        let waiting = intent(2.0);
        q.send_at(&held, t0()).unwrap();
        q.send_at(&waiting, t0() + Duration::seconds(1)).unwrap();
        let leased = q.receive(1, t0()).unwrap();
        assert_eq!(leased[0].intent, held);

        assert_eq!(q.cancel(held.client_token, t0()).unwrap(), CancelOutcome::InFlight);
        assert_eq!(q.cancel(waiting.client_token, t0()).unwrap(), CancelOutcome::Cancelled);
        assert_eq!(q.cancel(waiting.client_token, t0()).unwrap(), CancelOutcome::NotFound);

        // After the lease runs out the message can be cancelled.
        let after = t0() + Duration::minutes(20);
        assert_eq!(q.cancel(held.client_token, after).unwrap(), CancelOutcome::Cancelled);
        assert!(q.is_empty().unwrap());
    }

    #[test]
    fn failed_attempt_can_be_cancelled_before_retry() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        let d = q.receive(1, t0()).unwrap().remove(0);
        q.record_failure(i.client_token, d.receipt, "timeout").unwrap();

        // Released but not yet visible: no consumer holds it.
        assert_eq!(q.cancel(i.client_token, t0() + Duration::minutes(1)).unwrap(), CancelOutcome::Cancelled);
        assert!(q.is_empty().unwrap());
        assert!(q.list_dead_letters().unwrap().is_empty());
    }

    #[test]
    fn redelivered_failure_passes_through_queued() {
        let q = queue();
        let i = intent(1.0);
        q.send_at(&i, t0()).unwrap();
        let d = q.receive(1, t0()).unwrap().remove(0);
        q.record_failure(i.client_token, d.receipt, "timeout").unwrap();

        let again = q.receive(1, t0() + Duration::minutes(15)).unwrap().remove(0);
        let listed = q.list_queued().unwrap();
        assert_eq!(listed[0].state, IntentState::Dequeued);
        assert_eq!(listed[0].last_error.as_deref(), Some("timeout"));
        q.delete(i.client_token, again.receipt, OutcomeStatus::Executed).unwrap();
    }

    #[test]
    fn malformed_body_goes_to_dead_letters() {
        let q = queue();
        let record = QueueRecord {
            body: "{not json".to_string(),
            state: IntentState::Queued,
            receive_count: 0,
            enqueued_at: t0(),
            visible_at: t0(),
            receipt: None,
            last_error: None,
        };
        let txn = q.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(INTENTS).unwrap();
            let value = serde_json::to_vec(&record).unwrap();
            table.insert("poison", value.as_slice()).unwrap();
        }
        txn.commit().unwrap();

        assert!(q.list_queued().unwrap().is_empty());
        assert!(q.receive(5, t0()).unwrap().is_empty());
        let dead = q.list_dead_letters().unwrap();
        assert_eq!(dead[0].client_token, "poison");
        assert!(dead[0].reason.starts_with("malformed body"));
    }

    #[test]
    fn stored_body_is_the_wire_body() {
        let q = queue();
        let i = intent(1.5);
        q.send_at(&i, t0()).unwrap();
        let txn = q.db.begin_read().unwrap();
        let table = txn.open_table(INTENTS).unwrap();
        let guard = table.get(i.client_token.to_string().as_str()).unwrap().unwrap();
        let record = decode_record(guard.value()).unwrap();
        assert_eq!(record.body, i.to_wire().unwrap());
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.redb");
        let i = intent(1.0);

        {
            let q = IntentQueue::open(&path, settings()).unwrap();
            q.send_at(&i, t0()).unwrap();
        }

        let q = IntentQueue::open(&path, settings()).unwrap();
        let listed = q.list_queued().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].intent, i);
    }

    #[test]
    fn zero_max_receives_nothing() {
        let q = queue();
        q.send_at(&intent(1.0), t0()).unwrap();
        assert!(q.receive(0, t0()).unwrap().is_empty());
        assert_eq!(q.list_queued().unwrap()[0].receive_count, 0);
    }
}
