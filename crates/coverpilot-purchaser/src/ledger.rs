//! LocalLedger — a redb-backed [`CommitmentApi`] for local runs.
//!
//! Records every created commitment under its client token, so a repeated
//! token answers with `DuplicateToken` exactly as a real provider would.
//! Offerings are synthetic: one per family/term/payment combination.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use coverpilot_core::{ApiError, CommitmentApi, CreatePlanRequest, PaymentOption, PlanFamily, Term};

/// Created commitments keyed by client token.
const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");

const OFFERING_PREFIX: &str = "local";

/// Storage failures surface as transient: the caller retries on redelivery.
macro_rules! map_err {
    () => {
        |e| ApiError::Transient(e.to_string())
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub plan_id: String,
    pub client_token: Uuid,
    pub offering_id: String,
    pub commitment_per_hour: Decimal,
    pub payment_option: PaymentOption,
    pub upfront_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct LocalLedger {
    db: Arc<Database>,
}

impl LocalLedger {
    pub fn open(path: &Path) -> Result<Self, ApiError> {
        let db = Database::create(path).map_err(map_err!())?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        debug!(?path, "ledger opened");
        Ok(ledger)
    }

    pub fn open_in_memory() -> Result<Self, ApiError> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!())?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_tables()?;
        Ok(ledger)
    }

    fn ensure_tables(&self) -> Result<(), ApiError> {
        let txn = self.db.begin_write().map_err(map_err!())?;
        txn.open_table(PLANS).map_err(map_err!())?;
        txn.commit().map_err(map_err!())?;
        Ok(())
    }

    /// Every commitment created so far, oldest first.
    pub fn list(&self) -> Result<Vec<LedgerEntry>, ApiError> {
        let txn = self.db.begin_read().map_err(map_err!())?;
        let table = txn.open_table(PLANS).map_err(map_err!())?;
        let mut entries = Vec::new();
        for entry in table.iter().map_err(map_err!())? {
            let (_, value) = entry.map_err(map_err!())?;
            let entry: LedgerEntry = serde_json::from_slice(value.value()).map_err(map_err!())?;
            entries.push(entry);
        }
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    pub fn offering_id(family: PlanFamily, term: Term, payment_option: PaymentOption) -> String {
        format!("{OFFERING_PREFIX}-{family}-{term}-{payment_option}").to_ascii_lowercase()
    }
}

impl CommitmentApi for LocalLedger {
    fn find_offering(
        &self,
        family: PlanFamily,
        term: Term,
        payment_option: PaymentOption,
    ) -> Result<String, ApiError> {
        Ok(Self::offering_id(family, term, payment_option))
    }

    fn create_plan(&self, request: &CreatePlanRequest) -> Result<String, ApiError> {
        if !request.offering_id.starts_with(OFFERING_PREFIX) {
            return Err(ApiError::Validation(format!("unknown offering {}", request.offering_id)));
        }
        if request.commitment_per_hour <= Decimal::ZERO {
            return Err(ApiError::Validation(format!(
                "commitment {} must be positive",
                request.commitment_per_hour
            )));
        }

        let key = request.client_token.to_string();
        let entry = LedgerEntry {
            plan_id: format!("lp-{}", Uuid::new_v4().simple()),
            client_token: request.client_token,
            offering_id: request.offering_id.clone(),
            commitment_per_hour: request.commitment_per_hour,
            payment_option: request.payment_option,
            upfront_amount: request.upfront_amount,
            created_at: Utc::now(),
        };
        let value = serde_json::to_vec(&entry).map_err(map_err!())?;

        let txn = self.db.begin_write().map_err(map_err!())?;
        let existing: Option<LedgerEntry>;
        {
            let mut table = txn.open_table(PLANS).map_err(map_err!())?;
            existing = match table.get(key.as_str()).map_err(map_err!())? {
                Some(guard) => Some(serde_json::from_slice(guard.value()).map_err(map_err!())?),
                None => None,
            };
            if existing.is_none() {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!())?;
            }
        }
        if let Some(existing) = existing {
            txn.abort().map_err(map_err!())?;
            return Err(ApiError::DuplicateToken {
                plan_id: Some(existing.plan_id),
            });
        }
        txn.commit().map_err(map_err!())?;
        info!(plan_id = %entry.plan_id, %key, offering = %entry.offering_id, "commitment recorded");
        Ok(entry.plan_id)
    }
}
