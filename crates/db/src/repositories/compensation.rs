//! Transactional compensation runs.
//!
//! Each run opens a SERIALIZABLE transaction, scopes it to the company via
//! RLS, locks the credit note and the debtor's eligible invoices, runs the
//! engine and commits. Any error rolls the whole run back. Runs that lose a
//! serialization race are retried with linear backoff.

use std::time::Duration;

use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};
use tracing::{debug, warn};

use offset_core::compensation::{
    CompensationEngine, CompensationError, CompensationOutcome, CreditNote, DocumentClass,
    InvoiceStatus, LedgerAdapter, PendingInvoice, ReversalOutcome,
};
use offset_shared::config::CompensationConfig;
use offset_shared::types::{CompanyId, DebtorId, InvoiceId};

use super::ledger::{SeaOrmLedger, map_db_err};
use crate::rls::set_tenant_context;

/// How often, and how patiently, a conflicting run is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Builds a policy from configuration.
    #[must_use]
    pub const fn from_config(config: &CompensationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Returns true if a run that failed with `err` on `attempt` should go again.
    #[must_use]
    pub fn should_retry(&self, err: &CompensationError, attempt: u32) -> bool {
        err.is_retryable() && attempt <= self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CompensationConfig::default())
    }
}

/// Repository that runs the compensation engine against the database.
#[derive(Debug, Clone)]
pub struct CompensationRepository {
    db: DatabaseConnection,
    retry: RetryPolicy,
}

impl CompensationRepository {
    /// Creates a new repository with the default retry policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Compensates a confirmed credit note in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's precondition errors, `CreditNoteNotFound`, or a
    /// persistence error. `TransactionConflict` is returned only once the
    /// retry budget is spent.
    pub async fn compensate(
        &self,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<CompensationOutcome, CompensationError> {
        self.run_with_retry("compensate", company_id, credit_note_id, move |txn| {
            Box::pin(Self::compensate_in(
                txn,
                company_id,
                document_class,
                credit_note_id,
            ))
        })
        .await
    }

    /// Confirms a draft credit note and compensates it in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCreditNoteState` if the note is not a draft, plus
    /// everything [`Self::compensate`] can return.
    pub async fn confirm_and_compensate(
        &self,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<CompensationOutcome, CompensationError> {
        self.run_with_retry(
            "confirm_and_compensate",
            company_id,
            credit_note_id,
            move |txn| {
                Box::pin(Self::confirm_and_compensate_in(
                    txn,
                    company_id,
                    document_class,
                    credit_note_id,
                ))
            },
        )
        .await
    }

    /// Reverses a note's compensation and cancels the note.
    ///
    /// # Errors
    ///
    /// Returns `NothingToReverse` if the note has no live applications, plus
    /// the lookup and persistence errors of [`Self::compensate`].
    pub async fn reverse(
        &self,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<ReversalOutcome, CompensationError> {
        self.run_with_retry("reverse", company_id, credit_note_id, move |txn| {
            Box::pin(Self::reverse_in(
                txn,
                company_id,
                document_class,
                credit_note_id,
            ))
        })
        .await
    }

    /// Pending amounts of a debtor's eligible invoices, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub async fn outstanding_balances(
        &self,
        company_id: CompanyId,
        document_class: DocumentClass,
        debtor_id: DebtorId,
    ) -> Result<Vec<PendingInvoice>, CompensationError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        set_tenant_context(&txn, company_id)
            .await
            .map_err(map_db_err)?;

        let ledger = SeaOrmLedger::new(&txn, company_id, document_class);
        let pending = CompensationEngine::outstanding_balances(&ledger, debtor_id, None).await?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(pending)
    }

    /// Compensates inside a caller-owned transaction.
    ///
    /// The caller is responsible for isolation, tenant context, commit and
    /// rollback.
    ///
    /// # Errors
    ///
    /// Same as [`Self::compensate`], without retries.
    pub async fn compensate_in(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<CompensationOutcome, CompensationError> {
        let ledger = SeaOrmLedger::new(txn, company_id, document_class);
        let credit_note = Self::load_credit_note(&ledger, credit_note_id).await?;
        CompensationEngine::compensate(&ledger, &credit_note).await
    }

    /// Confirms and compensates inside a caller-owned transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::confirm_and_compensate`], without retries.
    pub async fn confirm_and_compensate_in(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<CompensationOutcome, CompensationError> {
        let ledger = SeaOrmLedger::new(txn, company_id, document_class);
        let mut credit_note = Self::load_credit_note(&ledger, credit_note_id).await?;

        if credit_note.status != InvoiceStatus::Draft {
            return Err(CompensationError::InvalidCreditNoteState {
                credit_note_id,
                status: credit_note.status,
                expected: "DRAFT",
            });
        }

        ledger
            .update_invoice_status(credit_note_id, InvoiceStatus::Confirmed)
            .await?;
        credit_note.status = InvoiceStatus::Confirmed;

        CompensationEngine::compensate(&ledger, &credit_note).await
    }

    /// Reverses inside a caller-owned transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::reverse`], without retries.
    pub async fn reverse_in(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        document_class: DocumentClass,
        credit_note_id: InvoiceId,
    ) -> Result<ReversalOutcome, CompensationError> {
        let ledger = SeaOrmLedger::new(txn, company_id, document_class);
        let credit_note = Self::load_credit_note(&ledger, credit_note_id).await?;
        CompensationEngine::reverse(&ledger, &credit_note).await
    }

    async fn load_credit_note(
        ledger: &SeaOrmLedger<'_>,
        credit_note_id: InvoiceId,
    ) -> Result<CreditNote, CompensationError> {
        ledger
            .lock_document(credit_note_id)
            .await?
            .map(CreditNote::from)
            .ok_or(CompensationError::CreditNoteNotFound(credit_note_id))
    }

    async fn run_with_retry<T, F>(
        &self,
        operation: &'static str,
        company_id: CompanyId,
        credit_note_id: InvoiceId,
        run: F,
    ) -> Result<T, CompensationError>
    where
        T: Send,
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, CompensationError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.run_once(company_id, &run).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, %credit_note_id, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        operation,
                        %credit_note_id,
                        %company_id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transaction conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_once<T, F>(&self, company_id: CompanyId, run: &F) -> Result<T, CompensationError>
    where
        T: Send,
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, CompensationError>>,
    {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(map_db_err)?;
        set_tenant_context(&txn, company_id)
            .await
            .map_err(map_db_err)?;

        match run(&txn).await {
            Ok(value) => {
                txn.commit().await.map_err(map_db_err)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
