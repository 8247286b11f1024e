//! Explicitly constructed collaborator handles shared by every flow.
//!
//! A [`Services`] value is built once at startup, validated against the
//! configuration, handed to flows behind an `Arc`, and closed once with
//! [`Services::shutdown`].

use crate::config::{ConfigError, HavenConfig, SupersededBlobPolicy, TimeoutConfig};
use crate::error::FlowError;
use crate::extractor::EmbeddingExtractor;
use crate::journal::SagaJournal;
use haven_crypto::{CipherVault, EncryptedBundle, Quantizer};
use haven_ledger::CommitmentLedger;
use haven_proof::{ProofEngine, TransparentProofEngine, VerificationKey};
use haven_store::{ContentStore, FsContentStore};
use haven_types::{BiometricProfile, Clock, ContentAddress, SystemClock, Timestamp};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct Services {
    pub(crate) extractor: Arc<dyn EmbeddingExtractor>,
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) ledger: Arc<dyn CommitmentLedger>,
    pub(crate) prover: Arc<dyn ProofEngine>,
    pub(crate) journal: Arc<SagaJournal>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) vault: CipherVault,
    pub(crate) quantizer: Quantizer,
    pub(crate) timeouts: TimeoutConfig,
    pub(crate) superseded_blobs: SupersededBlobPolicy,
    pub(crate) reconcile_grace_secs: u64,
    closed: AtomicBool,
}

impl Services {
    /// Wire already-constructed collaborators. Fails if the proof engine's
    /// circuit shape does not match the configured quantizer.
    pub fn new(
        config: &HavenConfig,
        extractor: Arc<dyn EmbeddingExtractor>,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn CommitmentLedger>,
        prover: Arc<dyn ProofEngine>,
        journal: Arc<SagaJournal>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let configured = config.quantizer.circuit_shape();
        let engine = prover.circuit_shape();
        if configured != engine {
            return Err(ConfigError::CircuitMismatch { configured, engine });
        }

        tracing::info!(
            extractor = extractor.name(),
            store = store.name(),
            ledger = ledger.name(),
            prover = prover.name(),
            circuit = %engine,
            "services initialised"
        );

        Ok(Self {
            extractor,
            store,
            ledger,
            prover,
            journal,
            clock: Arc::new(SystemClock),
            vault: CipherVault::new(),
            quantizer: config.quantizer.quantizer(),
            timeouts: config.timeouts,
            superseded_blobs: config.superseded_blobs,
            reconcile_grace_secs: config.reconcile_grace_secs,
            closed: AtomicBool::new(false),
        })
    }

    /// Build the local stack from configuration: a filesystem blockstore at
    /// `store.root`, the saga journal at `journal_path` (in memory if
    /// unset), and the transparent proof engine keyed by
    /// `verification_key_path` (a fresh development key if unset).
    pub async fn open(
        config: &HavenConfig,
        extractor: Arc<dyn EmbeddingExtractor>,
        ledger: Arc<dyn CommitmentLedger>,
    ) -> Result<Self, ConfigError> {
        let store = FsContentStore::open(&config.store.root)
            .await
            .map_err(|e| ConfigError::Startup(e.to_string()))?;

        let journal = match &config.journal_path {
            Some(path) => SagaJournal::open(path)
                .await
                .map_err(|e| ConfigError::Startup(e.to_string()))?,
            None => SagaJournal::in_memory(),
        };

        let prover = match &config.verification_key_path {
            Some(path) => {
                let key = VerificationKey::from_json_file(path)
                    .map_err(|e| ConfigError::Startup(e.to_string()))?;
                TransparentProofEngine::new(key).map_err(|e| ConfigError::Startup(e.to_string()))?
            }
            None => {
                tracing::warn!("no verification key configured, using a development key");
                TransparentProofEngine::development(config.quantizer.circuit_shape())
            }
        };

        Self::new(
            config,
            extractor,
            Arc::new(store),
            ledger,
            Arc::new(prover),
            Arc::new(journal),
        )
    }

    /// Replace the wall clock used to stamp journal entries and to judge
    /// the reconciliation grace period.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn journal(&self) -> &SagaJournal {
        &self.journal
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close every collaborator. Only the first call has any effect; later
    /// calls return `Ok(())`. All collaborators are closed even if one
    /// fails, and the first failure is returned.
    pub async fn shutdown(&self) -> Result<(), FlowError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let budget = self.timeouts.store().max(self.timeouts.ledger());

        let results = [
            bounded("extractor.close", budget, async {
                self.extractor.close().await.map_err(FlowError::from_extraction)
            })
            .await,
            bounded("store.close", budget, async {
                self.store.close().await.map_err(FlowError::from_store)
            })
            .await,
            bounded("ledger.close", budget, async {
                self.ledger.close().await.map_err(FlowError::from_ledger)
            })
            .await,
            bounded("prover.close", budget, async {
                self.prover.close().await.map_err(FlowError::from_prover)
            })
            .await,
        ];

        let mut first = None;
        for result in results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "collaborator failed to close");
                first.get_or_insert(e);
            }
        }
        tracing::info!("services shut down");
        first.map_or(Ok(()), Err)
    }

    /// Encrypt `profile` and serialize the bundle, off the async workers.
    pub(crate) async fn seal(&self, profile: BiometricProfile) -> Result<Vec<u8>, FlowError> {
        let vault = self.vault;
        tokio::task::spawn_blocking(move || {
            vault
                .encrypt(&profile)
                .and_then(|bundle| bundle.to_bytes())
        })
        .await
        .map_err(|e| FlowError::EncryptionError(format!("encryption task failed: {e}")))?
        .map_err(FlowError::from_vault)
    }

    /// Fetch the blob at `address` and open it.
    pub(crate) async fn open_profile(
        &self,
        address: &ContentAddress,
    ) -> Result<BiometricProfile, FlowError> {
        let bytes = bounded("store.get", self.timeouts.store(), async {
            self.store.get(address).await.map_err(FlowError::from_store)
        })
        .await?;
        self.unseal(bytes).await
    }

    pub(crate) async fn unseal(&self, bytes: Vec<u8>) -> Result<BiometricProfile, FlowError> {
        let vault = self.vault;
        tokio::task::spawn_blocking(move || {
            let bundle = EncryptedBundle::from_bytes(&bytes)?;
            vault.decrypt(&bundle)
        })
        .await
        .map_err(|e| FlowError::DecryptionError(format!("decryption task failed: {e}")))?
        .map_err(FlowError::from_vault)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), FlowError> {
        if self.is_closed() {
            Err(FlowError::Config("services have been shut down".into()))
        } else {
            Ok(())
        }
    }
}

/// Run `call` under `budget`; elapsed becomes [`FlowError::Timeout`].
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    budget: Duration,
    call: F,
) -> Result<T, FlowError>
where
    F: Future<Output = Result<T, FlowError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, budget_ms = budget.as_millis() as u64, "call timed out");
            Err(FlowError::Timeout { operation })
        }
    }
}
