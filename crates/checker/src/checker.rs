use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use statehist_client::{ClientResult, StateOracle};
use statehist_primitives::{AccountData, BytecodeData, EntityKey, HistoricalRecord, B256, U256};
use statehist_store::{HistoryStore, StoreError, StoreResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::CheckError;

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Capacity of the scanner-to-checker channel.
    pub channel_capacity: usize,
    /// Total attempts per oracle call before the checker gives up.
    pub oracle_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub retry_backoff: Duration,
    /// Fixed RNG seed, for replaying a run over the same sampled heights.
    /// When absent a seed is drawn from entropy and logged.
    pub seed: Option<u64>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            oracle_retries: 3,
            retry_backoff: Duration::from_millis(500),
            seed: None,
        }
    }
}

/// Counters reported after a check run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Validity intervals received from the scanner.
    pub records: u64,
    /// Oracle query points evaluated.
    pub checked: u64,
    /// Query points where the oracle disagreed with the index.
    pub mismatches: u64,
    /// Zero-width intervals dropped without querying.
    pub skipped: u64,
}

/// Scans the store's reconstructed history and verifies each interval against
/// the oracle at up to three heights: the start, one pseudo-random interior
/// height for wide intervals, and the last covered height.
///
/// The store is consumed; scanning happens on a blocking task feeding this
/// consumer through a bounded channel. Mismatches are logged and counted,
/// never fatal; an unreachable oracle or a malformed record aborts the run.
pub async fn run_checks<O: StateOracle>(
    store: HistoryStore,
    oracle: &O,
    latest_height: u64,
    config: CheckerConfig,
    cancel: &CancellationToken,
) -> Result<CheckSummary, CheckError> {
    let (tx, mut rx) = mpsc::channel::<StoreResult<HistoricalRecord>>(config.channel_capacity);
    let producer = tokio::task::spawn_blocking(move || {
        for item in store.historical_records(latest_height) {
            let is_err = item.is_err();
            if tx.blocking_send(item).is_err() || is_err {
                return;
            }
        }
    });

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let seed = rand::random();
            info!(seed, "rng seed drawn from entropy");
            StdRng::seed_from_u64(seed)
        }
    };

    let checker = RecordChecker {
        oracle,
        config: &config,
    };
    let mut summary = CheckSummary::default();
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return Err(CheckError::Cancelled),
            item = rx.recv() => item,
        };
        let Some(item) = item else { break };
        let rec = item?;
        summary.records += 1;
        if rec.is_zero_width() {
            debug!(addr = %rec.addr, "dropping zero-width interval");
            summary.skipped += 1;
            continue;
        }
        debug!(
            addr = %rec.addr,
            start = rec.start_height,
            end = rec.end_height,
            "checking record"
        );
        for height in query_heights(&mut rng, rec.start_height, rec.end_height) {
            summary.checked += 1;
            if checker.check_at(&rec, height).await? {
                summary.mismatches += 1;
            }
        }
    }
    producer.await?;
    Ok(summary)
}

/// The heights at which a `[start, end)` interval is verified.
fn query_heights(rng: &mut StdRng, start: u64, end: u64) -> Vec<u64> {
    let mut heights = vec![start];
    if end - start >= 4 {
        heights.push(rng.gen_range(start + 1..end - 1));
    }
    if end - 1 > start {
        heights.push(end - 1);
    }
    heights
}

struct RecordChecker<'a, O> {
    oracle: &'a O,
    config: &'a CheckerConfig,
}

impl<O: StateOracle> RecordChecker<'_, O> {
    /// Returns whether the oracle disagreed with the record at `height`.
    async fn check_at(&self, rec: &HistoricalRecord, height: u64) -> Result<bool, CheckError> {
        match rec.key {
            EntityKey::Account => self.check_account(rec, height).await,
            EntityKey::Bytecode => self.check_bytecode(rec, height).await,
            EntityKey::Storage(slot) => self.check_storage(rec, slot, height).await,
        }
    }

    async fn check_account(&self, rec: &HistoricalRecord, height: u64) -> Result<bool, CheckError> {
        let nonce = self
            .with_retry(|| self.oracle.nonce_at(rec.addr, height))
            .await?;
        let balance = self
            .with_retry(|| self.oracle.balance_at(rec.addr, height))
            .await?;
        let (want_nonce, want_balance) = if rec.is_deletion() {
            (0, U256::ZERO)
        } else {
            let data = AccountData::new(&rec.value)
                .map_err(|_| StoreError::MalformedAccount(rec.addr, rec.value.len()))?;
            (data.nonce(), data.balance())
        };
        if nonce != want_nonce || balance != want_balance {
            warn!(
                addr = %rec.addr,
                height,
                want_nonce,
                got_nonce = nonce,
                %want_balance,
                got_balance = %balance,
                "account mismatch"
            );
            return Ok(true);
        }
        Ok(false)
    }

    async fn check_bytecode(
        &self,
        rec: &HistoricalRecord,
        height: u64,
    ) -> Result<bool, CheckError> {
        let code = self
            .with_retry(|| self.oracle.code_at(rec.addr, height))
            .await?;
        let want: &[u8] = if rec.is_deletion() {
            &[]
        } else {
            BytecodeData::new(&rec.value)
                .map_err(|_| StoreError::MalformedBytecode(rec.addr, rec.value.len()))?
                .code()
        };
        if code.as_ref() != want {
            warn!(addr = %rec.addr, height, "bytecode mismatch");
            return Ok(true);
        }
        Ok(false)
    }

    async fn check_storage(
        &self,
        rec: &HistoricalRecord,
        slot: B256,
        height: u64,
    ) -> Result<bool, CheckError> {
        let value = self
            .with_retry(|| self.oracle.storage_at(rec.addr, slot, height))
            .await?;
        let matches = if rec.is_deletion() {
            value.is_zero()
        } else {
            rec.value.as_slice() == value.as_slice()
        };
        if !matches {
            warn!(addr = %rec.addr, %slot, height, got = %value, "storage mismatch");
        }
        Ok(!matches)
    }

    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, CheckError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut backoff = self.config.retry_backoff;
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.oracle_retries => {
                    warn!(error = %e, attempt, "oracle call failed, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(CheckError::Oracle(e)),
            }
        }
    }
}
