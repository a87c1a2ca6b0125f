use statehist_client::ChainHistory;
use statehist_primitives::ReadWriteLists;
use statehist_store::{HistoryStore, SeqResolver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::IngestError;

/// Heights between progress log lines.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Counters reported after an ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub blocks: u64,
    pub txs: u64,
    pub skipped_txs: u64,
}

/// Walks the chain from height 1 and applies each transaction's state diff to
/// the store, one atomic batch per transaction.
#[derive(Debug)]
pub struct IngestDriver<'a, H> {
    history: &'a H,
    store: &'a HistoryStore,
}

impl<'a, H: ChainHistory> IngestDriver<'a, H> {
    pub fn new(history: &'a H, store: &'a HistoryStore) -> Self {
        Self { history, store }
    }

    /// Ingests heights `[1, end_height)` in order.
    ///
    /// Heights already present in the store are simply rewritten with
    /// identical bytes, so re-running over an existing index is safe. The
    /// cancellation token is checked between heights; whole blocks are
    /// committed or not at all.
    pub async fn run(
        &self,
        end_height: u64,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary, IngestError> {
        let mut summary = IngestSummary::default();
        for height in 1..end_height {
            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled(height));
            }
            if height % PROGRESS_INTERVAL == 0 {
                info!(height, "ingesting");
            }
            let block = self.history.block_by_height(height).await?;
            for hash in block.transactions {
                let tx = self.history.tx_by_hash(hash).await?;
                if !tx.was_executed() {
                    debug!(%hash, "skipping rejected transaction");
                    summary.skipped_txs += 1;
                    continue;
                }
                let rw_lists = tx.rw_lists.unwrap_or_default();
                if !rw_lists.is_empty() {
                    self.apply_diff(height, &rw_lists)?;
                }
                summary.txs += 1;
            }
            summary.blocks += 1;
        }
        Ok(summary)
    }

    /// Applies one transaction's diff at `height` as a single durable batch.
    ///
    /// Writes land in list order within each kind: counters, accounts,
    /// bytecode, then storage. Any error discards the whole batch.
    pub fn apply_diff(&self, height: u64, rw_lists: &ReadWriteLists) -> Result<(), IngestError> {
        let resolver = SeqResolver::from_rw_lists(rw_lists)?;
        let mut writer = self.store.begin_write(height);
        for op in &rw_lists.creation_counter_wlist {
            writer.put_creation_counter(op.lsb, op.counter);
        }
        for op in &rw_lists.account_wlist {
            writer.put_account(op.addr, &op.account)?;
        }
        for op in &rw_lists.bytecode_wlist {
            writer.put_bytecode(op.addr, &op.bytecode)?;
        }
        for op in &rw_lists.storage_wlist {
            writer.put_storage_seq(&resolver, op.seq, op.key, &op.value)?;
        }
        writer.commit()?;
        Ok(())
    }
}
