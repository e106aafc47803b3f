//! JSON-RPC method handlers.
//!
//! Keys and values are opaque bytes and travel as `0x`-prefixed hex. Prefix
//! and key parameters are plain text.

use crate::error::{RpcError, RpcResult};
use quark_core::{ChainVm, Clock, Vm};
use quark_txpool::Mempool;
use quark_types::{Hash, PrefixInfo, Transaction, DELIMITER};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How often a bounded `issue_tx` wait checks the accepted-tx index.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One entry of a range query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    /// Full `prefix/key` path
    pub key: String,
    pub value: String,
}

/// Result of a transaction submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTxResponse {
    #[serde(rename = "txId")]
    pub tx_id: Hash,
    /// Whether the transaction was seen in an accepted block
    pub accepted: bool,
}

/// Handlers over a running VM.
pub struct RpcHandler {
    vm: Arc<ChainVm>,
}

impl RpcHandler {
    pub fn new(vm: Arc<ChainVm>) -> Self {
        Self { vm }
    }

    pub fn vm(&self) -> &Arc<ChainVm> {
        &self.vm
    }

    /// Key-value pairs of `prefix` in `[key, range_end)`.
    ///
    /// `key` and `range_end` may be bare keys or full `prefix/key` paths. A
    /// missing `range_end` scans to the end of the prefix; `limit` 0 returns
    /// everything.
    pub fn range(
        &self,
        prefix: &str,
        key: &str,
        range_end: Option<&str>,
        limit: usize,
    ) -> RpcResult<Vec<RangeEntry>> {
        let start = strip_prefix(prefix, key);
        let end = range_end.map(|end| strip_prefix(prefix, end)).unwrap_or_default();

        let db = self.vm.state();
        let now = self.vm.clock().now();
        let entries = self
            .vm
            .prefix_store()
            .range(db.as_ref(), prefix.as_bytes(), start.as_bytes(), end.as_bytes(), limit, now)?
            .map(|kv| {
                kv.map(|kv| RangeEntry {
                    key: encode_hex(&kv.key),
                    value: encode_hex(&kv.value),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn prefix_info(&self, prefix: &str) -> RpcResult<PrefixInfo> {
        let db = self.vm.state();
        Ok(self.vm.prefix_store().info(db.as_ref(), prefix.as_bytes())?)
    }

    /// Decode a transaction and add it to the mempool.
    ///
    /// Without `wait` this returns as soon as the transaction is pooled.
    /// With `wait` it polls until the transaction is accepted, or fails with
    /// [`RpcError::Timeout`] once `wait` has elapsed; the transaction stays
    /// pooled either way.
    pub async fn issue_tx(&self, tx_hex: &str, wait: Option<Duration>) -> RpcResult<IssueTxResponse> {
        let bytes = decode_hex(tx_hex)?;
        let codec = self.vm.codec();
        let tx: Transaction = codec.unmarshal(&bytes)?;
        let id = codec.id(&tx)?;
        if self.vm.has_tx(&id)? {
            return Err(RpcError::TransactionRejected(format!(
                "transaction {id} is already accepted"
            )));
        }
        self.vm.mempool().try_add(tx)?;
        tracing::debug!(tx = %id, "Transaction submitted");

        let Some(wait) = wait else {
            return Ok(IssueTxResponse {
                tx_id: id,
                accepted: false,
            });
        };
        match tokio::time::timeout(wait, self.wait_accepted(&id)).await {
            Ok(result) => {
                result?;
                Ok(IssueTxResponse {
                    tx_id: id,
                    accepted: true,
                })
            }
            Err(_) => Err(RpcError::Timeout(format!(
                "transaction {id} not accepted within {} ms",
                wait.as_millis()
            ))),
        }
    }

    pub fn has_tx(&self, id: &Hash) -> RpcResult<bool> {
        Ok(self.vm.has_tx(id)?)
    }

    async fn wait_accepted(&self, id: &Hash) -> RpcResult<()> {
        loop {
            if self.vm.has_tx(id)? {
                return Ok(());
            }
            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }
}

/// Drop a leading `prefix/` from `raw`.
fn strip_prefix<'a>(prefix: &str, raw: &'a str) -> &'a str {
    raw.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(char::from(DELIMITER)))
        .unwrap_or(raw)
}

fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_hex(raw: &str) -> RpcResult<Vec<u8>> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| RpcError::InvalidParams(format!("invalid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quark_core::ManualClock;
    use quark_storage::{Database, MemoryDatabase};
    use quark_txpool::{PoolConfig, TxPool};
    use quark_types::{Address, BaseTx, Codec, Genesis};

    const ALICE: Address = Address::from_bytes([0xa1; 20]);

    fn handler() -> RpcHandler {
        handler_with_clock(Arc::new(ManualClock::new(10)))
    }

    fn handler_with_clock(clock: Arc<ManualClock>) -> RpcHandler {
        let codec = Arc::new(Codec::new().unwrap());
        let genesis = Genesis::default();
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let mempool = Arc::new(TxPool::new(Arc::clone(&codec), genesis.clone(), PoolConfig::default()));
        let vm = ChainVm::initialize(genesis, codec, db, mempool, clock).unwrap();
        RpcHandler::new(Arc::new(vm))
    }

    fn base(h: &RpcHandler, nonce: u64) -> BaseTx {
        BaseTx::new(ALICE, nonce, h.vm().mempool().min_price(), h.vm().last_accepted().0)
    }

    fn tx_hex(h: &RpcHandler, tx: &Transaction) -> String {
        encode_hex(&h.vm().codec().marshal(tx).unwrap())
    }

    fn accept_pending(vm: &ChainVm, now: u64) {
        let block = vm.verify(vm.build_block_at(now).unwrap()).unwrap();
        vm.accepted(&block);
    }

    fn text(hex_value: &str) -> String {
        String::from_utf8(decode_hex(hex_value).unwrap()).unwrap()
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("hello.avax", "hello.avax/foo1"), "foo1");
        assert_eq!(strip_prefix("hello.avax", "foo1"), "foo1");
        assert_eq!(strip_prefix("hello.avax", "hello.avaxfoo"), "hello.avaxfoo");
    }

    #[tokio::test]
    async fn test_hello_avax_over_rpc() {
        let h = handler();
        let claim = Transaction::claim(base(&h, 0), "hello.avax");
        h.issue_tx(&tx_hex(&h, &claim), None).await.unwrap();
        accept_pending(h.vm(), 10);

        for (nonce, key, value) in [(1, "foo1", "hello world 1"), (2, "foo2", "hello world 2")] {
            let set = Transaction::set(base(&h, nonce), "hello.avax", key, value);
            h.issue_tx(&tx_hex(&h, &set), None).await.unwrap();
        }
        accept_pending(h.vm(), 11);

        let entries = h
            .range("hello.avax", "hello.avax/foo1", Some("hello.avax/foo3"), 0)
            .unwrap();
        let pairs: Vec<_> = entries.iter().map(|e| (text(&e.key), text(&e.value))).collect();
        assert_eq!(
            pairs,
            vec![
                ("hello.avax/foo1".to_string(), "hello world 1".to_string()),
                ("hello.avax/foo2".to_string(), "hello world 2".to_string()),
            ]
        );

        assert_eq!(h.range("hello.avax", "foo1", None, 1).unwrap().len(), 1);

        let info = h.prefix_info("hello.avax").unwrap();
        assert_eq!(info.owner, ALICE);
        assert_eq!(info.created, 10);
    }

    #[tokio::test]
    async fn test_range_is_empty_once_prefix_expires() {
        let clock = Arc::new(ManualClock::new(10));
        let h = handler_with_clock(Arc::clone(&clock));
        h.issue_tx(&tx_hex(&h, &Transaction::claim(base(&h, 0), "hello.avax")), None)
            .await
            .unwrap();
        accept_pending(h.vm(), 10);
        let set = Transaction::set(base(&h, 1), "hello.avax", "foo", "bar");
        h.issue_tx(&tx_hex(&h, &set), None).await.unwrap();
        accept_pending(h.vm(), 11);
        assert_eq!(h.range("hello.avax", "", None, 0).unwrap().len(), 1);

        let expiry = h.prefix_info("hello.avax").unwrap().expiry;
        clock.set(expiry + 1_000);
        assert!(h.range("hello.avax", "", None, 0).unwrap().is_empty());
        // the record itself stays queryable
        assert_eq!(h.prefix_info("hello.avax").unwrap().owner, ALICE);
    }

    #[tokio::test]
    async fn test_prefix_info_not_found() {
        let h = handler();
        let err = h.prefix_info("nobody").unwrap_err();
        assert!(matches!(err, RpcError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_issue_tx_rejects_bad_input() {
        let h = handler();
        assert!(matches!(h.issue_tx("0xzz", None).await, Err(RpcError::InvalidParams(_))));
        assert!(matches!(h.issue_tx("0x0001", None).await, Err(RpcError::InvalidParams(_))));

        let claim = Transaction::claim(base(&h, 0), "hello.avax");
        let raw = tx_hex(&h, &claim);
        h.issue_tx(&raw, None).await.unwrap();
        assert!(matches!(
            h.issue_tx(&raw, None).await,
            Err(RpcError::TransactionRejected(_))
        ));

        accept_pending(h.vm(), 10);
        assert!(matches!(
            h.issue_tx(&raw, None).await,
            Err(RpcError::TransactionRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_issue_tx_waits_for_acceptance() {
        let h = handler();
        let claim = Transaction::claim(base(&h, 0), "hello.avax");
        let raw = tx_hex(&h, &claim);

        let vm = Arc::clone(h.vm());
        let acceptor = tokio::spawn(async move {
            while vm.mempool().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            accept_pending(&vm, 10);
        });

        let response = h.issue_tx(&raw, Some(Duration::from_secs(5))).await.unwrap();
        assert!(response.accepted);
        assert!(h.has_tx(&response.tx_id).unwrap());
        acceptor.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_tx_times_out() {
        let h = handler();
        let claim = Transaction::claim(base(&h, 0), "hello.avax");
        let raw = tx_hex(&h, &claim);

        let err = h
            .issue_tx(&raw, Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Timeout(_)));
        // still pooled for a later block
        assert_eq!(h.vm().mempool().len(), 1);
    }
}
