//! JSON-RPC method definitions.

use crate::error::RpcError;
use crate::handlers::{IssueTxResponse, RangeEntry, RpcHandler};
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::RpcModule;
use quark_core::ChainVm;
use quark_types::{Hash, PrefixInfo};
use std::sync::Arc;
use std::time::Duration;

#[rpc(server)]
pub trait QuarkApi {
    #[method(name = "quark.range")]
    fn range(
        &self,
        prefix: String,
        key: String,
        #[argument(rename = "rangeEnd")] range_end: Option<String>,
        limit: Option<usize>,
    ) -> Result<Vec<RangeEntry>, RpcError>;

    #[method(name = "quark.prefixInfo")]
    fn prefix_info(&self, prefix: String) -> Result<PrefixInfo, RpcError>;

    #[method(name = "quark.issueTx")]
    async fn issue_tx(
        &self,
        tx: String,
        #[argument(rename = "waitTimeoutMs")] wait_timeout_ms: Option<u64>,
    ) -> Result<IssueTxResponse, RpcError>;

    #[method(name = "quark.hasTx")]
    fn has_tx(&self, #[argument(rename = "txId")] tx_id: Hash) -> Result<bool, RpcError>;
}

#[async_trait]
impl QuarkApiServer for RpcHandler {
    fn range(
        &self,
        prefix: String,
        key: String,
        range_end: Option<String>,
        limit: Option<usize>,
    ) -> Result<Vec<RangeEntry>, RpcError> {
        RpcHandler::range(self, &prefix, &key, range_end.as_deref(), limit.unwrap_or(0))
    }

    fn prefix_info(&self, prefix: String) -> Result<PrefixInfo, RpcError> {
        RpcHandler::prefix_info(self, &prefix)
    }

    async fn issue_tx(
        &self,
        tx: String,
        wait_timeout_ms: Option<u64>,
    ) -> Result<IssueTxResponse, RpcError> {
        RpcHandler::issue_tx(self, &tx, wait_timeout_ms.map(Duration::from_millis)).await
    }

    fn has_tx(&self, tx_id: Hash) -> Result<bool, RpcError> {
        RpcHandler::has_tx(self, &tx_id)
    }
}

/// Build the `quark.*` method module over `vm`. Serving it is up to the host.
pub fn rpc_module(vm: Arc<ChainVm>) -> RpcModule<RpcHandler> {
    RpcHandler::new(vm).into_rpc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::core::rpc_params;
    use quark_core::{ManualClock, Vm};
    use quark_storage::{Database, MemoryDatabase};
    use quark_txpool::{Mempool, PoolConfig, TxPool};
    use quark_types::{Address, BaseTx, Codec, Genesis, Transaction};

    fn vm() -> Arc<ChainVm> {
        let codec = Arc::new(Codec::new().unwrap());
        let genesis = Genesis::default();
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let mempool = Arc::new(TxPool::new(Arc::clone(&codec), genesis.clone(), PoolConfig::default()));
        Arc::new(ChainVm::initialize(genesis, codec, db, mempool, Arc::new(ManualClock::new(10))).unwrap())
    }

    #[test]
    fn test_module_methods() {
        let module = rpc_module(vm());
        let names: Vec<_> = module.method_names().collect();
        for name in ["quark.range", "quark.prefixInfo", "quark.issueTx", "quark.hasTx"] {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_issue_and_query_through_module() {
        let vm = vm();
        let module = rpc_module(Arc::clone(&vm));

        let owner = Address::from_bytes([0xa1; 20]);
        let base = BaseTx::new(owner, 0, vm.mempool().min_price(), vm.last_accepted().0);
        let claim = Transaction::claim(base, "hello.avax");
        let raw = format!("0x{}", hex::encode(vm.codec().marshal(&claim).unwrap()));

        let response: IssueTxResponse = module
            .call("quark.issueTx", rpc_params![raw, Option::<u64>::None])
            .await
            .unwrap();
        assert!(!response.accepted);
        let pending: bool = module.call("quark.hasTx", rpc_params![response.tx_id]).await.unwrap();
        assert!(!pending);

        let block = vm.verify(vm.build_block_at(10).unwrap()).unwrap();
        vm.accepted(&block);

        let accepted: bool = module.call("quark.hasTx", rpc_params![response.tx_id]).await.unwrap();
        assert!(accepted);
        let info: PrefixInfo = module.call("quark.prefixInfo", rpc_params!["hello.avax"]).await.unwrap();
        assert_eq!(info.owner, owner);

        let missing: Result<PrefixInfo, _> = module.call("quark.prefixInfo", rpc_params!["nobody"]).await;
        assert!(missing.is_err());
    }
}
