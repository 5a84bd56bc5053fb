//! The coin adapter handed to the pool server.

use std::sync::Arc;

use coin_core::difficulty;
use coin_core::hash::hash_to_hex;
use coin_core::{
    block, BlockError, BlockTemplate, CoinParams, CryptoNight, HashEngine, InstanceId,
    TemplateError,
};
use primitive_types::U256;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AdapterConfig, ConfigError};
use crate::rpc::{self, Endpoint, RpcClient, RpcError};
use crate::state::{Balance, BlockHeaderInfo, WalletBalance, WalletStatus};

/// Errors from adapter operations that go beyond a single RPC call.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to generate instance id: {0}")]
    Entropy(String),
    #[error("hash task failed: {0}")]
    HashTask(String),
}

/// Coin-specific operations the pool server needs: daemon and wallet RPC,
/// block template construction, address checks and proof-of-work hashing.
pub struct CoinAdapter<R, H = CryptoNight> {
    /// Daemon and wallet transport.
    rpc: R,
    /// Proof-of-work function.
    engine: Arc<H>,
    /// Loaded configuration.
    config: AdapterConfig,
    /// Tag stamped into every template this process hands out.
    instance_id: InstanceId,
}

impl<R: RpcClient> CoinAdapter<R, CryptoNight> {
    /// Create an adapter hashing with CryptoNight and a random instance id.
    pub fn new(rpc: R, config: AdapterConfig) -> Result<Self, AdapterError> {
        Self::with_engine(rpc, config, CryptoNight)
    }
}

impl<R: RpcClient, H: HashEngine + 'static> CoinAdapter<R, H> {
    /// Create an adapter with a custom proof-of-work engine.
    pub fn with_engine(rpc: R, config: AdapterConfig, engine: H) -> Result<Self, AdapterError> {
        let instance_id = random_instance_id()?;
        Self::with_instance_id(rpc, config, engine, instance_id)
    }

    /// Create an adapter with a fixed instance id.
    ///
    /// Two processes sharing an instance id search the same nonces; only use
    /// this when the id is known to be unique.
    pub fn with_instance_id(
        rpc: R,
        config: AdapterConfig,
        engine: H,
        instance_id: InstanceId,
    ) -> Result<Self, AdapterError> {
        config.validate()?;
        info!(
            coin = %config.coin.symbol,
            %instance_id,
            reserve_size = config.reserve_size,
            "coin adapter ready"
        );

        Ok(CoinAdapter {
            rpc,
            engine: Arc::new(engine),
            config,
            instance_id,
        })
    }

    // Daemon

    /// Look up a block header by block id.
    pub async fn get_block_header_by_hash(&self, hash: &str) -> Result<BlockHeaderInfo, RpcError> {
        const METHOD: &str = "getblockheaderbyhash";
        let result = rpc::call_result(&self.rpc, Endpoint::Daemon, METHOD, json!({ "hash": hash })).await?;
        rpc::decode(Endpoint::Daemon, METHOD, result, Some("block_header"))
    }

    /// Look up a block header by height.
    ///
    /// The daemon answers `getblockheaderbyheight` for `h` with the header
    /// of block `h - 1`, so the request carries `height + 1` to get the
    /// header of block `height` itself.
    pub async fn get_block_header_by_height(&self, height: u64) -> Result<BlockHeaderInfo, RpcError> {
        const METHOD: &str = "getblockheaderbyheight";
        let params = json!({ "height": height.saturating_add(1) });
        let result = rpc::call_result(&self.rpc, Endpoint::Daemon, METHOD, params).await?;
        rpc::decode(Endpoint::Daemon, METHOD, result, Some("block_header"))
    }

    /// The header at the chain tip.
    pub async fn get_last_block_header(&self) -> Result<BlockHeaderInfo, RpcError> {
        const METHOD: &str = "getlastblockheader";
        let result = rpc::call_result(&self.rpc, Endpoint::Daemon, METHOD, json!([])).await?;
        rpc::decode(Endpoint::Daemon, METHOD, result, Some("block_header"))
    }

    /// Request a block template paying `wallet_address`.
    ///
    /// Returns the daemon's whole response; only transport failures are
    /// errors here.
    pub async fn get_block_template(&self, wallet_address: &str) -> Result<Value, RpcError> {
        let params = self.template_params(wallet_address);
        rpc::call(&self.rpc, Endpoint::Daemon, "getblocktemplate", params).await
    }

    /// Fetch a block template and prepare it for nonce partitioning.
    pub async fn new_block_template(&self, wallet_address: &str) -> Result<BlockTemplate, AdapterError> {
        let params = self.template_params(wallet_address);
        let result = rpc::call_result(&self.rpc, Endpoint::Daemon, "getblocktemplate", params).await?;
        Ok(BlockTemplate::from_rpc_result(&result, self.instance_id)?)
    }

    fn template_params(&self, wallet_address: &str) -> Value {
        json!({
            "reserve_size": self.config.reserve_size,
            "wallet_address": wallet_address,
        })
    }

    /// Submit a solved block blob (hex); returns the daemon's status verbatim.
    pub async fn submit_block(&self, blob_hex: &str) -> Result<String, RpcError> {
        const METHOD: &str = "submitblock";
        let result = rpc::call_result(&self.rpc, Endpoint::Daemon, METHOD, json!([blob_hex])).await?;
        let status: String = rpc::decode(Endpoint::Daemon, METHOD, result, Some("status"))?;
        info!(%status, "block submitted");
        Ok(status)
    }

    // Wallet

    /// Pool wallet balance.
    pub async fn get_balance(&self) -> Result<Balance, RpcError> {
        const METHOD: &str = "getBalance";
        let result = rpc::call_result(&self.rpc, Endpoint::Wallet, METHOD, json!({})).await?;
        let wallet: WalletBalance = rpc::decode(Endpoint::Wallet, METHOD, result, None)?;
        Ok(wallet.into())
    }

    /// Chain height as seen by the wallet.
    pub async fn get_height(&self) -> Result<u64, RpcError> {
        const METHOD: &str = "getStatus";
        let result = rpc::call_result(&self.rpc, Endpoint::Wallet, METHOD, json!({})).await?;
        let status: WalletStatus = rpc::decode(Endpoint::Wallet, METHOD, result, None)?;
        Ok(status.block_count)
    }

    // Addresses

    /// Whether `address` is a standard address of this coin.
    pub fn validate_address(&self, address: &str) -> bool {
        coin_core::validate_address(address, &self.config.coin)
    }

    /// Whether `address` is an integrated address of this coin.
    pub fn is_integrated_address(&self, address: &str) -> bool {
        coin_core::is_integrated_address(address, &self.config.coin)
    }

    pub fn is_blocked_address(&self, address: &str) -> bool {
        self.config.coin.is_blocked_address(address)
    }

    pub fn requires_payment_id(&self, address: &str) -> bool {
        self.config.coin.requires_payment_id(address)
    }

    // Blobs and hashing

    /// The numerator of every share target.
    pub fn base_diff(&self) -> U256 {
        difficulty::base_diff()
    }

    /// Reduce a block blob to the blob workers hash.
    pub fn convert_blob(&self, blob: &[u8]) -> Result<Vec<u8>, BlockError> {
        block::convert_blob(blob)
    }

    /// Stamp a worker's nonce into a block blob, ready for submission.
    pub fn construct_new_blob(&self, blob: &[u8], nonce: &[u8; 4]) -> Result<Vec<u8>, BlockError> {
        block::construct_block_blob(blob, nonce)
    }

    /// Block id of a block blob, as hex.
    pub fn get_block_id(&self, blob: &[u8]) -> Result<String, BlockError> {
        block::get_block_id(blob).map(|id| hash_to_hex(&id))
    }

    /// Proof-of-work hash of a hashing blob, on the calling thread.
    pub fn cryptonight(&self, blob: &[u8]) -> [u8; 32] {
        self.engine.evaluate(blob)
    }

    /// Proof-of-work hash of a hashing blob, on tokio's blocking pool.
    pub async fn cryptonight_async(&self, blob: Vec<u8>) -> Result<[u8; 32], AdapterError> {
        let engine = Arc::clone(&self.engine);
        debug!(len = blob.len(), "hashing blob on blocking pool");
        tokio::task::spawn_blocking(move || engine.evaluate(&blob))
            .await
            .map_err(|e| AdapterError::HashTask(e.to_string()))
    }

    // Constants

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn params(&self) -> &CoinParams {
        &self.config.coin
    }

    /// Starting difficulty for NiceHash connections.
    pub fn nice_hash_diff(&self) -> u64 {
        self.config.coin.nice_hash_diff
    }

    pub fn supports_auto_exchange(&self) -> bool {
        self.config.coin.supports_auto_exchange
    }

    /// Exchange payouts are routed through.
    pub fn best_exchange(&self) -> &str {
        &self.config.payout.best_exchange
    }
}

fn random_instance_id() -> Result<InstanceId, AdapterError> {
    let mut bytes = [0u8; 4];
    getrandom::getrandom(&mut bytes).map_err(|e| AdapterError::Entropy(e.to_string()))?;
    Ok(InstanceId::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::TransportError;
    use coin_core::cn_fast_hash;
    use coin_core::varint::write_varint;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const INSTANCE: InstanceId = InstanceId::from_bytes([0xde, 0xad, 0xbe, 0xef]);
    const DEV_ADDRESS: &str = "iz5w5LGYQY2SseEd9BTaF8SRqFmZLTEVDBEGidvzYnZBcc9RMEHXs2rXBZfAvXQPPc85NR2JeZcQUj7jjBcgw26b1Rk6m4H2z";

    type Call = (Endpoint, String, Value);

    /// Canned responses keyed by method; records every call it sees.
    #[derive(Default)]
    struct MockRpc {
        responses: HashMap<String, Result<Value, TransportError>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockRpc {
        fn respond(mut self, method: &str, response: Value) -> Self {
            self.responses.insert(method.into(), Ok(response));
            self
        }

        fn fail(mut self, method: &str, message: &str) -> Self {
            self.responses
                .insert(method.into(), Err(TransportError(message.into())));
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn reply(&self, endpoint: Endpoint, method: &str, params: Value) -> Result<Value, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint, method.to_string(), params));
            self.responses
                .get(method)
                .cloned()
                .unwrap_or_else(|| Err(TransportError(format!("no response for {method}"))))
        }
    }

    #[async_trait::async_trait]
    impl RpcClient for MockRpc {
        async fn daemon_call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
            self.reply(Endpoint::Daemon, method, params)
        }

        async fn wallet_call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
            self.reply(Endpoint::Wallet, method, params)
        }
    }

    /// Keccak stands in for CryptoNight to keep tests fast.
    struct FastHash;

    impl HashEngine for FastHash {
        fn evaluate(&self, blob: &[u8]) -> [u8; 32] {
            cn_fast_hash(blob)
        }
    }

    fn adapter(rpc: MockRpc) -> (Arc<MockRpc>, CoinAdapter<Arc<MockRpc>, FastHash>) {
        let rpc = Arc::new(rpc);
        let adapter =
            CoinAdapter::with_instance_id(Arc::clone(&rpc), AdapterConfig::default(), FastHash, INSTANCE)
                .unwrap();
        (rpc, adapter)
    }

    /// A daemon-shaped block blob with one transaction; returns the blob and
    /// its reserved offset.
    fn template_blob() -> (Vec<u8>, usize) {
        let mut blob = Vec::new();
        write_varint(1, &mut blob);
        write_varint(0, &mut blob);
        write_varint(1_500_000_000, &mut blob);
        blob.extend_from_slice(&[0xab; 32]);
        blob.extend_from_slice(&[0u8; 4]);

        write_varint(1, &mut blob);
        write_varint(60, &mut blob);
        write_varint(1, &mut blob);
        blob.push(0xff);
        write_varint(1_000, &mut blob);
        write_varint(1, &mut blob);
        write_varint(5_000, &mut blob);
        blob.push(0x02);
        blob.extend_from_slice(&[0x11; 32]);
        write_varint(2 + 17, &mut blob);
        blob.extend_from_slice(&[0x02, 17]);
        let reserved_offset = blob.len();
        blob.extend_from_slice(&[0u8; 17]);

        write_varint(1, &mut blob);
        blob.extend_from_slice(&[0x22; 32]);
        (blob, reserved_offset)
    }

    fn header(height: u64) -> Value {
        json!({"block_header": {"height": height, "hash": "aa", "reward": 8_000, "depth": 3}})
    }

    #[tokio::test]
    async fn test_header_by_height_compensates_daemon_offset() {
        // the daemon serves block 100 for a request of 101
        let (rpc, adapter) = adapter(MockRpc::default().respond("getblockheaderbyheight", json!({"result": header(100)})));

        let header = adapter.get_block_header_by_height(100).await.unwrap();
        assert_eq!(header.height, 100);
        assert_eq!(header.reward, 8_000);
        assert_eq!(
            rpc.calls(),
            vec![(Endpoint::Daemon, "getblockheaderbyheight".into(), json!({"height": 101}))]
        );
    }

    #[tokio::test]
    async fn test_header_by_hash_and_tip() {
        let (rpc, adapter) = adapter(
            MockRpc::default()
                .respond("getblockheaderbyhash", json!({"result": header(7)}))
                .respond("getlastblockheader", json!({"result": header(9)})),
        );

        assert_eq!(adapter.get_block_header_by_hash("aa").await.unwrap().height, 7);
        assert_eq!(adapter.get_last_block_header().await.unwrap().height, 9);

        let calls = rpc.calls();
        assert_eq!(calls[0].2, json!({"hash": "aa"}));
        assert_eq!(calls[1].2, json!([]));
    }

    #[tokio::test]
    async fn test_missing_result_carries_raw_response() {
        let body = json!({"error": {"code": -2, "message": "Requested block not found"}});
        let (_, adapter) = adapter(MockRpc::default().respond("getblockheaderbyhash", body.clone()));

        let err = adapter.get_block_header_by_hash("00").await.unwrap_err();
        assert!(matches!(err, RpcError::NoResult { .. }));
        assert_eq!(err.raw_response(), Some(&body));
    }

    #[tokio::test]
    async fn test_malformed_balance_is_an_error() {
        let (_, adapter) = adapter(MockRpc::default().respond("getBalance", json!({"result": {"status": "busy"}})));

        let err = adapter.get_balance().await.unwrap_err();
        assert!(matches!(err, RpcError::Decode { endpoint: Endpoint::Wallet, .. }));
        assert_eq!(err.raw_response(), Some(&json!({"result": {"status": "busy"}})));
    }

    #[tokio::test]
    async fn test_empty_block_header_is_an_error() {
        let (_, adapter) = adapter(
            MockRpc::default().respond("getlastblockheader", json!({"result": {"block_header": {}}})),
        );

        let err = adapter.get_last_block_header().await.unwrap_err();
        assert!(matches!(err, RpcError::Decode { endpoint: Endpoint::Daemon, .. }));
        assert_eq!(err.raw_response(), Some(&json!({"result": {"block_header": {}}})));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let (rpc, adapter) = adapter(MockRpc::default().fail("getStatus", "connection refused"));

        let err = adapter.get_height().await.unwrap_err();
        assert!(matches!(err, RpcError::Transport { endpoint: Endpoint::Wallet, .. }));
        assert!(err.raw_response().is_none());
        // no retries
        assert_eq!(rpc.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_get_block_template_returns_raw_response() {
        let body = json!({"error": {"code": -9, "message": "Core is busy"}});
        let (rpc, adapter) = adapter(MockRpc::default().respond("getblocktemplate", body.clone()));

        assert_eq!(adapter.get_block_template("iz5w").await.unwrap(), body);
        assert_eq!(
            rpc.calls()[0].2,
            json!({"reserve_size": 17, "wallet_address": "iz5w"})
        );
    }

    #[tokio::test]
    async fn test_new_block_template_stamps_instance_id() {
        let (blob, reserved_offset) = template_blob();
        let (_, adapter) = adapter(MockRpc::default().respond(
            "getblocktemplate",
            json!({"result": {
                "blocktemplate_blob": hex::encode(&blob),
                "difficulty": 1_000,
                "height": 1_000,
                "reserved_offset": reserved_offset,
                "status": "OK",
            }}),
        ));

        let mut template = adapter.new_block_template(DEV_ADDRESS).await.unwrap();
        assert_eq!(template.instance_id(), INSTANCE);
        assert_eq!(
            &template.buffer()[reserved_offset + 4..reserved_offset + 8],
            INSTANCE.as_bytes()
        );
        assert_eq!(template.previous_hash(), &[0xab; 32]);

        let hashing_blob = hex::decode(template.next_blob().unwrap()).unwrap();
        assert_eq!(hashing_blob, adapter.convert_blob(template.buffer()).unwrap());
    }

    #[tokio::test]
    async fn test_new_block_template_rejects_bad_result() {
        let (_, adapter) = adapter(MockRpc::default().respond("getblocktemplate", json!({"result": {"height": 1}})));

        let err = adapter.new_block_template(DEV_ADDRESS).await.unwrap_err();
        assert!(matches!(err, AdapterError::Template(TemplateError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_submit_block_returns_status() {
        let (rpc, adapter) = adapter(MockRpc::default().respond("submitblock", json!({"result": {"status": "OK"}})));

        assert_eq!(adapter.submit_block("0101").await.unwrap(), "OK");
        assert_eq!(rpc.calls()[0].2, json!(["0101"]));
    }

    #[tokio::test]
    async fn test_balance_is_normalized() {
        let (rpc, adapter) = adapter(
            MockRpc::default().respond("getBalance", json!({"result": {"lockedAmount": 5, "availableBalance": 3}})),
        );

        let balance = adapter.get_balance().await.unwrap();
        assert_eq!(balance, Balance { balance: 5, unlocked_balance: 3 });
        assert_eq!(rpc.calls()[0], (Endpoint::Wallet, "getBalance".into(), json!({})));
    }

    #[tokio::test]
    async fn test_height_from_wallet_status() {
        let (_, adapter) = adapter(MockRpc::default().respond("getStatus", json!({"result": {"blockCount": 123_456}})));
        assert_eq!(adapter.get_height().await.unwrap(), 123_456);
    }

    #[tokio::test]
    async fn test_cryptonight_async_matches_sync() {
        let (_, adapter) = adapter(MockRpc::default());
        let blob = b"This is a test".to_vec();

        let expected = adapter.cryptonight(&blob);
        assert_eq!(adapter.cryptonight_async(blob).await.unwrap(), expected);
    }

    #[test]
    fn test_blob_helpers() {
        let (_, adapter) = adapter(MockRpc::default());
        let (blob, _) = template_blob();

        let stamped = adapter.construct_new_blob(&blob, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&stamped[39..43], &[1, 2, 3, 4]);

        let id = adapter.get_block_id(&stamped).unwrap();
        assert_eq!(id.len(), 64);
        assert_ne!(id, adapter.get_block_id(&blob).unwrap());
    }

    #[test]
    fn test_constants_and_addresses() {
        let (_, adapter) = adapter(MockRpc::default());

        assert_eq!(format!("{:x}", adapter.base_diff()), "f".repeat(64));
        assert_eq!(adapter.nice_hash_diff(), 400_000);
        assert!(!adapter.supports_auto_exchange());
        assert_eq!(adapter.best_exchange(), "xmrto");
        assert_eq!(adapter.instance_id(), INSTANCE);

        assert!(adapter.validate_address(DEV_ADDRESS));
        assert!(!adapter.is_integrated_address(DEV_ADDRESS));
        assert!(adapter.is_blocked_address(DEV_ADDRESS));
        assert!(!adapter.requires_payment_id(DEV_ADDRESS));
        assert!(!adapter.validate_address("not an address"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AdapterConfig {
            reserve_size: 8,
            ..AdapterConfig::default()
        };
        let result = CoinAdapter::with_engine(MockRpc::default(), config, FastHash);
        assert!(matches!(result, Err(AdapterError::Config(ConfigError::ReserveTooSmall(8)))));
    }

    #[test]
    fn test_random_instance_id() {
        let adapter = CoinAdapter::new(MockRpc::default(), AdapterConfig::default()).unwrap();
        let id = adapter.instance_id();
        assert_eq!(adapter.instance_id(), id);
        assert_eq!(format!("{id}").len(), 8);
    }
}
