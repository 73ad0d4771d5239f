// src/blockchain/portal_client.rs
//! ethers client for a deployed `StravaPortal`.
//!
//! Provides a typed interface over the portal ABI:
//! - the payable `attest` entry point
//! - configuration views (`fee`, `signerAddress`, `schemaId`, `owner`)
//! - owner-only writes (`setFee`, `setSignerAddress`, `setSchemaId`, `withdraw`)

use crate::blockchain::deployments::SupportedChain;
use crate::blockchain::transaction_tracker::SubmittedTransaction;
use crate::models::attestation::AttestationPayload;
use crate::utils::crypto::hash_data;
use crate::wallet::wallet_error::WalletError;
use ethers::providers::{Middleware, MiddlewareError};
use ethers_contract::{BaseContract, Contract, ContractCall, ContractError};
use ethers_core::{
    abi::{Abi, Detokenize, Token, Tokenize},
    types::{Address, BlockNumber, Bytes, H256, U256},
};
use std::sync::Arc;
use thiserror::Error;

const PORTAL_ABI: &[u8] = include_bytes!("../contracts/abi/StravaPortal.json");

/// Custom errors declared by the portal, used to name revert data.
const PORTAL_ERRORS: &[&str] = &[
    "InsufficientFee()",
    "SchemaMismatch()",
    "InvalidSignature()",
    "Unauthorized()",
];

#[derive(Debug, Error)]
pub enum PortalClientError {
    #[error("failed to load portal ABI: {0}")]
    Abi(#[from] serde_json::Error),
    #[error("portal method error: {0}")]
    Method(#[from] ethers_contract::AbiError),
    /// The call reached the contract and reverted.
    #[error("portal reverted: {0}")]
    Reverted(String),
    /// The wallet or RPC refused the call before it executed.
    #[error("{0}")]
    Wallet(WalletError),
    #[error("no sender address for the transaction")]
    NoSender,
}

impl PortalClientError {
    /// True when the user cancelled in their wallet; not a failure to report.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, PortalClientError::Wallet(wallet) if wallet.is_user_rejection())
    }
}

/// Client bound to one portal deployment.
pub struct PortalClient<M> {
    contract: Contract<M>,
    chain: SupportedChain,
}

impl<M: Middleware + 'static> PortalClient<M> {
    /// Client for the compiled-in portal of `chain`.
    ///
    /// # Errors
    /// Returns `Err` if the embedded ABI cannot be parsed.
    pub fn new(client: Arc<M>, chain: SupportedChain) -> Result<Self, PortalClientError> {
        Self::at(client, chain.portal_address(), chain)
    }

    /// Client for a portal at an explicit address (e.g. a fresh deployment).
    pub fn at(client: Arc<M>, address: Address, chain: SupportedChain) -> Result<Self, PortalClientError> {
        let abi: Abi = serde_json::from_slice(PORTAL_ABI)?;
        let contract = Contract::new(address, BaseContract::from(abi), client);
        Ok(Self { contract, chain })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn chain(&self) -> SupportedChain {
        self.chain
    }

    pub fn client(&self) -> Arc<M> {
        self.contract.client()
    }

    /// Submits `attest(payload, [signature])` paying `fee`.
    ///
    /// # Returns
    /// The submitted transaction. Submission is not success: see
    /// [`track_transaction`](crate::blockchain::transaction_tracker::track_transaction).
    pub async fn attest(
        &self,
        payload: &AttestationPayload,
        signature: &Bytes,
        fee: U256,
    ) -> Result<SubmittedTransaction, PortalClientError> {
        let call = self.attest_call(payload, signature, fee)?;
        self.submit(call).await
    }

    /// The unsent `attest` call, with calldata and value filled in.
    pub fn attest_call(
        &self,
        payload: &AttestationPayload,
        signature: &Bytes,
        fee: U256,
    ) -> Result<ContractCall<M, ()>, PortalClientError> {
        let validation_payloads = Token::Array(vec![Token::Bytes(signature.to_vec())]);
        Ok(self
            .contract
            .method::<_, ()>("attest", (payload.to_token(), validation_payloads))?
            .value(fee))
    }

    pub async fn fee(&self) -> Result<U256, PortalClientError> {
        self.query("fee", ()).await
    }

    pub async fn signer_address(&self) -> Result<Address, PortalClientError> {
        self.query("signerAddress", ()).await
    }

    pub async fn schema_id(&self) -> Result<H256, PortalClientError> {
        self.query("schemaId", ()).await
    }

    pub async fn owner(&self) -> Result<Address, PortalClientError> {
        self.query("owner", ()).await
    }

    pub async fn set_fee(&self, fee: U256) -> Result<H256, PortalClientError> {
        self.transact("setFee", fee).await
    }

    pub async fn set_signer_address(&self, signer_address: Address) -> Result<H256, PortalClientError> {
        self.transact("setSignerAddress", signer_address).await
    }

    pub async fn set_schema_id(&self, schema_id: H256) -> Result<H256, PortalClientError> {
        self.transact("setSchemaId", schema_id).await
    }

    pub async fn withdraw(&self) -> Result<H256, PortalClientError> {
        self.transact("withdraw", ()).await
    }

    async fn query<R: Detokenize>(&self, method: &str, params: impl Tokenize) -> Result<R, PortalClientError> {
        self.contract
            .method::<_, R>(method, params)?
            .call()
            .await
            .map_err(classify_contract_error)
    }

    async fn transact(&self, method: &str, params: impl Tokenize) -> Result<H256, PortalClientError> {
        let call = self.contract.method::<_, ()>(method, params)?;
        Ok(self.submit(call).await?.hash)
    }

    /// Sends `call`, pinning its sender and nonce first so the transaction
    /// can be tracked through replacement.
    async fn submit(&self, mut call: ContractCall<M, ()>) -> Result<SubmittedTransaction, PortalClientError> {
        let client = self.client();
        let sender = call
            .tx
            .from()
            .copied()
            .or_else(|| client.default_sender())
            .ok_or(PortalClientError::NoSender)?;
        call.tx.set_from(sender);

        let nonce = match call.tx.nonce() {
            Some(nonce) => *nonce,
            None => {
                let nonce = client
                    .get_transaction_count(sender, Some(BlockNumber::Pending.into()))
                    .await
                    .map_err(|e| classify_contract_error(ContractError::<M>::from_middleware_error(e)))?;
                call.tx.set_nonce(nonce);
                nonce
            }
        };

        let pending = call.send().await.map_err(classify_contract_error)?;
        Ok(SubmittedTransaction {
            hash: pending.tx_hash(),
            sender,
            nonce,
        })
    }
}

fn classify_contract_error<M: Middleware>(error: ContractError<M>) -> PortalClientError {
    if let Some(data) = error.as_revert() {
        return PortalClientError::Reverted(revert_reason(data));
    }
    let wallet = match &error {
        ContractError::MiddlewareError { e } => {
            MiddlewareError::as_error_response(e).map(WalletError::from_json_rpc)
        }
        ContractError::ProviderError { e } => Some(WalletError::from_rpc(e)),
        _ => None,
    };
    PortalClientError::Wallet(wallet.unwrap_or_else(|| WalletError::from_message(&error.to_string())))
}

/// Names a portal custom error from its 4-byte selector, or hex-dumps the data.
pub fn revert_reason(data: &[u8]) -> String {
    if data.len() >= 4 {
        for signature in PORTAL_ERRORS {
            if hash_data(signature.as_bytes())[..4] == data[..4] {
                return signature.trim_end_matches("()").to_string();
            }
        }
    }
    format!("0x{}", ethers_core::utils::hex::encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::deployments::{attestation_fee, SCHEMA_ID};
    use ethers::abi::encode;
    use ethers::providers::{Http, JsonRpcError, MockError, MockProvider, Provider, ProviderError};

    fn mocked_client() -> (PortalClient<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        let client = PortalClient::new(Arc::new(provider), SupportedChain::LineaSepolia).unwrap();
        (client, mock)
    }

    fn sample_payload() -> AttestationPayload {
        AttestationPayload {
            schema_id: SCHEMA_ID,
            expiration_date: 0,
            subject: Bytes::from(vec![0x11; 20]),
            attestation_data: Bytes::from(vec![0x22; 64]),
        }
    }

    fn rejected_by_user() -> ProviderError {
        ProviderError::from(MockError::JsonRpcError(JsonRpcError {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        }))
    }

    #[test]
    fn embedded_abi_declares_every_portal_function() {
        let abi: Abi = serde_json::from_slice(PORTAL_ABI).unwrap();
        for name in [
            "attest",
            "fee",
            "signerAddress",
            "schemaId",
            "owner",
            "setFee",
            "setSignerAddress",
            "setSchemaId",
            "withdraw",
        ] {
            assert!(abi.function(name).is_ok(), "missing {name}");
        }
        let attest = abi.function("attest").unwrap();
        assert_eq!(
            attest.signature(),
            "attest((bytes32,uint64,bytes,bytes),bytes[])"
        );
    }

    #[test]
    fn custom_errors_are_named_from_revert_data() {
        let selector = hash_data(b"InvalidSignature()")[..4].to_vec();
        assert_eq!(revert_reason(&selector), "InvalidSignature");
        assert_eq!(revert_reason(&[0xde, 0xad]), "0xdead");
    }

    #[test]
    fn client_targets_the_compiled_in_portal() {
        let provider = Provider::<Http>::try_from("http://127.0.0.1:8545").unwrap();
        let client = PortalClient::new(Arc::new(provider), SupportedChain::LineaSepolia).unwrap();
        assert_eq!(client.address(), SupportedChain::LineaSepolia.portal_address());
        assert_eq!(client.chain(), SupportedChain::LineaSepolia);
    }

    #[test]
    fn fee_view_decodes_the_call_result() {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        mock.push::<Bytes, _>(Bytes::from(encode(&[Token::Uint(U256::from(100_000_000_000_000u64))])))
            .unwrap();
        let client = PortalClient::new(Arc::new(provider), SupportedChain::LineaMainnet).unwrap();

        let fee = tokio_test::block_on(client.fee()).unwrap();
        assert_eq!(fee, crate::blockchain::deployments::attestation_fee());
    }

    #[test]
    fn attest_call_encodes_the_portal_function_and_pays_the_fee() {
        let (client, _mock) = mocked_client();
        let call = client
            .attest_call(&sample_payload(), &Bytes::from(vec![0x33; 65]), attestation_fee())
            .unwrap();

        let data = call.tx.data().unwrap();
        assert_eq!(data[..4], hash_data(b"attest((bytes32,uint64,bytes,bytes),bytes[])")[..4]);
        assert_eq!(call.tx.value(), Some(&attestation_fee()));
        assert_eq!(call.tx.to_addr(), Some(&SupportedChain::LineaSepolia.portal_address()));
    }

    #[test]
    fn submit_pins_the_pending_nonce_before_sending() {
        let (client, mock) = mocked_client();
        let sender = Address::repeat_byte(0x44);
        let hash = H256::repeat_byte(0x55);
        mock.push::<H256, _>(hash).unwrap();
        mock.push::<U256, _>(U256::from(7)).unwrap();

        let mut call = client
            .attest_call(&sample_payload(), &Bytes::from(vec![0x33; 65]), attestation_fee())
            .unwrap();
        call.tx.set_from(sender);
        call.tx.set_gas(U256::from(300_000));
        call.tx.set_gas_price(U256::from(1_000_000_000u64));
        let mut expected = call.tx.clone();
        expected.set_nonce(U256::from(7));

        let submitted = tokio_test::block_on(client.submit(call)).unwrap();
        assert_eq!(
            submitted,
            SubmittedTransaction {
                hash,
                sender,
                nonce: U256::from(7),
            }
        );
        mock.assert_request("eth_getTransactionCount", [serde_json::json!(sender), serde_json::json!("pending")])
            .unwrap();
        mock.assert_request("eth_sendTransaction", [expected]).unwrap();
    }

    #[test]
    fn submit_without_any_sender_fails_before_the_rpc() {
        let (client, mock) = mocked_client();
        let call = client
            .attest_call(&sample_payload(), &Bytes::from(vec![0x33; 65]), attestation_fee())
            .unwrap();

        let err = tokio_test::block_on(client.submit(call)).unwrap_err();
        assert!(matches!(err, PortalClientError::NoSender));
        assert!(mock.assert_request("eth_getTransactionCount", ()).is_err());
    }

    #[test]
    fn wallet_rejection_from_a_middleware_error_is_a_user_rejection() {
        let error = ContractError::<Provider<MockProvider>>::MiddlewareError {
            e: rejected_by_user(),
        };
        let classified = classify_contract_error(error);
        assert!(classified.is_user_rejection(), "{classified:?}");
    }

    #[test]
    fn wallet_rejection_from_a_provider_error_is_a_user_rejection() {
        let error = ContractError::<Provider<MockProvider>>::ProviderError {
            e: rejected_by_user(),
        };
        assert!(classify_contract_error(error).is_user_rejection());
    }

    #[test]
    fn rejected_nonce_lookup_surfaces_as_a_user_rejection() {
        let (provider, mock) = Provider::<MockProvider>::mocked();
        let provider = provider.with_sender(Address::repeat_byte(0x44));
        let client = PortalClient::new(Arc::new(provider), SupportedChain::LineaSepolia).unwrap();
        mock.push_response(ethers::providers::MockResponse::Error(JsonRpcError {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        }));

        let err = tokio_test::block_on(client.attest(
            &sample_payload(),
            &Bytes::from(vec![0x33; 65]),
            attestation_fee(),
        ))
        .unwrap_err();
        assert!(err.is_user_rejection(), "{err:?}");
    }
}
