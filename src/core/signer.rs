//! Transient signer built from a reconstructed key.

use std::fmt;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Signature, H256};
use ethers::utils::to_checksum;

use crate::core::errors::CustodyError;
use crate::core::keys::parse_address;
use crate::security::secret::PrivateKeyBytes;

/// What to sign once the key is available.
#[derive(Debug, Clone)]
pub enum SigningRequest {
    /// EIP-191 personal message.
    Message(Vec<u8>),
    /// Legacy, EIP-2930 or EIP-1559 transaction. A missing chain id is
    /// filled from configuration.
    Transaction(TypedTransaction),
}

impl SigningRequest {
    pub fn message(msg: impl AsRef<[u8]>) -> Self {
        SigningRequest::Message(msg.as_ref().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedPayload {
    Message { signature: Signature },
    Transaction { signature: Signature, raw: Bytes, hash: H256 },
}

impl SignedPayload {
    pub fn signature(&self) -> &Signature {
        match self {
            SignedPayload::Message { signature } => signature,
            SignedPayload::Transaction { signature, .. } => signature,
        }
    }

    /// 0x-prefixed 65-byte `r || s || v`.
    pub fn signature_hex(&self) -> String {
        format!("0x{}", self.signature())
    }

    /// RLP-encoded signed transaction, ready for broadcast.
    pub fn raw_transaction(&self) -> Option<&Bytes> {
        match self {
            SignedPayload::Transaction { raw, .. } => Some(raw),
            SignedPayload::Message { .. } => None,
        }
    }
}

/// Wraps a `LocalWallet` for the duration of one signing call. The
/// underlying secp256k1 key is zeroized when this is dropped.
pub(crate) struct TransientSigner {
    wallet: LocalWallet,
}

impl TransientSigner {
    pub(crate) fn from_private_key(key: &PrivateKeyBytes, chain_id: u64) -> Result<Self, CustodyError> {
        let wallet = LocalWallet::from_bytes(key.as_slice())
            .map_err(|_| CustodyError::Signing("reconstructed key is not a valid secp256k1 scalar".to_string()))?
            .with_chain_id(chain_id);
        Ok(Self { wallet })
    }

    pub(crate) fn address(&self) -> Address {
        self.wallet.address()
    }

    pub(crate) async fn sign(&self, request: &SigningRequest) -> Result<SignedPayload, CustodyError> {
        match request {
            SigningRequest::Message(msg) => {
                let signature = self
                    .wallet
                    .sign_message(msg.as_slice())
                    .await
                    .map_err(|e| CustodyError::Signing(e.to_string()))?;
                Ok(SignedPayload::Message { signature })
            }
            SigningRequest::Transaction(tx) => {
                let mut tx = tx.clone();
                if tx.chain_id().is_none() {
                    tx.set_chain_id(self.wallet.chain_id());
                }
                let signature = self
                    .wallet
                    .sign_transaction(&tx)
                    .await
                    .map_err(|e| CustodyError::Signing(e.to_string()))?;
                Ok(SignedPayload::Transaction {
                    raw: tx.rlp_signed(&signature),
                    hash: tx.hash(&signature),
                    signature,
                })
            }
        }
    }
}

impl fmt::Debug for TransientSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientSigner")
            .field("address", &to_checksum(&self.address(), None))
            .finish_non_exhaustive()
    }
}

/// Check an EIP-191 signature over `message` against `address`.
pub fn verify_message(message: &[u8], signature: &Signature, address: &str) -> Result<bool, CustodyError> {
    let expected = parse_address(address)?;
    Ok(signature.verify(message, expected).is_ok())
}

/// Address that produced `signature` over `message`.
pub fn recover_signer(message: &[u8], signature: &Signature) -> Result<String, CustodyError> {
    let address = signature
        .recover(message)
        .map_err(|e| CustodyError::Signing(format!("cannot recover signer: {}", e)))?;
    Ok(to_checksum(&address, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Eip1559TransactionRequest, TransactionRequest, U256};
    use zeroize::Zeroizing;

    const KEY_HEX: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn key() -> PrivateKeyBytes {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&hex::decode(KEY_HEX).unwrap());
        out
    }

    #[tokio::test]
    async fn test_sign_and_verify_message() {
        let signer = TransientSigner::from_private_key(&key(), 1).unwrap();
        let signed = signer.sign(&SigningRequest::message("hello")).await.unwrap();
        assert!(verify_message(b"hello", signed.signature(), ADDRESS).unwrap());
        assert!(!verify_message(b"hello!", signed.signature(), ADDRESS).unwrap());
        assert_eq!(recover_signer(b"hello", signed.signature()).unwrap(), ADDRESS);
        assert_eq!(signed.signature_hex().len(), 2 + 130);
        assert!(signed.raw_transaction().is_none());
    }

    #[tokio::test]
    async fn test_sign_legacy_transaction_uses_chain_id() {
        let signer = TransientSigner::from_private_key(&key(), 5).unwrap();
        let tx: TypedTransaction = TransactionRequest::new()
            .to(parse_address(ADDRESS).unwrap())
            .value(U256::from(1_000u64))
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .nonce(0u64)
            .into();
        let signed = signer.sign(&SigningRequest::Transaction(tx)).await.unwrap();
        // EIP-155: v = chain_id * 2 + 35 or 36
        assert!(signed.signature().v == 45 || signed.signature().v == 46);
        assert!(!signed.raw_transaction().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_eip1559_transaction_recovers_sender() {
        let signer = TransientSigner::from_private_key(&key(), 1).unwrap();
        let tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(parse_address(ADDRESS).unwrap())
            .value(U256::from(7u64))
            .gas(21_000u64)
            .max_fee_per_gas(2_000_000_000u64)
            .max_priority_fee_per_gas(1_000_000_000u64)
            .nonce(3u64)
            .chain_id(1u64)
            .into();
        let signed = signer.sign(&SigningRequest::Transaction(tx.clone())).await.unwrap();
        let recovered = signed.signature().recover(tx.sighash()).unwrap();
        assert_eq!(recovered, signer.address());
        match signed {
            SignedPayload::Transaction { raw, .. } => assert_eq!(raw.as_ref()[0], 0x02),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_invalid_key_rejected() {
        let zero = Zeroizing::new([0u8; 32]);
        assert!(matches!(TransientSigner::from_private_key(&zero, 1), Err(CustodyError::Signing(_))));
    }
}
