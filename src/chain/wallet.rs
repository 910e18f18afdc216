//! secp256k1 accounts and EIP-1559 transaction signing.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::chain::TransferTx;
use crate::chain::rlp;
use crate::error::ChainError;

/// EIP-2718 type byte for dynamic-fee transactions.
const EIP1559_TX_TYPE: u8 = 0x02;

/// An externally owned account: checksummed address plus signing key.
#[derive(Clone)]
pub struct Account {
    address: String,
    signing_key: SigningKey,
}

impl Account {
    /// Generate a fresh random account from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Import an account from a hex private key (with or without `0x`).
    pub fn from_private_key_hex(key: &str) -> Result<Self, ChainError> {
        let raw = hex::decode(key.trim_start_matches("0x"))
            .map_err(|e| ChainError::Signing(format!("invalid private key hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&raw)
            .map_err(|e| ChainError::Signing(format!("invalid private key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let encoded = signing_key.verifying_key().to_encoded_point(false);
        // Skip the 0x04 SEC1 tag.
        let hash = Keccak256::digest(&encoded.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Self {
            address: to_checksum_address(&address),
            signing_key,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Parse a `0x`-prefixed 20-byte hex address. Checksum case is not enforced.
pub fn parse_address(address: &str) -> Result<[u8; 20], ChainError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| ChainError::InvalidAddress(address.to_string()))?;
    if hex_part.len() != 40 {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }
    let mut out = [0u8; 20];
    hex::decode_to_slice(hex_part, &mut out)
        .map_err(|_| ChainError::InvalidAddress(address.to_string()))?;
    Ok(out)
}

/// EIP-55 mixed-case checksum encoding.
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    /// `0x`-prefixed keccak256 of `raw`.
    pub tx_hash: String,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

/// RLP payload fields shared by the signing preimage and the signed envelope.
fn encode_fields(tx: &TransferTx, to: &[u8; 20], out: &mut Vec<u8>) {
    rlp::encode_uint(out, u128::from(tx.chain_id));
    rlp::encode_uint(out, u128::from(tx.nonce));
    rlp::encode_uint(out, tx.max_priority_fee_per_gas);
    rlp::encode_uint(out, tx.max_fee_per_gas);
    rlp::encode_uint(out, u128::from(tx.gas));
    rlp::encode_bytes(out, to);
    rlp::encode_uint(out, tx.value_wei);
    // data
    rlp::encode_bytes(out, &[]);
    // access list
    rlp::encode_list(out, &[]);
}

/// keccak256(0x02 || rlp([chain_id, nonce, ..., access_list])).
pub(crate) fn signing_hash(tx: &TransferTx) -> Result<Keccak256, ChainError> {
    let to = parse_address(&tx.to)?;
    let mut fields = Vec::new();
    encode_fields(tx, &to, &mut fields);

    let mut hasher = Keccak256::new();
    hasher.update([EIP1559_TX_TYPE]);
    let mut list = Vec::new();
    rlp::encode_list(&mut list, &fields);
    hasher.update(&list);
    Ok(hasher)
}

/// Sign a transfer as an EIP-1559 (type 2) transaction.
pub fn sign_transfer(tx: &TransferTx, account: &Account) -> Result<SignedTransaction, ChainError> {
    if !tx.from.eq_ignore_ascii_case(account.address()) {
        return Err(ChainError::Signing(format!(
            "transaction sender {} does not match account {}",
            tx.from,
            account.address()
        )));
    }

    let digest = signing_hash(tx)?;
    let (signature, recovery_id) = account
        .signing_key
        .sign_digest_recoverable(digest)
        .map_err(|e| ChainError::Signing(e.to_string()))?;

    let to = parse_address(&tx.to)?;
    let mut fields = Vec::new();
    encode_fields(tx, &to, &mut fields);
    rlp::encode_uint(&mut fields, u128::from(recovery_id.is_y_odd()));
    let (r, s) = signature.split_bytes();
    rlp::encode_bytes(&mut fields, strip_leading_zeros(&r));
    rlp::encode_bytes(&mut fields, strip_leading_zeros(&s));

    let mut raw = vec![EIP1559_TX_TYPE];
    rlp::encode_list(&mut raw, &fields);

    let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw)));
    Ok(SignedTransaction { raw, tx_hash })
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
    use pretty_assertions::assert_eq;

    use super::*;

    // Well-known test key; never fund it.
    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn transfer(from: &str) -> TransferTx {
        TransferTx {
            from: from.to_string(),
            to: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
            value_wei: 1_500_000_000_000_000_000,
            nonce: 7,
            chain_id: 114,
            gas: 21_000,
            max_fee_per_gas: 25_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        }
    }

    #[test]
    fn eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let bytes = parse_address(&expected.to_lowercase()).unwrap();
            assert_eq!(to_checksum_address(&bytes), expected);
        }
    }

    #[test]
    fn known_key_derives_known_address() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        assert_eq!(account.address(), TEST_ADDRESS);
    }

    #[test]
    fn generated_accounts_are_distinct_and_checksummed() {
        let a = Account::generate();
        let b = Account::generate();
        assert_ne!(a.address(), b.address());
        let bytes = parse_address(a.address()).unwrap();
        assert_eq!(to_checksum_address(&bytes), a.address());
    }

    #[test]
    fn debug_redacts_key() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        let debug = format!("{account:?}");
        assert!(debug.contains(TEST_ADDRESS));
        assert!(!debug.contains("4c0883a6"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "0x", "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", "0x1234", "0xZZZeb6053F3E94C9b9A09f33669435E7Ef1BeAed"] {
            assert!(matches!(parse_address(bad), Err(ChainError::InvalidAddress(_))), "{bad}");
        }
    }

    #[test]
    fn signature_recovers_to_sender() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        let tx = transfer(account.address());
        let signed = sign_transfer(&tx, &account).unwrap();

        assert_eq!(signed.raw[0], EIP1559_TX_TYPE);
        assert_eq!(
            signed.tx_hash,
            format!("0x{}", hex::encode(Keccak256::digest(&signed.raw)))
        );

        // RFC 6979 signing is deterministic; re-sign to get r, s and v.
        let (signature, recovery_id): (Signature, RecoveryId) = account
            .signing_key
            .sign_digest_recoverable(signing_hash(&tx).unwrap())
            .unwrap();
        let recovered =
            VerifyingKey::recover_from_digest(signing_hash(&tx).unwrap(), &signature, recovery_id)
                .unwrap();
        assert_eq!(&recovered, account.signing_key.verifying_key());

        let (r, s) = signature.split_bytes();
        assert!(signed.raw.ends_with(strip_leading_zeros(&s)));
        assert!(
            signed
                .raw
                .windows(strip_leading_zeros(&r).len())
                .any(|w| w == strip_leading_zeros(&r))
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        let tx = transfer(account.address());
        assert_eq!(
            sign_transfer(&tx, &account).unwrap(),
            sign_transfer(&tx, &account).unwrap()
        );
    }

    #[test]
    fn refuses_to_sign_for_another_sender() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        let tx = transfer("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
        assert!(matches!(
            sign_transfer(&tx, &account),
            Err(ChainError::Signing(_))
        ));
    }
}
