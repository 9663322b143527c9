// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
use super::address::{Address, Payload};
use crate::utils::encoding::blake2b_256;
use anyhow::Context as _;
use bls_signatures::{PublicKey as BlsPublicKey, Serialize as _, Signature as BlsSignature};
use fvm_ipld_encoding::{
    de,
    repr::{Deserialize_repr, Serialize_repr},
    ser, strict_bytes,
};
use get_size2::GetSize;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;
use std::borrow::Cow;

/// BLS signature length in bytes.
pub const BLS_SIG_LEN: usize = 96;
/// BLS public key length in bytes.
pub const BLS_PUB_LEN: usize = 48;
/// `secp256k1` signature length in bytes (`r ‖ s ‖ v`).
pub const SECP_SIG_LEN: usize = 65;

/// A cryptographic signature, represented in bytes, of any key protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, GetSize, derive_more::Constructor)]
pub struct Signature {
    pub sig_type: SignatureType,
    pub bytes: Vec<u8>,
}

impl ser::Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        strict_bytes::Serialize::serialize(&self.to_bytes(), serializer)
    }
}

impl<'de> de::Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let bytes: Cow<'de, [u8]> = strict_bytes::Deserialize::deserialize(deserializer)?;
        match bytes.split_first() {
            None => Err(de::Error::custom("Cannot deserialize empty bytes")),
            Some((&sig_byte, rest)) => {
                let sig_type = SignatureType::try_from(sig_byte).map_err(de::Error::custom)?;
                Ok(Signature {
                    sig_type,
                    bytes: rest.to_vec(),
                })
            }
        }
    }
}

impl Signature {
    /// Creates a BLS Signature given the raw bytes.
    pub fn new_bls(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Bls,
            bytes,
        }
    }

    /// Creates a SECP Signature given the raw bytes.
    pub fn new_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Secp256k1,
            bytes,
        }
    }

    /// Returns the signature bytes including the signature type byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.bytes.len() + 1);
        bytes.push(self.sig_type as u8);
        bytes.extend_from_slice(&self.bytes);
        bytes
    }

    pub fn signature_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Returns reference to signature bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Checks if a signature is valid given data and address.
    pub fn verify(&self, data: &[u8], addr: &Address) -> anyhow::Result<()> {
        match self.sig_type {
            SignatureType::Bls => verify_bls_sig(&self.bytes, data, addr).map_err(anyhow::Error::msg),
            SignatureType::Secp256k1 => verify_secp256k1_sig(&self.bytes, data, addr),
        }
    }
}

impl TryFrom<&Signature> for BlsSignature {
    type Error = anyhow::Error;
    fn try_from(value: &Signature) -> Result<Self, Self::Error> {
        match value.sig_type {
            SignatureType::Secp256k1 => {
                anyhow::bail!("cannot convert Secp256k1 signature to bls signature")
            }
            SignatureType::Bls => Ok(BlsSignature::from_bytes(&value.bytes)?),
        }
    }
}

/// Returns `String` error if a BLS signature is invalid.
pub fn verify_bls_sig(signature: &[u8], data: &[u8], addr: &Address) -> Result<(), String> {
    let pub_k = match addr.payload() {
        Payload::BLS(pub_k) => pub_k.as_slice(),
        _ => return Err(format!("cannot validate a BLS signature against a {} address", addr.protocol())),
    };
    if pub_k.len() != BLS_PUB_LEN || signature.len() != BLS_SIG_LEN {
        return Err(format!(
            "invalid BLS signature or key length: signature {} bytes, key {} bytes",
            signature.len(),
            pub_k.len()
        ));
    }
    let pk = BlsPublicKey::from_bytes(pub_k).map_err(|e| e.to_string())?;
    let sig = BlsSignature::from_bytes(signature).map_err(|e| e.to_string())?;
    if bls_signatures::verify_messages(&sig, &[data], &[pk]) {
        Ok(())
    } else {
        Err(format!("bls signature verification failed for addr: {addr}"))
    }
}

/// Aggregates and verifies BLS signatures collectively.
pub fn verify_bls_aggregate(data: &[&[u8]], pub_keys: &[BlsPublicKey], sig: &Signature) -> bool {
    if data.len() != pub_keys.len() {
        return false;
    }
    if data.is_empty() {
        return true;
    }
    let bls_sig = match sig.try_into() {
        Ok(bls_sig) => bls_sig,
        _ => return false,
    };
    bls_signatures::verify_messages(&bls_sig, data, pub_keys)
}

/// Recovers the uncompressed public key that produced a `secp256k1` signature
/// over the given 32-byte hash.
pub fn recover_secp_public_key(hash: &[u8; 32], signature: &[u8]) -> anyhow::Result<Vec<u8>> {
    anyhow::ensure!(
        signature.len() == SECP_SIG_LEN,
        "invalid secp256k1 signature length. Was {}, must be {SECP_SIG_LEN}",
        signature.len()
    );
    let sig = EcdsaSignature::from_slice(&signature[..64])?;
    let rec_id = RecoveryId::from_byte(signature[64]).context("invalid recovery byte")?;
    let key = VerifyingKey::recover_from_prehash(hash, &sig, rec_id)?;
    Ok(k256::PublicKey::from(&key)
        .to_encoded_point(false)
        .as_bytes()
        .to_vec())
}

/// Verifies a `secp256k1` signature by recovering the signer and comparing
/// addresses.
pub fn verify_secp256k1_sig(signature: &[u8], data: &[u8], addr: &Address) -> anyhow::Result<()> {
    let hash = blake2b_256(data);
    let pub_key = recover_secp_public_key(&hash, signature)?;
    let rec_addr = Address::new_secp256k1(&pub_key)?;
    anyhow::ensure!(
        rec_addr == *addr,
        "Secp signature verification failed: recovered {rec_addr}, expected {addr}"
    );
    Ok(())
}

/// Signature variants for Filecoin signatures.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Copy,
    Eq,
    Serialize_repr,
    Deserialize_repr,
    Hash,
    strum::Display,
    strum::EnumString,
    GetSize,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum SignatureType {
    Secp256k1 = 1,
    Bls = 2,
}

impl TryFrom<u8> for SignatureType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SignatureType::Secp256k1),
            2 => Ok(SignatureType::Bls),
            invalid => anyhow::bail!("Invalid signature type byte: {}", invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_management::{generate_key, sign};
    use crate::test_utils::rng;

    #[test]
    fn bls_signature_verifies_against_its_address() {
        let key = generate_key(SignatureType::Bls, &mut rng(1)).unwrap();
        let msg = b"ticket base";
        let sig = sign(SignatureType::Bls, key.private_key(), msg).unwrap();
        assert_eq!(sig.bytes().len(), BLS_SIG_LEN);
        sig.verify(msg, &key.address).unwrap();
        assert!(sig.verify(b"other data", &key.address).is_err());
    }

    #[test]
    fn secp_signature_verifies_against_its_address() {
        let key = generate_key(SignatureType::Secp256k1, &mut rng(2)).unwrap();
        let msg = b"message cid bytes";
        let sig = sign(SignatureType::Secp256k1, key.private_key(), msg).unwrap();
        assert_eq!(sig.bytes().len(), SECP_SIG_LEN);
        sig.verify(msg, &key.address).unwrap();

        let other = generate_key(SignatureType::Secp256k1, &mut rng(3)).unwrap();
        assert!(sig.verify(msg, &other.address).is_err());
    }

    #[test]
    fn signature_cbor_carries_type_byte() {
        let sig = Signature::new_bls(vec![1, 2, 3]);
        let bytes = fvm_ipld_encoding::to_vec(&sig).unwrap();
        // 0x44: byte string of length 4
        assert_eq!(bytes, vec![0x44, 2, 1, 2, 3]);
        let decoded: Signature = fvm_ipld_encoding::from_slice(&bytes).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn empty_signature_bytes_are_rejected() {
        let bytes = fvm_ipld_encoding::to_vec(&fvm_ipld_encoding::RawBytes::new(vec![])).unwrap();
        assert!(fvm_ipld_encoding::from_slice::<Signature>(&bytes).is_err());
    }
}
