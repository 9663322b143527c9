// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, Key, KeyInfo};
use crate::shim::address::Address;
use crate::shim::crypto::{SECP_SIG_LEN, Signature, SignatureType};
use crate::utils::encoding::blake2b_256;
use bls_signatures::{PrivateKey as BlsPrivate, Serialize as _};
use k256::ecdsa::SigningKey as SecpPrivate;
use rand::{CryptoRng, RngCore};

/// Return the public key for a given `private_key` and `SignatureType`
pub fn to_public(sig_type: SignatureType, private_key: &[u8]) -> Result<Vec<u8>, Error> {
    match sig_type {
        SignatureType::Bls => Ok(BlsPrivate::from_bytes(private_key)
            .map_err(|err| Error::Other(err.to_string()))?
            .public_key()
            .as_bytes()),
        SignatureType::Secp256k1 => {
            let private_key =
                SecpPrivate::from_slice(private_key).map_err(|err| Error::Other(err.to_string()))?;
            Ok(private_key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec())
        }
    }
}

/// Return a new Address that is of a given `SignatureType` and uses the
/// supplied `public_key`
pub fn new_address(sig_type: SignatureType, public_key: &[u8]) -> Result<Address, Error> {
    let addr = match sig_type {
        SignatureType::Bls => Address::new_bls(public_key),
        SignatureType::Secp256k1 => Address::new_secp256k1(public_key),
    };
    addr.map_err(|err| Error::Other(err.to_string()))
}

/// Sign takes in `SignatureType`, private key and message. Returns a Signature
/// for that message
pub fn sign(sig_type: SignatureType, private_key: &[u8], msg: &[u8]) -> Result<Signature, Error> {
    match sig_type {
        SignatureType::Bls => {
            let priv_key =
                BlsPrivate::from_bytes(private_key).map_err(|err| Error::Other(err.to_string()))?;
            // this returns a signature from bls-signatures, so we need to convert this to a crypto signature
            let sig = priv_key.sign(msg);
            Ok(Signature::new_bls(sig.as_bytes()))
        }
        SignatureType::Secp256k1 => {
            let priv_key =
                SecpPrivate::from_slice(private_key).map_err(|err| Error::Other(err.to_string()))?;
            let msg_hash = blake2b_256(msg);
            let (sig, recovery_id) = priv_key
                .sign_prehash_recoverable(&msg_hash)
                .map_err(|err| Error::Other(err.to_string()))?;
            let mut new_bytes = [0; SECP_SIG_LEN];
            new_bytes[..64].copy_from_slice(&sig.to_bytes());
            new_bytes[64] = recovery_id.to_byte();
            Ok(Signature::new_secp256k1(new_bytes.to_vec()))
        }
    }
}

/// Generate a new private key
pub fn generate(sig_type: SignatureType, rng: &mut (impl RngCore + CryptoRng)) -> Vec<u8> {
    match sig_type {
        SignatureType::Bls => BlsPrivate::generate(rng).as_bytes(),
        SignatureType::Secp256k1 => SecpPrivate::random(rng).to_bytes().to_vec(),
    }
}

/// Generates a key pair and derives its address.
pub fn generate_key(
    sig_type: SignatureType,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Key, Error> {
    let private_key = generate(sig_type, rng);
    Key::try_from(KeyInfo::new(sig_type, private_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::rng;

    #[test]
    fn generated_keys_are_deterministic_per_seed() {
        for sig_type in [SignatureType::Bls, SignatureType::Secp256k1] {
            let a = generate_key(sig_type, &mut rng(7)).unwrap();
            let b = generate_key(sig_type, &mut rng(7)).unwrap();
            let c = generate_key(sig_type, &mut rng(8)).unwrap();
            assert_eq!(a.address, b.address);
            assert_ne!(a.address, c.address);
        }
    }

    #[test]
    fn public_key_lengths() {
        let bls = generate(SignatureType::Bls, &mut rng(1));
        assert_eq!(to_public(SignatureType::Bls, &bls).unwrap().len(), 48);
        let secp = generate(SignatureType::Secp256k1, &mut rng(1));
        assert_eq!(to_public(SignatureType::Secp256k1, &secp).unwrap().len(), 65);
    }

    #[test]
    fn garbage_private_key_is_rejected() {
        assert!(sign(SignatureType::Secp256k1, &[0; 3], b"data").is_err());
        assert!(to_public(SignatureType::Bls, &[1; 5]).is_err());
    }
}
