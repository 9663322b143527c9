// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, new_address, sign, to_public};
use crate::shim::address::Address;
use crate::shim::crypto::{Signature, SignatureType};
use ahash::HashMap;

/// Private key material together with the signature scheme it is used with.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyInfo {
    key_type: SignatureType,
    private_key: Vec<u8>,
}

impl KeyInfo {
    pub fn new(key_type: SignatureType, private_key: Vec<u8>) -> Self {
        KeyInfo {
            key_type,
            private_key,
        }
    }

    pub fn key_type(&self) -> SignatureType {
        self.key_type
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

/// A key pair and the address derived from it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Key {
    pub key_info: KeyInfo,
    pub public_key: Vec<u8>,
    pub address: Address,
}

impl TryFrom<KeyInfo> for Key {
    type Error = Error;

    fn try_from(key_info: KeyInfo) -> Result<Self, Self::Error> {
        let public_key = to_public(key_info.key_type, &key_info.private_key)?;
        let address = new_address(key_info.key_type, &public_key)?;
        Ok(Key {
            key_info,
            public_key,
            address,
        })
    }
}

impl Key {
    pub fn private_key(&self) -> &[u8] {
        self.key_info.private_key()
    }
}

/// Signs arbitrary bytes on behalf of an address it holds the key for.
pub trait Signer {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> anyhow::Result<Signature>;
}

/// In-memory key store, keyed by address.
#[derive(Default, Debug, Clone)]
pub struct MemKeyStore {
    keys: HashMap<Address, KeyInfo>,
}

impl MemKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Address> {
        let mut addrs: Vec<_> = self.keys.keys().copied().collect();
        addrs.sort_by_key(|a| a.to_bytes());
        addrs
    }

    pub fn get(&self, addr: &Address) -> Result<&KeyInfo, Error> {
        self.keys.get(addr).ok_or(Error::KeyInfo)
    }

    pub fn put(&mut self, key: Key) -> Result<(), Error> {
        if self.keys.contains_key(&key.address) {
            return Err(Error::KeyExists);
        }
        self.keys.insert(key.address, key.key_info);
        Ok(())
    }

    pub fn remove(&mut self, addr: &Address) -> Result<KeyInfo, Error> {
        self.keys.remove(addr).ok_or(Error::NoKey)
    }
}

impl Signer for MemKeyStore {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> anyhow::Result<Signature> {
        let info = self.get(address)?;
        Ok(sign(info.key_type(), info.private_key(), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_management::generate_key;
    use crate::test_utils::rng;

    #[test]
    fn put_get_remove() {
        let mut ks = MemKeyStore::new();
        let key = generate_key(SignatureType::Secp256k1, &mut rng(4)).unwrap();
        ks.put(key.clone()).unwrap();
        assert!(matches!(ks.put(key.clone()), Err(Error::KeyExists)));
        assert_eq!(ks.get(&key.address).unwrap(), &key.key_info);
        assert_eq!(ks.list(), vec![key.address]);
        ks.remove(&key.address).unwrap();
        assert!(matches!(ks.get(&key.address), Err(Error::KeyInfo)));
        assert!(matches!(ks.remove(&key.address), Err(Error::NoKey)));
    }

    #[test]
    fn signer_produces_verifiable_signatures() {
        let mut ks = MemKeyStore::new();
        let key = generate_key(SignatureType::Bls, &mut rng(5)).unwrap();
        ks.put(key.clone()).unwrap();
        let sig = ks.sign_bytes(b"payload", &key.address).unwrap();
        sig.verify(b"payload", &key.address).unwrap();

        let stranger = generate_key(SignatureType::Bls, &mut rng(6)).unwrap();
        assert!(ks.sign_bytes(b"payload", &stranger.address).is_err());
    }
}
