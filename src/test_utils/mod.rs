// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Fixtures shared by unit tests: seeded randomness, header and tipset
//! builders and a minimal genesis state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::actors::{
    ACCOUNT_ACTOR_CODE_ID, INIT_ACTOR_CODE_ID, SYSTEM_ACTOR_CODE_ID, account, init, system,
};
use crate::blocks::{CachingBlockHeader, RawBlockHeader, Ticket, Tipset, TipsetKey, VRFProof};
use crate::chain::persist_block_messages;
use crate::message::SignedMessage;
use crate::shim::{
    address::{
        Address, BURNT_FUNDS_ACTOR_ADDR, INIT_ACTOR_ADDR, REWARD_ACTOR_ADDR, SYSTEM_ACTOR_ADDR,
    },
    clock::ChainEpoch,
    econ::TokenAmount,
    externs::Rand,
    message::Message,
    randomness::{DomainSeparationTag, Randomness},
    state_tree::{ActorState, StateTree},
};
use crate::utils::cid::empty_object_cid;
use crate::utils::db::CborStoreExt as _;
use crate::utils::encoding::blake2b_256;
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use num::BigInt;
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

/// Network name recorded in the init actor of [`genesis_state`].
pub const TEST_NETWORK_NAME: &str = "testnet";

/// Deterministic RNG for key generation in tests.
pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A header with no parents, messages or state. Tests fill in what they need.
pub fn raw_header(miner: Address, epoch: ChainEpoch, ticket: &[u8]) -> RawBlockHeader {
    let empty = empty_object_cid().unwrap();
    RawBlockHeader {
        miner_address: miner,
        ticket: Some(Ticket::new(VRFProof::new(ticket.to_vec()))),
        election_proof: None,
        beacon_entries: vec![],
        winning_post_proof: vec![],
        parents: TipsetKey::default(),
        weight: BigInt::default(),
        epoch,
        state_root: empty,
        message_receipts: empty,
        messages: empty,
        bls_aggregate: None,
        timestamp: 0,
        signature: None,
        fork_signal: 0,
        parent_base_fee: TokenAmount::default(),
    }
}

pub fn genesis_tipset() -> Tipset {
    Tipset::from(CachingBlockHeader::new(raw_header(Address::new_id(0), 0, b"genesis")).unwrap())
}

/// A single-block child of `parent`. Every call yields a distinct block.
pub fn tipset_child(parent: &Tipset, epoch: ChainEpoch) -> Tipset {
    // Use a static counter to give all tipsets a unique ticket and timestamp
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut raw = raw_header(Address::new_id(1000), epoch, format!("ticket-{n}").as_bytes());
    raw.parents = parent.key().clone();
    raw.weight = parent.weight() + BigInt::from(1);
    raw.timestamp = n;
    Tipset::from(CachingBlockHeader::new(raw).unwrap())
}

/// Stores `bls` and `secp` messages and returns a block header on top of
/// `parent` that includes them.
pub fn header_with_messages(
    db: &impl Blockstore,
    parent: &Tipset,
    miner: Address,
    epoch: ChainEpoch,
    state_root: Cid,
    bls: &[Message],
    secp: &[SignedMessage],
) -> CachingBlockHeader {
    let mut raw = raw_header(
        miner,
        epoch,
        format!("{miner}-{epoch}-{}", parent.key()).as_bytes(),
    );
    raw.parents = parent.key().clone();
    raw.weight = parent.weight() + BigInt::from(1);
    raw.state_root = state_root;
    raw.messages = persist_block_messages(db, bls, secp).unwrap();
    raw.parent_base_fee = TokenAmount::from_atto(100);
    let header = CachingBlockHeader::new(raw).unwrap();
    header.persist(db).unwrap();
    header
}

/// Builds a state tree holding the system, init, reward and burnt-funds
/// actors plus one account per `funded` entry. Accounts get ID addresses from
/// 100 on, in order.
pub fn genesis_state<DB: Blockstore>(
    db: &Arc<DB>,
    funded: &[(Address, TokenAmount)],
) -> anyhow::Result<Cid> {
    let mut tree = StateTree::new(Arc::clone(db))?;
    let empty = db.put_cbor_default(&Vec::<()>::new())?;

    let system_head = db.put_cbor_default(&system::State::default())?;
    tree.set_actor(
        &SYSTEM_ACTOR_ADDR,
        ActorState::new(*SYSTEM_ACTOR_CODE_ID, system_head, TokenAmount::default(), 0),
    )?;

    let mut init_state = init::State::new(db.as_ref(), TEST_NETWORK_NAME.into())?;
    for (addr, balance) in funded {
        let id = init_state.map_address_to_new_id(db.as_ref(), addr)?;
        let head = db.put_cbor_default(&account::State { address: *addr })?;
        tree.set_actor(
            &id,
            ActorState::new(*ACCOUNT_ACTOR_CODE_ID, head, balance.clone(), 0),
        )?;
    }
    let init_head = db.put_cbor_default(&init_state)?;
    tree.set_actor(
        &INIT_ACTOR_ADDR,
        ActorState::new(*INIT_ACTOR_CODE_ID, init_head, TokenAmount::default(), 0),
    )?;

    tree.set_actor(
        &REWARD_ACTOR_ADDR,
        ActorState::new(
            *ACCOUNT_ACTOR_CODE_ID,
            empty,
            TokenAmount::from_whole(1_000_000),
            0,
        ),
    )?;
    tree.set_actor(
        &BURNT_FUNDS_ACTOR_ADDR,
        ActorState::new(*ACCOUNT_ACTOR_CODE_ID, empty, TokenAmount::default(), 0),
    )?;

    tree.flush()
}

/// Randomness derived only from its inputs.
#[derive(Default, Clone, Copy)]
pub struct MockRand;

impl MockRand {
    fn draw(tag: &[u8], pers: DomainSeparationTag, round: ChainEpoch, entropy: &[u8]) -> Randomness {
        let mut data = tag.to_vec();
        data.extend_from_slice(&pers.as_i64().to_be_bytes());
        data.extend_from_slice(&round.to_be_bytes());
        data.extend_from_slice(entropy);
        blake2b_256(&data)
    }
}

impl Rand for MockRand {
    fn get_chain_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        Ok(Self::draw(b"chain", pers, round, entropy))
    }

    fn get_beacon_randomness(
        &self,
        pers: DomainSeparationTag,
        round: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<Randomness> {
        Ok(Self::draw(b"beacon", pers, round, entropy))
    }
}
