// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::*;
use crate::db::MemoryDB;
use crate::interpreter::DefaultSyscalls;
use crate::shim::address::{INIT_ACTOR_ADDR, SYSTEM_ACTOR_ADDR};
use crate::shim::error::SYS_INVALID_RECEIVER;
use crate::test_utils::{MockRand, genesis_state};
use crate::utils::cid::CidCborExt as _;

const BASE_FEE: u64 = 100;

struct Fixture {
    vm: VM<MemoryDB>,
    alice: Address,
    bob: Address,
}

fn fixture(alice_balance: TokenAmount) -> Fixture {
    let db = Arc::new(MemoryDB::default());
    let alice = Address::new_secp256k1(&[1; 65]).unwrap();
    let bob = Address::new_secp256k1(&[2; 65]).unwrap();
    let root = genesis_state(
        &db,
        &[(alice, alice_balance), (bob, TokenAmount::from_whole(1))],
    )
    .unwrap();
    let vm = VM::new(context(root), db).unwrap();
    Fixture { vm, alice, bob }
}

fn context(state_tree_root: Cid) -> ExecutionContext {
    ExecutionContext {
        state_tree_root,
        epoch: 1,
        rand: Box::new(MockRand),
        base_fee: TokenAmount::from_atto(BASE_FEE),
        circ_supply: CirculatingSupplyCalculator::default(),
        chain_config: Arc::new(ChainConfig::devnet()),
        syscalls: Box::new(DefaultSyscalls),
    }
}

fn transfer(from: Address, to: Address, sequence: u64, value: TokenAmount) -> ChainMessage {
    ChainMessage::Unsigned(Message {
        sequence,
        gas_limit: 1_000_000,
        gas_fee_cap: TokenAmount::from_atto(200),
        gas_premium: TokenAmount::from_atto(10),
        ..Message::transfer(from, to, value)
    })
}

impl Fixture {
    fn actor(&self, addr: &Address) -> ActorState {
        self.vm.get_actor(addr).unwrap().unwrap()
    }
}

#[test]
fn loading_a_missing_state_root_fails() {
    let db = Arc::new(MemoryDB::default());
    let missing = Cid::from_cbor_blake2b256(&"missing").unwrap();
    assert!(VM::new(context(missing), db).is_err());
}

#[test]
fn machine_follows_the_chain_config() {
    let f = fixture(TokenAmount::from_whole(10));
    let machine = f.vm.machine();
    assert_eq!(machine.epoch, 1);
    assert_eq!(
        machine.network_version,
        ChainConfig::devnet().network_version(1)
    );
    assert_eq!(
        machine.price_list,
        price_list_by_network_version(machine.network_version)
    );
    assert_eq!(machine.empty_object_cid, empty_object_cid().unwrap());
}

#[test]
fn transfer_settles_gas() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let (alice, bob) = (f.alice, f.bob);
    let burnt_before = f.actor(&BURNT_FUNDS_ACTOR_ADDR).balance;
    let reward_before = f.actor(&REWARD_ACTOR_ADDR).balance;

    let value = TokenAmount::from_whole(2);
    let ret = f
        .vm
        .apply_message(&transfer(alice, bob, 0, value.clone()))
        .unwrap();
    assert_eq!(ret.msg_receipt.exit_code, OK);
    assert!(ret.msg_receipt.gas_used > 0);
    assert!(ret.failure_info.is_none());

    let prepaid = token_mul(&TokenAmount::from_atto(200), 1_000_000);
    let paid = ret.base_fee_burn.clone() + &ret.over_estimation_burn + &ret.refund + &ret.miner_tip;
    assert_eq!(paid, prepaid);
    assert_eq!(
        ret.base_fee_burn,
        token_mul(
            &TokenAmount::from_atto(BASE_FEE),
            ret.msg_receipt.gas_used as i64
        )
    );

    let sender = f.actor(&alice);
    assert_eq!(sender.sequence, 1);
    assert_eq!(
        sender.balance,
        TokenAmount::from_whole(10) - &value - &prepaid + &ret.refund
    );
    assert_eq!(f.actor(&bob).balance, TokenAmount::from_whole(3));
    assert_eq!(
        f.actor(&BURNT_FUNDS_ACTOR_ADDR).balance,
        burnt_before + &ret.base_fee_burn + &ret.over_estimation_burn
    );
    assert_eq!(
        f.actor(&REWARD_ACTOR_ADDR).balance,
        reward_before + &ret.miner_tip
    );
}

#[test]
fn prevalidation_failures_leave_the_sender_untouched() {
    let mut f = fixture(TokenAmount::from_atto(1_000));
    let (alice, bob) = (f.alice, f.bob);

    let cases = [
        (
            ChainMessage::Unsigned(Message {
                gas_limit: 1,
                ..Message::transfer(alice, bob, TokenAmount::default())
            }),
            SYS_OUT_OF_GAS,
        ),
        (
            transfer(Address::new_id(999), bob, 0, TokenAmount::default()),
            SYS_SENDER_INVALID,
        ),
        (
            transfer(INIT_ACTOR_ADDR, bob, 0, TokenAmount::default()),
            SYS_SENDER_INVALID,
        ),
        (
            transfer(alice, bob, 5, TokenAmount::default()),
            SYS_SENDER_STATE_INVALID,
        ),
        (
            transfer(alice, bob, 0, TokenAmount::from_atto(1)),
            SYS_SENDER_STATE_INVALID,
        ),
    ];
    for (msg, expected) in cases {
        let ret = f.vm.apply_message(&msg).unwrap();
        assert_eq!(ret.msg_receipt.exit_code, expected, "{:?}", ret.failure_info);
        assert_eq!(ret.msg_receipt.gas_used, 0);
        assert!(ret.failure_info.is_some());
        assert!(ret.penalty.is_positive());
    }

    let sender = f.actor(&alice);
    assert_eq!(sender.sequence, 0);
    assert_eq!(sender.balance, TokenAmount::from_atto(1_000));
}

#[test]
fn invalid_messages_are_rejected() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let msg = ChainMessage::Unsigned(Message {
        version: 1,
        ..Message::transfer(f.alice, f.bob, TokenAmount::default())
    });
    assert!(f.vm.apply_message(&msg).is_err());
}

#[test]
fn failed_execution_still_pays_for_gas() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let alice = f.alice;
    let ret = f
        .vm
        .apply_message(&transfer(
            alice,
            Address::new_id(999),
            0,
            TokenAmount::from_whole(1),
        ))
        .unwrap();
    assert_eq!(ret.msg_receipt.exit_code, SYS_INVALID_RECEIVER);
    assert!(ret.failure_info.is_some());
    assert!(ret.msg_receipt.gas_used > 0);

    let sender = f.actor(&alice);
    assert_eq!(sender.sequence, 1);
    let prepaid = token_mul(&TokenAmount::from_atto(200), 1_000_000);
    assert_eq!(
        sender.balance,
        TokenAmount::from_whole(10) - &prepaid + &ret.refund
    );
}

#[test]
fn duplicate_messages_apply_once() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let (alice, bob) = (f.alice, f.bob);
    let first = transfer(alice, bob, 0, TokenAmount::from_whole(1));
    let second = transfer(alice, bob, 1, TokenAmount::from_whole(1));
    let blocks = vec![
        BlockMessages {
            miner: Address::new_id(1000),
            messages: vec![first.clone()],
            win_count: 1,
        },
        BlockMessages {
            miner: Address::new_id(1001),
            messages: vec![first.clone(), second.clone()],
            win_count: 1,
        },
    ];

    let mut seen = vec![];
    let receipts = f
        .vm
        .apply_block_messages(
            &blocks,
            Some(|cid: &Cid, _: &ChainMessage, ret: &ApplyRet| {
                seen.push((*cid, ret.msg_receipt.exit_code));
                Ok(())
            }),
        )
        .unwrap();

    assert_eq!(receipts.len(), 2);
    assert!(receipts.iter().all(|r| r.exit_code == OK));
    assert_eq!(
        seen,
        vec![(first.cid().unwrap(), OK), (second.cid().unwrap(), OK)]
    );
    assert_eq!(f.actor(&bob).balance, TokenAmount::from_whole(3));
}

#[test]
fn callback_errors_abort_the_round() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let blocks = vec![BlockMessages {
        miner: Address::new_id(1000),
        messages: vec![transfer(f.alice, f.bob, 0, TokenAmount::from_whole(1))],
        win_count: 1,
    }];
    let res = f.vm.apply_block_messages(
        &blocks,
        Some(|_: &Cid, _: &ChainMessage, _: &ApplyRet| Err(anyhow::anyhow!("stop"))),
    );
    assert!(res.is_err());
}

#[test]
fn implicit_messages_skip_sequence_and_gas() {
    let mut f = fixture(TokenAmount::from_whole(10));
    let bob = f.bob;
    let reward_before = f.actor(&REWARD_ACTOR_ADDR).balance;

    let msg = Message {
        sequence: 42,
        gas_limit: u64::MAX,
        ..Message::transfer(REWARD_ACTOR_ADDR, bob, TokenAmount::from_whole(5))
    };
    let ret = f.vm.apply_implicit_message(&msg).unwrap();
    assert_eq!(ret.msg_receipt.exit_code, OK);
    assert_eq!(ret.msg_receipt.gas_used, 0);

    let reward = f.actor(&REWARD_ACTOR_ADDR);
    assert_eq!(reward.sequence, 0);
    assert_eq!(reward.balance, reward_before - TokenAmount::from_whole(5));
    assert_eq!(f.actor(&bob).balance, TokenAmount::from_whole(6));

    // System sends to an unknown ID address fail without touching state.
    let root = f.vm.flush().unwrap();
    let msg = Message {
        gas_limit: u64::MAX,
        ..Message::transfer(SYSTEM_ACTOR_ADDR, Address::new_id(999), TokenAmount::default())
    };
    let ret = f.vm.apply_implicit_message(&msg).unwrap();
    assert_eq!(ret.msg_receipt.exit_code, SYS_INVALID_RECEIVER);
    assert_eq!(f.vm.flush().unwrap(), root);
}
