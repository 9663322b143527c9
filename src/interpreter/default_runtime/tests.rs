// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::*;
use crate::actors::{INIT_ACTOR_CODE_ID, account, init};
use crate::db::MemoryDB;
use crate::interpreter::RuntimeExt as _;
use crate::interpreter::gas_tracker::price_list_by_network_version;
use crate::interpreter::syscalls::DefaultSyscalls;
use crate::shim::address::{BURNT_FUNDS_ACTOR_ADDR, INIT_ACTOR_ADDR};
use crate::shim::error::{
    SYS_FORBIDDEN, SYS_ILLEGAL_ACTOR, SYS_ILLEGAL_ARGUMENT, SYS_INSUFFICIENT_FUNDS,
    SYS_INVALID_RECEIVER, SYS_OUT_OF_GAS, USR_FORBIDDEN,
};
use crate::test_utils::{MockRand, genesis_state};
use crate::utils::cid::empty_object_cid;

const GAS_LIMIT: i64 = 10_000_000_000;

struct FailingRand;

impl Rand for FailingRand {
    fn get_chain_randomness(
        &self,
        _: DomainSeparationTag,
        round: ChainEpoch,
        _: &[u8],
    ) -> anyhow::Result<Randomness> {
        anyhow::bail!("no tickets at {round}")
    }

    fn get_beacon_randomness(
        &self,
        _: DomainSeparationTag,
        round: ChainEpoch,
        _: &[u8],
    ) -> anyhow::Result<Randomness> {
        anyhow::bail!("no beacon at {round}")
    }
}

struct Env {
    state: StateTree<Arc<MemoryDB>>,
    machine: MachineContext,
    rand: Box<dyn Rand>,
    syscalls: DefaultSyscalls,
    circ_supply: CirculatingSupplyCalculator,
    alice: Address,
    bob: Address,
}

const ALICE: Address = Address::new_id(100);
const BOB: Address = Address::new_id(101);

fn env() -> Env {
    let db = Arc::new(MemoryDB::default());
    let alice = Address::new_secp256k1(&[1; 65]).unwrap();
    let bob = Address::new_bls(&[2; 48]).unwrap();
    let root = genesis_state(
        &db,
        &[
            (alice, TokenAmount::from_whole(10)),
            (bob, TokenAmount::from_whole(1)),
        ],
    )
    .unwrap();
    let network_version = NetworkVersion::V21;
    Env {
        state: StateTree::new_from_root(db, &root).unwrap(),
        machine: MachineContext {
            epoch: 10,
            network_version,
            base_fee: TokenAmount::from_atto(100),
            price_list: price_list_by_network_version(network_version),
            empty_object_cid: empty_object_cid().unwrap(),
        },
        rand: Box::new(MockRand),
        syscalls: DefaultSyscalls,
        circ_supply: CirculatingSupplyCalculator::default(),
        alice,
        bob,
    }
}

impl Env {
    fn ctx(&mut self, gas_limit: i64) -> CallContext<'_, MemoryDB> {
        CallContext::new(
            &mut self.state,
            gas_limit,
            0,
            &self.machine,
            self.rand.as_ref(),
            &self.syscalls,
            &self.circ_supply,
            self.alice,
            0,
        )
    }

    fn balance(&self, addr: &Address) -> TokenAmount {
        self.state.get_actor(addr).unwrap().unwrap().balance
    }
}

fn msg(caller: Address, receiver: Address) -> MessageInfo {
    MessageInfo {
        caller,
        receiver,
        value_received: TokenAmount::default(),
    }
}

fn exit_code<T: std::fmt::Debug>(res: Result<T, ActorError>) -> ExitCode {
    res.unwrap_err().exit_code().expect("abort, not fatal")
}

#[test]
fn caller_is_validated_once() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    rt.validate_immediate_caller_accept_any().unwrap();
    assert_eq!(
        exit_code(rt.validate_immediate_caller_accept_any()),
        SYS_ILLEGAL_ACTOR
    );
}

#[test]
fn caller_mismatch_is_forbidden() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);

    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    assert_eq!(
        exit_code(rt.validate_immediate_caller_is(&[INIT_ACTOR_ADDR])),
        SYS_FORBIDDEN
    );
    drop(rt);

    let mut rt = DefaultRuntime::new(&mut ctx, msg(BOB, ALICE), 2);
    rt.validate_immediate_caller_type(&[*ACCOUNT_ACTOR_CODE_ID])
        .unwrap();
}

#[test]
fn transaction_commits_and_blocks_sends() {
    let mut env = env();
    let (alice_key, bob_key) = (env.alice, env.bob);
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);

    rt.transaction(|st: &mut account::State, rt| {
        assert_eq!(st.address, alice_key);
        let res = rt.send(
            BURNT_FUNDS_ACTOR_ADDR,
            METHOD_SEND,
            RawBytes::default(),
            TokenAmount::from_atto(7),
        );
        assert_eq!(exit_code(res), SYS_ILLEGAL_ACTOR);
        st.address = bob_key;
        Ok(())
    })
    .unwrap();

    let st: account::State = rt.state().unwrap();
    assert_eq!(st.address, bob_key);

    // Sends are allowed again once the transaction is over.
    let outcome = rt
        .send(
            BURNT_FUNDS_ACTOR_ADDR,
            METHOD_SEND,
            RawBytes::default(),
            TokenAmount::from_atto(5),
        )
        .unwrap();
    assert!(outcome.is_success());
    drop(rt);
    drop(ctx);
    // Only the send after the transaction moved funds.
    assert_eq!(env.balance(&BURNT_FUNDS_ACTOR_ADDR), TokenAmount::from_atto(5));
    assert_eq!(
        env.balance(&ALICE),
        TokenAmount::from_whole(10) - TokenAmount::from_atto(5)
    );
}

#[test]
fn running_out_of_gas_inside_a_transaction_keeps_the_head() {
    let mut env = env();
    let head = env.state.get_actor(&ALICE).unwrap().unwrap().state;
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);

    let before = rt.gas_used();
    let res: Result<(), _> = rt.transaction(|st: &mut account::State, rt| {
        st.address = Address::new_id(7);
        rt.charge_gas("expensive", GAS_LIMIT, 0)
    });
    assert_eq!(exit_code(res), SYS_OUT_OF_GAS);
    // Gas never goes back down; the tracker is pinned at the limit.
    assert!(rt.gas_used() > before);
    assert_eq!(rt.gas_used(), GAS_LIMIT);
    assert!(rt.allow_side_effects);
    drop(rt);
    drop(ctx);

    assert_eq!(env.state.get_actor(&ALICE).unwrap().unwrap().state, head);
}

#[test]
fn failed_transaction_keeps_the_old_head() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    let head = rt.readonly_head().unwrap();

    let res: Result<(), _> = rt.transaction(|st: &mut account::State, _| {
        st.address = Address::new_id(7);
        Err(actor_error!(USR_FORBIDDEN; "changed my mind"))
    });
    assert_eq!(exit_code(res), USR_FORBIDDEN);
    assert_eq!(rt.readonly_head().unwrap(), head);
    // The side effect flag is restored even when the closure fails.
    assert!(rt.allow_side_effects);
}

#[test]
fn diverged_head_is_fatal() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);

    let head = rt.begin_transaction().unwrap();
    rt.end_transaction();
    let first = rt
        .store_put_cbor(&account::State {
            address: Address::new_id(1),
        })
        .unwrap();
    let second = rt
        .store_put_cbor(&account::State {
            address: Address::new_id(2),
        })
        .unwrap();

    rt.commit_head(&head, first).unwrap();
    // Another write already replaced `head`.
    let err = rt.commit_head(&head, second).unwrap_err();
    assert!(err.is_fatal(), "{err}");
    assert_eq!(rt.readonly_head().unwrap(), first);
}

#[test]
fn readonly_state_of_missing_actor_is_illegal_argument() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, Address::new_id(999)), 2);
    assert_eq!(exit_code(rt.readonly_head()), SYS_ILLEGAL_ARGUMENT);
}

#[test]
fn create_actor_rules() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, INIT_ACTOR_ADDR), 2);
    let fresh = Address::new_id(500);

    assert_eq!(
        exit_code(rt.create_actor(*INIT_ACTOR_CODE_ID, &fresh)),
        SYS_ILLEGAL_ARGUMENT
    );
    assert_eq!(
        exit_code(rt.create_actor(*ACCOUNT_ACTOR_CODE_ID, &ALICE)),
        SYS_ILLEGAL_ARGUMENT
    );
    rt.create_actor(*ACCOUNT_ACTOR_CODE_ID, &fresh).unwrap();
    assert_eq!(
        rt.get_actor_code_cid(&fresh).unwrap(),
        Some(*ACCOUNT_ACTOR_CODE_ID)
    );
    drop(rt);

    // A fresh actor has no state to transact on until it is constructed.
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, fresh), 2);
    assert_eq!(exit_code(rt.begin_transaction()), SYS_ILLEGAL_ACTOR);
    assert!(rt.allow_side_effects);
}

#[test]
fn deleted_actor_pays_out_and_disappears() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    assert_eq!(exit_code(rt.delete_actor(&ALICE)), SYS_ILLEGAL_ARGUMENT);
    rt.delete_actor(&BOB).unwrap();
    assert_eq!(rt.get_actor_code_cid(&ALICE).unwrap(), None);
    drop(rt);
    drop(ctx);

    assert!(env.state.get_actor(&ALICE).unwrap().is_none());
    assert_eq!(env.balance(&BOB), TokenAmount::from_whole(11));
}

#[test]
fn sending_to_a_new_key_address_creates_an_account() {
    let mut env = env();
    let carol = Address::new_secp256k1(&[3; 65]).unwrap();
    let mut ctx = env.ctx(GAS_LIMIT);
    vm_send(
        &mut ctx,
        ALICE,
        carol,
        METHOD_SEND,
        &TokenAmount::from_whole(1),
        &RawBytes::default(),
    )
    .unwrap();
    drop(ctx);

    let carol_id = env.state.lookup_id(&carol).unwrap().unwrap();
    assert_eq!(carol_id, Address::new_id(102));
    let act = env.state.get_actor(&carol_id).unwrap().unwrap();
    assert_eq!(act.code, *ACCOUNT_ACTOR_CODE_ID);
    assert_eq!(act.balance, TokenAmount::from_whole(1));
    assert_eq!(
        resolve_to_key_addr(&env.state, &carol_id).unwrap(),
        carol
    );
    assert_eq!(env.balance(&ALICE), TokenAmount::from_whole(9));
}

#[test]
fn send_failures_map_to_exit_codes() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let none = RawBytes::default();

    let res = vm_send(&mut ctx, ALICE, Address::new_id(999), METHOD_SEND, &TokenAmount::default(), &none);
    assert_eq!(exit_code(res), SYS_INVALID_RECEIVER);

    let res = vm_send(&mut ctx, BOB, ALICE, METHOD_SEND, &TokenAmount::from_whole(2), &none);
    assert_eq!(exit_code(res), SYS_INSUFFICIENT_FUNDS);
    drop(ctx);

    let mut ctx = env.ctx(10);
    let res = vm_send(&mut ctx, ALICE, BOB, METHOD_SEND, &TokenAmount::default(), &none);
    assert_eq!(exit_code(res), SYS_OUT_OF_GAS);
    assert!(ctx.gas.borrow().is_exhausted());
}

#[test]
fn aborted_nested_send_is_reverted() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);

    // Init refuses to exec a singleton, after the value already moved.
    let params = RawBytes::serialize(init::ExecParams {
        code_cid: *INIT_ACTOR_CODE_ID,
        constructor_params: RawBytes::default(),
    })
    .unwrap();
    let outcome = rt
        .send(INIT_ACTOR_ADDR, init::Method::Exec as u64, params, TokenAmount::from_whole(1))
        .unwrap();
    assert_eq!(outcome.exit_code, USR_FORBIDDEN);
    drop(rt);
    drop(ctx);

    assert_eq!(env.balance(&ALICE), TokenAmount::from_whole(10));
    assert_eq!(env.balance(&INIT_ACTOR_ADDR), TokenAmount::default());
}

#[test]
fn init_exec_constructs_an_account() {
    let mut env = env();
    let dave = Address::new_bls(&[4; 48]).unwrap();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);

    let params = RawBytes::serialize(init::ExecParams {
        code_cid: *ACCOUNT_ACTOR_CODE_ID,
        constructor_params: RawBytes::serialize(dave).unwrap(),
    })
    .unwrap();
    let ret: init::ExecReturn = rt
        .send_checked(INIT_ACTOR_ADDR, init::Method::Exec as u64, params, TokenAmount::default())
        .unwrap()
        .deserialize()
        .unwrap();
    assert_eq!(ret.id_address, Address::new_id(102));
    assert_eq!(ret.robust_address.protocol(), crate::shim::address::Protocol::Actor);
    drop(rt);
    drop(ctx);

    assert_eq!(
        env.state.lookup_id(&ret.robust_address).unwrap(),
        Some(ret.id_address)
    );
    assert_eq!(resolve_to_key_addr(&env.state, &ret.id_address).unwrap(), dave);
}

#[test]
fn actor_addresses_depend_on_origin_and_count() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, INIT_ACTOR_ADDR), 2);
    let a = rt.new_actor_address().unwrap();
    let b = rt.new_actor_address().unwrap();
    assert_ne!(a, b);
    drop(rt);
    drop(ctx);

    let mut other = self::env();
    let mut ctx = other.ctx(GAS_LIMIT);
    let mut rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, INIT_ACTOR_ADDR), 2);
    assert_eq!(rt.new_actor_address().unwrap(), a);
}

#[test]
fn randomness_failures_are_fatal() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    rt.get_randomness_from_tickets(DomainSeparationTag::SealRandomness, 5, b"entropy")
        .unwrap();
    drop(rt);
    drop(ctx);

    env.rand = Box::new(FailingRand);
    let mut ctx = env.ctx(GAS_LIMIT);
    let rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    assert!(
        rt.get_randomness_from_tickets(DomainSeparationTag::SealRandomness, 5, b"entropy")
            .unwrap_err()
            .is_fatal()
    );
    assert!(
        rt.get_randomness_from_beacon(DomainSeparationTag::SealRandomness, 5, b"entropy")
            .unwrap_err()
            .is_fatal()
    );
}

#[test]
fn store_round_trip_charges_gas() {
    let mut env = env();
    let mut ctx = env.ctx(GAS_LIMIT);
    let rt = DefaultRuntime::new(&mut ctx, msg(SYSTEM_ACTOR_ADDR, ALICE), 2);
    let before = rt.gas_used();
    let cid = rt.store_put(b"\x83\x01\x02\x03").unwrap();
    let after_put = rt.gas_used();
    assert!(after_put > before);
    assert_eq!(rt.store_get(&cid).unwrap().unwrap(), b"\x83\x01\x02\x03");
    assert!(rt.gas_used() > after_put);
}
