// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{ActorError, gas_tracker::PriceList, syscalls::Syscalls};
use crate::actor_error;
use crate::shim::{
    address::Address,
    clock::ChainEpoch,
    crypto::Signature,
    econ::TokenAmount,
    error::{ExitCode, SYS_FORBIDDEN},
    message::MethodNum,
    randomness::{DomainSeparationTag, Randomness},
    version::NetworkVersion,
};
use cid::Cid;
use fvm_ipld_blockstore::Blockstore;
use fvm_ipld_encoding::RawBytes;
use serde::{Serialize, de::DeserializeOwned};

/// Information about the message being invoked, as seen by the receiving
/// actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    /// ID address of the immediate caller.
    pub caller: Address,
    /// ID address of the receiving actor.
    pub receiver: Address,
    pub value_received: TokenAmount,
}

impl MessageInfo {
    pub fn caller(&self) -> &Address {
        &self.caller
    }

    pub fn receiver(&self) -> &Address {
        &self.receiver
    }

    pub fn value_received(&self) -> &TokenAmount {
        &self.value_received
    }
}

/// Result of a nested send that did not fail fatally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendOutcome {
    pub exit_code: ExitCode,
    pub return_data: RawBytes,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code.is_success()
    }
}

/// Rules an actor method checks its immediate caller against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallerPattern {
    Any,
    AddressIn(Vec<Address>),
    CodeIn(Vec<Cid>),
}

impl CallerPattern {
    /// Returns `true` when `caller` satisfies the pattern. The caller's code
    /// is only looked up for [`CallerPattern::CodeIn`].
    pub fn is_match<F>(&self, caller: &Address, caller_code: F) -> Result<bool, ActorError>
    where
        F: FnOnce() -> Result<Option<Cid>, ActorError>,
    {
        match self {
            Self::Any => Ok(true),
            Self::AddressIn(addrs) => Ok(addrs.contains(caller)),
            Self::CodeIn(codes) => {
                let code = caller_code()?
                    .ok_or_else(|| actor_error!(fatal("failed to lookup code cid for caller {caller}")))?;
                Ok(codes.contains(&code))
            }
        }
    }
}

/// Runtime is the VM's internal runtime object.
/// This is everything that is accessible to actors, beyond parameters.
pub trait Runtime {
    /// Information related to the current message being executed.
    fn message(&self) -> &MessageInfo;

    /// The current chain epoch number. The genesis block has epoch zero.
    fn curr_epoch(&self) -> ChainEpoch;

    fn network_version(&self) -> NetworkVersion;

    /// Validates the caller against a pattern. Every method other than a
    /// plain send must validate exactly once; a second validation aborts with
    /// `SYS_ILLEGAL_ACTOR`, a mismatch with `SYS_FORBIDDEN`.
    fn validate_immediate_caller(&mut self, pattern: &CallerPattern) -> Result<(), ActorError>;

    fn validate_immediate_caller_accept_any(&mut self) -> Result<(), ActorError> {
        self.validate_immediate_caller(&CallerPattern::Any)
    }

    fn validate_immediate_caller_is(&mut self, addresses: &[Address]) -> Result<(), ActorError> {
        self.validate_immediate_caller(&CallerPattern::AddressIn(addresses.to_vec()))
    }

    fn validate_immediate_caller_type(&mut self, types: &[Cid]) -> Result<(), ActorError> {
        self.validate_immediate_caller(&CallerPattern::CodeIn(types.to_vec()))
    }

    /// The balance of the receiver.
    fn current_balance(&self) -> Result<TokenAmount, ActorError>;

    /// Resolves an address of any protocol to an ID address (via the Init
    /// actor's table). This allows resolution of externally-provided SECP,
    /// BLS, or actor addresses to the canonical form. If the argument is an
    /// ID address it is returned directly.
    fn resolve_address(&self, address: &Address) -> Result<Option<Address>, ActorError>;

    /// Look up the code ID at an actor address.
    fn get_actor_code_cid(&self, addr: &Address) -> Result<Option<Cid>, ActorError>;

    /// Randomness returns a (pseudo)random byte array drawing from the latest
    /// ticket chain from a given epoch and incorporating requisite entropy.
    fn get_randomness_from_tickets(
        &self,
        personalization: DomainSeparationTag,
        rand_epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Result<Randomness, ActorError>;

    /// Randomness returns a (pseudo)random byte array drawing from the latest
    /// beacon from a given epoch and incorporating requisite entropy.
    fn get_randomness_from_beacon(
        &self,
        personalization: DomainSeparationTag,
        rand_epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Result<Randomness, ActorError>;

    /// Head of the receiver. Aborts with `SYS_ILLEGAL_ARGUMENT` when the
    /// receiver does not exist.
    fn readonly_head(&self) -> Result<Cid, ActorError>;

    /// Opens a state transaction on the receiver and returns the head it
    /// starts from. Sends are refused until [`Runtime::end_transaction`].
    fn begin_transaction(&mut self) -> Result<Cid, ActorError>;

    fn end_transaction(&mut self);

    /// Replaces the receiver's head with `new` if it still equals `expected`.
    /// A mismatch is fatal.
    fn commit_head(&mut self, expected: &Cid, new: Cid) -> Result<(), ActorError>;

    /// Head of an actor that has not stored any state yet.
    fn empty_object_cid(&self) -> Cid;

    /// Gas-charged block store handle, for data structures such as HAMTs.
    fn store(&self) -> &dyn Blockstore;

    fn store_get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, ActorError>;

    /// Stores a `DAG-CBOR` encoded block and returns its CID.
    fn store_put(&self, block: &[u8]) -> Result<Cid, ActorError>;

    /// Sends a message to another actor. Aborts of the callee come back as the
    /// outcome's exit code; fatal errors are returned as errors.
    fn send(
        &mut self,
        to: Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
    ) -> Result<SendOutcome, ActorError>;

    fn price_list(&self) -> PriceList;

    /// Charges compute gas. Virtual gas is tracked but never deducted.
    fn charge_gas(
        &mut self,
        name: &'static str,
        compute: i64,
        virtual_compute: i64,
    ) -> Result<(), ActorError>;

    /// Computes an address for a new actor. The returned address is intended
    /// to uniquely refer to the actor even in the event of a chain re-org.
    fn new_actor_address(&mut self) -> Result<Address, ActorError>;

    /// Creates an actor with code `code_id` and an empty state at `address`.
    fn create_actor(&mut self, code_id: Cid, address: &Address) -> Result<(), ActorError>;

    /// Deletes the executing actor from the state tree, transferring any
    /// balance to `beneficiary`.
    fn delete_actor(&mut self, beneficiary: &Address) -> Result<(), ActorError>;

    /// Approximation of the total amount of FIL in circulation.
    fn total_fil_circ_supply(&self) -> Result<TokenAmount, ActorError>;

    fn syscalls(&self) -> &dyn Syscalls;

    /// Actor log line, emitted under the `actors` target.
    fn log(&self, level: tracing::Level, msg: &str);

    fn abort(&self, exit_code: ExitCode, msg: &str) -> ActorError {
        ActorError::new(exit_code, msg)
    }
}

/// Typed helpers on top of [`Runtime`].
pub trait RuntimeExt: Runtime {
    /// Initializes the state object. This is only valid in a constructor
    /// function and when the state has not yet been initialized.
    fn create<S: Serialize>(&mut self, obj: &S) -> Result<(), ActorError> {
        let new_head = self.store_put_cbor(obj)?;
        let empty = self.empty_object_cid();
        self.commit_head(&empty, new_head)
    }

    /// Loads a readonly copy of the state of the receiver into the argument.
    fn state<S: DeserializeOwned>(&self) -> Result<S, ActorError> {
        let head = self.readonly_head()?;
        self.store_get_cbor(&head)?
            .ok_or_else(|| actor_error!(fatal("state does not exist for actor state cid: {head}")))
    }

    /// Loads a mutable version of the state into the `obj` argument and
    /// protects the execution from side effects (including message send).
    ///
    /// The second argument is a function which allows the caller to mutate
    /// the state. The new state is committed only if the function succeeds.
    fn transaction<S, R, F>(&mut self, f: F) -> Result<R, ActorError>
    where
        S: Serialize + DeserializeOwned,
        F: FnOnce(&mut S, &mut Self) -> Result<R, ActorError>,
    {
        let head = self.begin_transaction()?;
        let result = match self.store_get_cbor::<S>(&head) {
            Ok(Some(mut st)) => f(&mut st, self).map(|ret| (st, ret)),
            Ok(None) => Err(actor_error!(fatal("actor state does not exist: {head}"))),
            Err(e) => Err(e),
        };
        self.end_transaction();
        let (state, ret) = result?;
        let new_head = self.store_put_cbor(&state)?;
        self.commit_head(&head, new_head)?;
        Ok(ret)
    }

    fn store_get_cbor<T: DeserializeOwned>(&self, cid: &Cid) -> Result<Option<T>, ActorError> {
        match self.store_get(cid)? {
            Some(bytes) => fvm_ipld_encoding::from_slice(&bytes)
                .map(Some)
                .map_err(|e| actor_error!(USR_SERIALIZATION; "failed to unmarshal cbor object {e}")),
            None => Ok(None),
        }
    }

    fn store_put_cbor<T: Serialize>(&self, obj: &T) -> Result<Cid, ActorError> {
        let bytes = fvm_ipld_encoding::to_vec(obj)
            .map_err(|e| actor_error!(USR_SERIALIZATION; "failed to marshal cbor object {e}"))?;
        self.store_put(&bytes)
    }

    /// Verifies a signature, charging the verification gas first.
    fn verify_signature(
        &mut self,
        signature: &Signature,
        signer: &Address,
        plaintext: &[u8],
    ) -> Result<bool, ActorError> {
        let charge = self.price_list().on_verify_signature(signature.signature_type());
        self.charge_gas(charge.name, charge.total(), charge.virtual_total())?;
        Ok(self
            .syscalls()
            .verify_signature(signature, signer, plaintext)
            .is_ok())
    }

    /// Hashes data with blake2b-256, charging the hashing gas first.
    fn hash_blake2b(&mut self, data: &[u8]) -> Result<[u8; 32], ActorError> {
        let charge = self.price_list().on_hashing(data.len());
        self.charge_gas(charge.name, charge.total(), charge.virtual_total())?;
        Ok(self.syscalls().hash_blake2b(data))
    }

    /// Sends a message and turns a non-zero exit code into an abort carrying
    /// the same code.
    fn send_checked(
        &mut self,
        to: Address,
        method: MethodNum,
        params: RawBytes,
        value: TokenAmount,
    ) -> Result<RawBytes, ActorError> {
        let outcome = self.send(to, method, params, value)?;
        if outcome.is_success() {
            Ok(outcome.return_data)
        } else {
            Err(ActorError::new(
                outcome.exit_code,
                format!("send to {to} method {method} failed"),
            ))
        }
    }
}

impl<T: Runtime + ?Sized> RuntimeExt for T {}

/// Sized handle over [`Runtime::store`], for code generic over a
/// [`Blockstore`].
#[derive(Clone, Copy)]
pub struct ActorStore<'a>(pub &'a dyn Blockstore);

impl Blockstore for ActorStore<'_> {
    fn get(&self, k: &Cid) -> anyhow::Result<Option<Vec<u8>>> {
        self.0.get(k)
    }

    fn put_keyed(&self, k: &Cid, block: &[u8]) -> anyhow::Result<()> {
        self.0.put_keyed(k, block)
    }

    fn has(&self, k: &Cid) -> anyhow::Result<bool> {
        self.0.has(k)
    }
}

/// Maps a failure of a store-backed data structure to an abort with `code`,
/// keeping gas exhaustion and fatal store errors intact.
pub fn store_error(code: ExitCode, context: &str, err: anyhow::Error) -> ActorError {
    for cause in err.chain() {
        if let Some(actor_err) = cause.downcast_ref::<ActorError>() {
            return actor_err.clone();
        }
    }
    ActorError::new(code, format!("{context}: {err:#}"))
}

/// Caller check failures share one message shape.
pub(crate) fn forbidden_caller(caller: &Address, pattern: &CallerPattern) -> ActorError {
    ActorError::new(
        SYS_FORBIDDEN,
        format!("caller {caller} does not match {pattern:?}"),
    )
}
