// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use super::TicketError;
use crate::beacon::BeaconEntry;
use crate::blocks::{Ticket, TipsetKey, VRFProof};
use crate::chain::ChainReader;
use crate::key_management::Signer;
use crate::shim::{
    address::Address, clock::ChainEpoch, crypto::verify_bls_sig,
    randomness::{DomainSeparationTag, Randomness},
};
use crate::state_manager::blend_entropy;
use crate::utils::encoding::blake2b_256;
use tracing::debug;

/// Produces and checks the VRF tickets carried by block headers.
pub struct TicketMachine<C> {
    cs: Arc<C>,
}

impl<C: ChainReader> TicketMachine<C> {
    pub fn new(cs: Arc<C>) -> Self {
        Self { cs }
    }

    /// Signs the ticket randomness for `epoch` with the worker key. The
    /// signature is the ticket's VRF proof.
    #[allow(clippy::too_many_arguments)]
    pub fn make_ticket(
        &self,
        base: &TipsetKey,
        epoch: ChainEpoch,
        miner: &Address,
        beacon_entry: &BeaconEntry,
        new_period: bool,
        worker: &Address,
        signer: &dyn Signer,
    ) -> Result<Ticket, TicketError> {
        let randomness = self.ticket_vrf_randomness(base, beacon_entry, new_period, miner, epoch)?;
        let vrf_proof = signer
            .sign_bytes(&randomness, worker)
            .map_err(|e| TicketError::Signing(format!("{e:#}")))?;
        Ok(Ticket::new(VRFProof::new(vrf_proof.bytes)))
    }

    /// Recomputes the randomness the producer must have signed and checks the
    /// ticket's proof is the worker's BLS signature over it.
    #[allow(clippy::too_many_arguments)]
    pub fn is_valid_ticket(
        &self,
        base: &TipsetKey,
        beacon_entry: &BeaconEntry,
        new_period: bool,
        epoch: ChainEpoch,
        miner: &Address,
        worker: &Address,
        ticket: &Ticket,
    ) -> Result<(), TicketError> {
        let randomness = self.ticket_vrf_randomness(base, beacon_entry, new_period, miner, epoch)?;
        verify_bls_sig(ticket.vrfproof.as_bytes(), &randomness, worker).map_err(|e| {
            debug!(%miner, epoch, "invalid ticket: {e}");
            TicketError::InvalidTicket(e)
        })
    }

    fn ticket_vrf_randomness(
        &self,
        base: &TipsetKey,
        beacon_entry: &BeaconEntry,
        new_period: bool,
        miner: &Address,
        epoch: ChainEpoch,
    ) -> Result<Randomness, TicketError> {
        let mut entropy = fvm_ipld_encoding::to_vec(miner)
            .map_err(|e| TicketError::Randomness(format!("failed to encode miner entropy: {e}")))?;

        if new_period {
            let base_ts = self
                .cs
                .tipset(base)
                .map_err(|e| TicketError::Randomness(e.to_string()))?;
            let min_ticket = base_ts.min_ticket().ok_or_else(|| {
                TicketError::Randomness(format!("base tipset {base} has no ticket"))
            })?;
            entropy.extend_from_slice(min_ticket.vrfproof.as_bytes());
        }

        let seed = blake2b_256(beacon_entry.data());
        blend_entropy(
            DomainSeparationTag::TicketProduction.as_i64(),
            &seed,
            epoch,
            &entropy,
        )
        .map_err(|e| TicketError::Randomness(e.to_string()))
    }
}
