/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Multi-step transaction protocol.
//!
//! A state-changing operation is exposed as a stream of steps: the
//! transaction is submitted and a pending step carrying its hash is
//! yielded, then the receipt is awaited and turned into the terminal
//! step. Errors end the stream. Dropping the stream after the pending
//! step leaves the submitted transaction in flight.

use std::sync::Arc;

use ethers::types::{Address, TransactionReceipt, TransactionRequest, TxHash, U256, U64};
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use log::{debug, info};

use crate::{web3::Web3, Error, Result};

/// Event lookup in transaction receipts
pub mod event;

/// Stream of steps of a multi-step operation
pub type StepStream<S> = BoxStream<'static, Result<S>>;

/// Estimated fee of a transaction, in wei
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasFeeEstimation {
    pub average: U256,
    pub max: U256,
}

/// Prepared, unsigned contract call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
}

impl ContractCall {
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self { to, data, value: U256::zero() }
    }

    pub fn to_request(&self, from: Option<Address>) -> TransactionRequest {
        let mut req = TransactionRequest::new().to(self.to).data(self.data.clone()).value(self.value);
        if let Some(from) = from {
            req = req.from(from);
        }
        req
    }
}

enum Stage<P, F> {
    Submit { web3: Arc<dyn Web3>, request: TransactionRequest, pending: P, finish: F },
    Confirm { web3: Arc<dyn Web3>, tx_hash: TxHash, finish: F },
    Finished,
}

fn check_receipt(receipt: &TransactionReceipt) -> Result<()> {
    if receipt.status == Some(U64::zero()) {
        return Err(Error::TransactionReverted(format!("{:?}", receipt.transaction_hash)))
    }

    Ok(())
}

/// Submit `call` from `signer` and drive it to its terminal step.
///
/// `pending` builds the step yielded once the transaction is submitted,
/// `finish` turns the confirmed receipt into the terminal step.
pub fn submit_call<S, P, F>(
    web3: Arc<dyn Web3>,
    signer: Address,
    call: ContractCall,
    pending: P,
    finish: F,
) -> StepStream<S>
where
    S: Send + 'static,
    P: FnOnce(TxHash) -> S + Send + 'static,
    F: FnOnce(&TransactionReceipt) -> Result<S> + Send + 'static,
{
    let request = call.to_request(Some(signer));
    let stage = Stage::Submit { web3, request, pending, finish };

    stream::unfold(stage, |stage| async move {
        match stage {
            Stage::Submit { web3, request, pending, finish } => {
                match web3.submit(&request).await {
                    Ok(tx_hash) => {
                        info!(target: "dao-sdk::tx", "Transaction {:?} submitted", tx_hash);
                        Some((Ok(pending(tx_hash)), Stage::Confirm { web3, tx_hash, finish }))
                    }
                    Err(e) => Some((Err(e), Stage::Finished)),
                }
            }

            Stage::Confirm { web3, tx_hash, finish } => {
                let step = match web3.wait(tx_hash).await {
                    Ok(receipt) => {
                        debug!(
                            target: "dao-sdk::tx",
                            "Transaction {:?} confirmed in block {:?}", tx_hash, receipt.block_number,
                        );
                        check_receipt(&receipt).and_then(|_| finish(&receipt))
                    }
                    Err(e) => Err(e),
                };
                Some((step, Stage::Finished))
            }

            Stage::Finished => None,
        }
    })
    .boxed()
}

enum Chain<S, N> {
    First(StepStream<S>, N),
    Second(StepStream<S>),
    Finished,
}

/// Run `first` to its end, then the steps built by `next`. `next` is
/// only invoked once `first` ended without errors.
pub fn chain_steps<S, N>(first: StepStream<S>, next: N) -> StepStream<S>
where
    S: Send + 'static,
    N: FnOnce() -> StepStream<S> + Send + 'static,
{
    stream::unfold(Chain::First(first, next), |mut chain| async move {
        loop {
            chain = match chain {
                Chain::First(mut steps, next) => match steps.next().await {
                    Some(Ok(step)) => return Some((Ok(step), Chain::First(steps, next))),
                    Some(Err(e)) => return Some((Err(e), Chain::Finished)),
                    None => Chain::Second(next()),
                },

                Chain::Second(mut steps) => match steps.next().await {
                    Some(Ok(step)) => return Some((Ok(step), Chain::Second(steps))),
                    Some(Err(e)) => return Some((Err(e), Chain::Finished)),
                    None => return None,
                },

                Chain::Finished => return None,
            }
        }
    })
    .boxed()
}

/// Read-only call of `call`, returning the raw return data.
pub async fn static_call(web3: &dyn Web3, from: Option<Address>, call: &ContractCall) -> Result<Vec<u8>> {
    web3.call(&call.to_request(from)).await
}

/// Estimate the fee `call` would cost when sent from `from`.
pub async fn estimate_fee(
    web3: &dyn Web3,
    from: Address,
    call: &ContractCall,
) -> Result<GasFeeEstimation> {
    let gas = web3.estimate_gas(&call.to_request(Some(from))).await?;
    let fees = web3.fee_data().await?;
    Ok(GasFeeEstimation { average: gas * fees.gas_price, max: gas * fees.max_fee_per_gas })
}
