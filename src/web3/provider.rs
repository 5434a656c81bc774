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

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    providers::{Middleware, MiddlewareError, PendingTransaction, ProviderError},
    types::{Address, TransactionReceipt, TransactionRequest, TxHash, U256},
};
use log::{debug, error};

use super::{FeeData, Web3};
use crate::{Error, Result};

/// [`Web3`] capability backed by an `ethers` [`Middleware`].
///
/// Plugging a `SignerMiddleware` gives a signing client, while a bare
/// `Provider` only supports read-only calls.
#[derive(Debug)]
pub struct EthersWeb3<M> {
    client: Arc<M>,
    /// Block confirmations to wait for
    confirmations: usize,
}

impl<M: Middleware> EthersWeb3<M> {
    pub fn new(client: Arc<M>, confirmations: usize) -> Self {
        Self { client, confirmations }
    }

    fn middleware_error(e: M::Error) -> Error {
        let e = e.to_string();
        error!(target: "dao-sdk::web3", "{}", e);
        Error::ProviderError(e)
    }
}

#[async_trait]
impl<M: Middleware + 'static> Web3 for EthersWeb3<M> {
    fn signer_address(&self) -> Option<Address> {
        self.client.default_sender()
    }

    async fn is_up(&self) -> bool {
        self.client.get_block_number().await.is_ok()
    }

    async fn submit(&self, tx: &TransactionRequest) -> Result<TxHash> {
        let pending =
            self.client.send_transaction(tx.clone(), None).await.map_err(Self::middleware_error)?;
        let tx_hash = pending.tx_hash();
        debug!(target: "dao-sdk::web3", "Submitted transaction {:?}", tx_hash);
        Ok(tx_hash)
    }

    async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let pending = PendingTransaction::new(tx_hash, self.client.provider())
            .confirmations(self.confirmations);

        match pending.await? {
            Some(receipt) => Ok(receipt),
            None => Err(Error::TransactionDropped(format!("{:?}", tx_hash))),
        }
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Vec<u8>> {
        let ret = self.client.call(&tx.clone().into(), None).await.map_err(Self::middleware_error)?;
        Ok(ret.to_vec())
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        self.client.estimate_gas(&tx.clone().into(), None).await.map_err(Self::middleware_error)
    }

    async fn fee_data(&self) -> Result<FeeData> {
        let gas_price = self.client.get_gas_price().await.map_err(Self::middleware_error)?;
        let (max_fee_per_gas, _) =
            self.client.estimate_eip1559_fees(None).await.map_err(Self::middleware_error)?;
        Ok(FeeData { gas_price, max_fee_per_gas })
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        match self.client.resolve_name(name).await {
            Ok(address) if address.is_zero() => Ok(None),
            Ok(address) => Ok(Some(address)),
            Err(e) if e.as_provider_error().is_some_and(is_missing_record) => {
                debug!(target: "dao-sdk::web3", "No ENS record for {}: {}", name, e);
                Ok(None)
            }
            Err(e) => Err(Self::middleware_error(e)),
        }
    }
}

/// ENS lookup errors meaning the name has no usable record
fn is_missing_record(e: &ProviderError) -> bool {
    matches!(e, ProviderError::EnsError(_) | ProviderError::EnsNotOwned(_))
}
