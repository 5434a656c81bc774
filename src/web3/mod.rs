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

//! Network provider and signer capability used by the transaction
//! protocol. Implementations are handed to a [`crate::context::Context`]
//! per client instance.

use async_trait::async_trait;
use ethers::types::{Address, TransactionReceipt, TransactionRequest, TxHash, U256};

use crate::Result;

/// [`Web3`] implementation on top of an `ethers` middleware
pub mod provider;
pub use provider::EthersWeb3;

/// Gas price information used for fee estimations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeData {
    /// Current legacy gas price
    pub gas_price: U256,
    /// Max fee per gas an EIP-1559 transaction would pay
    pub max_fee_per_gas: U256,
}

/// Signing and submission capability
#[async_trait]
pub trait Web3: Send + Sync {
    /// Address of the connected signer, if there is one.
    fn signer_address(&self) -> Option<Address>;

    /// Whether the network provider is currently reachable.
    async fn is_up(&self) -> bool;

    /// Sign and submit a transaction, returning its hash.
    async fn submit(&self, tx: &TransactionRequest) -> Result<TxHash>;

    /// Wait until the given transaction is confirmed.
    async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt>;

    /// Read-only contract call.
    async fn call(&self, tx: &TransactionRequest) -> Result<Vec<u8>>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;

    async fn fee_data(&self) -> Result<FeeData>;

    /// Resolve an ENS name, `None` when it has no address.
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>>;
}
