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

/// Error codes
pub mod error;
pub use error::{Error, Result};

/// Utility functions and codecs
pub mod util;

/// Client configuration and collaborators
pub mod context;

/// Network provider and signer capability
pub mod web3;

/// IPFS client for off-chain metadata
pub mod ipfs;

/// Indexer (GraphQL) client
pub mod indexer;

/// Contract function and event fragments
pub mod abi;

/// Multi-step transaction protocol
pub mod tx;

/// Proposal identifiers, status and assembly
pub mod proposal;

/// Governance plugin clients
pub mod plugin;

/// DAO-level client
pub mod dao;
