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

use std::{fmt, str::FromStr};

use ethers::{types::Address, utils::to_checksum};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    util::address::{parse_address, to_indexer_address},
    Error, Result,
};

lazy_static! {
    static ref PROPOSAL_ID_REGEX: Regex =
        Regex::new(r"^0x[0-9A-Fa-f]{40}_0x[0-9A-Fa-f]+$").unwrap();
}

/// Globally unique proposal identifier: the plugin contract that owns the
/// proposal plus the proposal index inside that plugin.
///
/// Displays in its compact form `<checksummed address>_0x<hex index>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProposalId {
    plugin_address: Address,
    local_id: u64,
}

impl ProposalId {
    pub fn new(plugin_address: Address, local_id: u64) -> Self {
        Self { plugin_address, local_id }
    }

    /// Build an id out of a textual plugin address.
    pub fn encode(plugin_address: &str, local_id: u64) -> Result<Self> {
        Ok(Self::new(parse_address(plugin_address)?, local_id))
    }

    /// Parse either the compact or the extended form.
    pub fn decode(id: &str) -> Result<Self> {
        if !PROPOSAL_ID_REGEX.is_match(id) {
            return Err(Error::InvalidProposalId(id.to_string()))
        }

        // The regex guarantees the split and the hex digits
        let (address, index) = id.split_at(42);
        let plugin_address =
            Address::from_str(address).map_err(|_| Error::InvalidProposalId(id.to_string()))?;
        let local_id = u64::from_str_radix(&index[3..], 16)
            .map_err(|_| Error::InvalidProposalId(id.to_string()))?;

        Ok(Self::new(plugin_address, local_id))
    }

    pub fn is_valid(id: &str) -> bool {
        Self::decode(id).is_ok()
    }

    pub fn plugin_address(&self) -> Address {
        self.plugin_address
    }

    pub fn local_id(&self) -> u64 {
        self.local_id
    }

    /// Form used by the indexer as entity id: lower-case address and the
    /// index zero-padded to 32 bytes.
    pub fn to_extended(&self) -> String {
        format!("{}_0x{:064x}", to_indexer_address(&self.plugin_address), self.local_id)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_0x{:x}", to_checksum(&self.plugin_address, None), self.local_id)
    }
}

impl FromStr for ProposalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Turn an indexer entity id into the compact display form.
pub fn compact_proposal_id(extended: &str) -> Result<String> {
    Ok(ProposalId::decode(extended)?.to_string())
}
