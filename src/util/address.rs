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

use std::str::FromStr;

use ethers::{types::Address, utils::to_checksum};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

lazy_static! {
    static ref ADDRESS_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

/// Check that `addr` is a `0x` prefixed 20 byte hex address.
///
/// Single-case addresses (all lower or all upper) are accepted as-is,
/// mixed-case addresses must carry a valid EIP-55 checksum.
pub fn is_address(addr: &str) -> bool {
    if !ADDRESS_REGEX.is_match(addr) {
        return false
    }

    let hex = &addr[2..];
    if hex == hex.to_lowercase() || hex == hex.to_uppercase() {
        return true
    }

    match Address::from_str(addr) {
        Ok(parsed) => to_checksum(&parsed, None) == addr,
        Err(_) => false,
    }
}

/// Parse an address string, enforcing [`is_address`] rules.
pub fn parse_address(addr: &str) -> Result<Address> {
    if !is_address(addr) {
        return Err(Error::InvalidAddress)
    }

    Address::from_str(addr).map_err(|_| Error::InvalidAddress)
}

/// Lower-case hex form used by the indexer for entity ids.
pub fn to_indexer_address(addr: &Address) -> String {
    format!("{:#x}", addr)
}
