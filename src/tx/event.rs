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

use ethers::{
    abi::{Event, Log as DecodedLog, RawLog, Token},
    types::{Log, TransactionReceipt},
};
use log::warn;

use crate::{Error, Result};

/// First log of the receipt whose topic matches the event signature.
pub fn find_log<'a>(receipt: &'a TransactionReceipt, event: &Event) -> Option<&'a Log> {
    let signature = event.signature();
    receipt.logs.iter().find(|log| log.topics.first() == Some(&signature))
}

/// Find and decode `event` in the receipt.
pub fn decode_event(receipt: &TransactionReceipt, event: &Event) -> Result<DecodedLog> {
    let Some(log) = find_log(receipt, event) else {
        return Err(Error::EventNotFound(event.name.clone()))
    };

    let raw = RawLog { topics: log.topics.clone(), data: log.data.to_vec() };
    Ok(event.parse_log(raw)?)
}

/// [`decode_event`], reporting a missing event as `on_missing`.
pub fn expect_event(
    receipt: &TransactionReceipt,
    event: &Event,
    on_missing: Error,
) -> Result<DecodedLog> {
    match decode_event(receipt, event) {
        Err(Error::EventNotFound(name)) => {
            warn!(
                target: "dao-sdk::tx",
                "Event {} missing from receipt of {:?}", name, receipt.transaction_hash,
            );
            Err(on_missing)
        }
        other => other,
    }
}

/// Take a named argument out of a decoded log.
pub fn take_param(log: &mut DecodedLog, name: &str) -> Result<Token> {
    match log.params.iter().position(|p| p.name == name) {
        Some(i) => Ok(log.params.swap_remove(i).value),
        None => Err(Error::AbiError(format!("Missing event argument {}", name))),
    }
}
