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

//! Fragments of the governance contracts interfaces. Calls are encoded
//! from their canonical signature, events are matched on their topic.

use ethers::{
    abi::{decode, encode, Event, EventParam, ParamType, Token},
    types::{Address, U256},
    utils::id,
};
use lazy_static::lazy_static;

use crate::{Error, Result};

// Majority voting plugins (addresslist and token voting)
pub const CREATE_MAJORITY_PROPOSAL: &str =
    "createProposal(bytes,(address,uint256,bytes)[],uint256,uint64,uint64,uint8,bool)";
pub const VOTE: &str = "vote(uint256,uint8,bool)";
pub const CAN_VOTE: &str = "canVote(uint256,address,uint8)";
pub const UPDATE_VOTING_SETTINGS: &str =
    "updateVotingSettings((uint8,uint32,uint32,uint64,uint256))";

// Multisig plugin
pub const CREATE_MULTISIG_PROPOSAL: &str =
    "createProposal(bytes,(address,uint256,bytes)[],uint256,bool,bool,uint64,uint64)";
pub const APPROVE: &str = "approve(uint256,bool)";
pub const CAN_APPROVE: &str = "canApprove(uint256,address)";
pub const UPDATE_MULTISIG_SETTINGS: &str = "updateMultisigSettings((bool,uint16))";

// Shared by every plugin
pub const EXECUTE: &str = "execute(uint256)";
pub const CAN_EXECUTE: &str = "canExecute(uint256)";
pub const ADD_ADDRESSES: &str = "addAddresses(address[])";
pub const REMOVE_ADDRESSES: &str = "removeAddresses(address[])";

// DAO factory and DAO
pub const CREATE_DAO: &str =
    "createDao((address,string,string,bytes),(((uint8,uint16),address),bytes)[])";
pub const DEPOSIT: &str = "deposit(address,uint256,string)";
pub const HAS_PERMISSION: &str = "hasPermission(address,address,bytes32,bytes)";

// DAO permission manager
pub const GRANT: &str = "grant(address,address,bytes32)";
pub const REVOKE: &str = "revoke(address,address,bytes32)";

// ERC20
pub const MINT: &str = "mint(address,uint256)";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";
pub const ERC20_ALLOWANCE: &str = "allowance(address,address)";

// Plugin setup processor and plugin repositories
pub const PREPARE_INSTALLATION: &str =
    "prepareInstallation(address,(((uint8,uint16),address),bytes))";
pub const PREPARE_UNINSTALLATION: &str =
    "prepareUninstallation(address,(((uint8,uint16),address),(address,address[],bytes)))";
pub const APPLY_INSTALLATION: &str = "applyInstallation(address,(((uint8,uint16),address),address,(uint8,address,address,address,bytes32)[],bytes32))";
pub const APPLY_UNINSTALLATION: &str = "applyUninstallation(address,(address,((uint8,uint16),address),(uint8,address,address,address,bytes32)[]))";
pub const LATEST_RELEASE: &str = "latestRelease()";
pub const GET_LATEST_VERSION: &str = "getLatestVersion(uint8)";

/// `(address to, uint256 value, bytes data)`
pub fn action_param() -> ParamType {
    ParamType::Tuple(vec![ParamType::Address, ParamType::Uint(256), ParamType::Bytes])
}

/// `(uint8 release, uint16 build)`
pub fn version_tag_param() -> ParamType {
    ParamType::Tuple(vec![ParamType::Uint(8), ParamType::Uint(16)])
}

/// `(uint8 operation, address where, address who, address condition, bytes32 permissionId)`
pub fn permission_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Address,
        ParamType::Address,
        ParamType::Address,
        ParamType::FixedBytes(32),
    ])
}

/// `(uint8 votingMode, uint32 supportThreshold, uint32 minParticipation,
/// uint64 minDuration, uint256 minProposerVotingPower)`
pub fn voting_settings_param() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Uint(32),
        ParamType::Uint(32),
        ParamType::Uint(64),
        ParamType::Uint(256),
    ])
}

/// `(bool onlyListed, uint16 minApprovals)`
pub fn multisig_settings_param() -> ParamType {
    ParamType::Tuple(vec![ParamType::Bool, ParamType::Uint(16)])
}

fn event(name: &str, inputs: &[(&str, ParamType, bool)]) -> Event {
    Event {
        name: name.to_string(),
        inputs: inputs
            .iter()
            .map(|(name, kind, indexed)| EventParam {
                name: name.to_string(),
                kind: kind.clone(),
                indexed: *indexed,
            })
            .collect(),
        anonymous: false,
    }
}

lazy_static! {
    pub static ref PROPOSAL_CREATED: Event = event(
        "ProposalCreated",
        &[
            ("proposalId", ParamType::Uint(256), true),
            ("creator", ParamType::Address, true),
            ("startDate", ParamType::Uint(64), false),
            ("endDate", ParamType::Uint(64), false),
            ("metadata", ParamType::Bytes, false),
            ("actions", ParamType::Array(Box::new(action_param())), false),
            ("allowFailureMap", ParamType::Uint(256), false),
        ],
    );

    pub static ref DAO_REGISTERED: Event = event(
        "DAORegistered",
        &[
            ("dao", ParamType::Address, true),
            ("creator", ParamType::Address, true),
            ("subdomain", ParamType::String, false),
        ],
    );

    pub static ref DEPOSITED: Event = event(
        "Deposited",
        &[
            ("sender", ParamType::Address, true),
            ("token", ParamType::Address, true),
            ("amount", ParamType::Uint(256), false),
            ("_reference", ParamType::String, false),
        ],
    );

    pub static ref ERC20_APPROVAL: Event = event(
        "Approval",
        &[
            ("owner", ParamType::Address, true),
            ("spender", ParamType::Address, true),
            ("value", ParamType::Uint(256), false),
        ],
    );

    pub static ref INSTALLATION_PREPARED: Event = event(
        "InstallationPrepared",
        &[
            ("sender", ParamType::Address, true),
            ("dao", ParamType::Address, true),
            ("preparedSetupId", ParamType::FixedBytes(32), false),
            ("pluginSetupRepo", ParamType::Address, true),
            ("versionTag", version_tag_param(), false),
            ("data", ParamType::Bytes, false),
            ("plugin", ParamType::Address, false),
            (
                "preparedSetupData",
                ParamType::Tuple(vec![
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Array(Box::new(permission_param())),
                ]),
                false,
            ),
        ],
    );

    pub static ref UNINSTALLATION_PREPARED: Event = event(
        "UninstallationPrepared",
        &[
            ("sender", ParamType::Address, true),
            ("dao", ParamType::Address, true),
            ("preparedSetupId", ParamType::FixedBytes(32), false),
            ("pluginSetupRepo", ParamType::Address, true),
            ("versionTag", version_tag_param(), false),
            (
                "setupPayload",
                ParamType::Tuple(vec![
                    ParamType::Address,
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Bytes,
                ]),
                false,
            ),
            ("permissions", ParamType::Array(Box::new(permission_param())), false),
        ],
    );
}

/// Encode a call to the function with the given canonical signature.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = id(signature).to_vec();
    data.extend(encode(args));
    data
}

/// Decode call data produced for `signature`, checking its selector.
pub fn decode_call(signature: &str, params: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    if data.len() < 4 || data[..4] != id(signature) {
        return Err(Error::AbiError(format!("Call data does not match {}", signature)))
    }

    Ok(decode(params, &data[4..])?)
}

/// Whether `data` calls the function with the given signature.
pub fn matches_selector(signature: &str, data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == id(signature)
}

// Token accessors, failing on unexpected shapes

pub fn expect_address(token: Token) -> Result<Address> {
    token.into_address().ok_or_else(|| Error::AbiError("Expected an address".to_string()))
}

pub fn expect_uint(token: Token) -> Result<U256> {
    token.into_uint().ok_or_else(|| Error::AbiError("Expected an unsigned integer".to_string()))
}

pub fn expect_bool(token: Token) -> Result<bool> {
    token.into_bool().ok_or_else(|| Error::AbiError("Expected a boolean".to_string()))
}

pub fn expect_tuple(token: Token) -> Result<Vec<Token>> {
    token.into_tuple().ok_or_else(|| Error::AbiError("Expected a tuple".to_string()))
}

pub fn expect_array(token: Token) -> Result<Vec<Token>> {
    token.into_array().ok_or_else(|| Error::AbiError("Expected an array".to_string()))
}

pub fn expect_fixed_bytes(token: Token) -> Result<Vec<u8>> {
    token.into_fixed_bytes().ok_or_else(|| Error::AbiError("Expected fixed bytes".to_string()))
}

/// Decode a `uint256` returned by a read-only call.
pub fn decode_uint_return(data: &[u8]) -> Result<U256> {
    let mut tokens = decode(&[ParamType::Uint(256)], data)?;
    expect_uint(tokens.remove(0))
}

/// Decode a `bool` returned by a read-only call.
pub fn decode_bool_return(data: &[u8]) -> Result<bool> {
    let mut tokens = decode(&[ParamType::Bool], data)?;
    expect_bool(tokens.remove(0))
}
