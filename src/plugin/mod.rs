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

//! Governance plugin clients.
//!
//! Addresslist and token voting share the majority voting protocol and
//! implement [`MajorityVotingPlugin`]. The multisig plugin has its own
//! client. Operations changing on-chain state return a [`StepStream`],
//! every validation they make happens before the stream is returned.

use std::sync::Arc;

use ethers::{
    abi::{ParamType, Token},
    types::{Address, TransactionReceipt, TxHash, U256},
};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    abi::{
        decode_bool_return, encode_call, expect_address, expect_array, expect_tuple, expect_uint,
        matches_selector, CAN_EXECUTE, EXECUTE, PROPOSAL_CREATED,
    },
    context::Context,
    indexer::query_entity,
    proposal::{
        assemble::{RawAccount, RATIO_DIGITS},
        DaoAction, ProposalId, ProposalStatus,
    },
    tx::{
        event::{expect_event, take_param},
        estimate_fee, static_call, submit_call, ContractCall, GasFeeEstimation, StepStream,
    },
    util::{
        address::{is_address, parse_address, to_indexer_address},
        parse::{bool_array_to_bitmap, decode_ratio, encode_ratio},
    },
    Error, Result,
};

/// Shared majority voting protocol
pub mod majority;
pub use majority::{
    CanVoteParams, CreateMajorityVotingProposalParams, MajorityVotingPlugin, VoteProposalParams,
};

/// Addresslist voting plugin client
pub mod addresslist;
pub use addresslist::AddresslistVotingClient;

/// Token voting plugin client
pub mod token;
pub use token::TokenVotingClient;

/// Multisig plugin client
pub mod multisig;
pub use multisig::MultisigClient;

/// Plugin installation through the plugin setup processor
pub mod installation;

/// Indexer queries of every plugin
pub mod queries;

/// Steps of a proposal creation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalCreationStep {
    Creating { tx_hash: TxHash },
    Done { proposal_id: ProposalId },
}

/// Steps of a vote
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteProposalStep {
    Voting { tx_hash: TxHash },
    Done,
}

/// Steps of a proposal execution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteProposalStep {
    Executing { tx_hash: TxHash },
    Done,
}

/// How votes are counted by a majority voting plugin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VotingMode {
    #[default]
    Standard,
    EarlyExecution,
    VoteReplacement,
}

impl VotingMode {
    pub fn to_contract(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::EarlyExecution => 1,
            Self::VoteReplacement => 2,
        }
    }

    pub fn from_contract(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Standard),
            1 => Ok(Self::EarlyExecution),
            2 => Ok(Self::VoteReplacement),
            _ => Err(Error::InvalidVotingMode),
        }
    }

    /// Parse the indexer representation.
    pub fn from_indexer(value: &str) -> Result<Self> {
        match value {
            "Standard" => Ok(Self::Standard),
            "EarlyExecution" => Ok(Self::EarlyExecution),
            "VoteReplacement" => Ok(Self::VoteReplacement),
            _ => Err(Error::InvalidVotingMode),
        }
    }
}

/// Settings of a majority voting plugin.
///
/// A `min_duration` below one hour is rejected by the contract, it is
/// passed through as given.
#[derive(Clone, Debug, PartialEq)]
pub struct VotingSettings {
    /// Float between 0 and 1
    pub support_threshold: f64,
    /// Float between 0 and 1
    pub min_participation: f64,
    /// Seconds
    pub min_duration: u64,
    pub min_proposer_voting_power: U256,
    pub voting_mode: VotingMode,
}

impl VotingSettings {
    /// `(uint8 votingMode, uint32 supportThreshold, uint32 minParticipation,
    /// uint64 minDuration, uint256 minProposerVotingPower)`
    pub fn to_token(&self) -> Result<Token> {
        Ok(Token::Tuple(vec![
            Token::Uint(self.voting_mode.to_contract().into()),
            Token::Uint(encode_ratio(self.support_threshold, RATIO_DIGITS)?.into()),
            Token::Uint(encode_ratio(self.min_participation, RATIO_DIGITS)?.into()),
            Token::Uint(self.min_duration.into()),
            Token::Uint(self.min_proposer_voting_power),
        ]))
    }

    pub fn from_token(token: Token) -> Result<Self> {
        let fields: [Token; 5] = expect_tuple(token)?
            .try_into()
            .map_err(|_| Error::AbiError("Malformed voting settings tuple".to_string()))?;
        let [voting_mode, support_threshold, min_participation, min_duration, power] = fields;

        let voting_mode =
            u8::try_from(expect_uint(voting_mode)?).map_err(|_| Error::InvalidVotingMode)?;
        let support_threshold = expect_uint(support_threshold)?;
        let min_participation = expect_uint(min_participation)?;

        Ok(Self {
            voting_mode: VotingMode::from_contract(voting_mode)?,
            support_threshold: decode_ratio(support_threshold.low_u64(), RATIO_DIGITS)?,
            min_participation: decode_ratio(min_participation.low_u64(), RATIO_DIGITS)?,
            min_duration: expect_uint(min_duration)?.low_u64(),
            min_proposer_voting_power: expect_uint(power)?,
        })
    }
}

/// Payload handed to the DAO factory so a plugin is installed and set up
/// together with a new DAO
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInstallItem {
    /// Plugin repository
    pub id: Address,
    /// ABI encoded initialization parameters
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProposalSortBy {
    #[default]
    CreatedAt,
    Votes,
}

impl ProposalSortBy {
    fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Votes => "votes",
        }
    }
}

/// Proposal list query. Defaults to the first 10 proposals of every DAO,
/// oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalQueryParams {
    pub dao_address_or_ens: Option<String>,
    pub status: Option<ProposalStatus>,
    pub skip: u32,
    pub limit: u32,
    pub direction: SortDirection,
    pub sort_by: ProposalSortBy,
}

impl Default for ProposalQueryParams {
    fn default() -> Self {
        Self {
            dao_address_or_ens: None,
            status: None,
            skip: 0,
            limit: 10,
            direction: SortDirection::Asc,
            sort_by: ProposalSortBy::CreatedAt,
        }
    }
}

impl ProposalQueryParams {
    pub(crate) fn variables(&self, filter: Value) -> Value {
        json!({
            "where": filter,
            "limit": self.limit,
            "skip": self.skip,
            "direction": self.direction.as_str(),
            "sortBy": self.sort_by.as_str(),
        })
    }
}

/// Bitmap of the actions allowed to fail. Checked before anything is sent.
pub(crate) fn allow_failure_map(actions: &[DaoAction], fail_safe: Option<&[bool]>) -> Result<U256> {
    match fail_safe {
        None => Ok(U256::zero()),
        Some(flags) if flags.len() != actions.len() => Err(Error::ActionsMismatch),
        Some(flags) => bool_array_to_bitmap(flags),
    }
}

pub(crate) fn actions_token(actions: &[DaoAction]) -> Token {
    Token::Array(actions.iter().map(DaoAction::to_token).collect())
}

/// Resolve an address or an ENS name into an address.
pub(crate) async fn resolve_address(ctx: &Context, address_or_ens: &str) -> Result<Address> {
    if is_address(address_or_ens) {
        return parse_address(address_or_ens)
    }

    let web3 = ctx.web3().map_err(|_| Error::NoProvider)?;
    if !web3.is_up().await {
        return Err(Error::NoProvider)
    }

    match web3.resolve_name(address_or_ens).await? {
        Some(address) => {
            debug!(target: "dao-sdk::plugin", "Resolved {} to {:?}", address_or_ens, address);
            Ok(address)
        }
        None => Err(Error::InvalidAddressOrEns),
    }
}

/// Base `where` clause of proposal list queries.
pub(crate) async fn dao_filter(ctx: &Context, dao: Option<&str>) -> Result<Map<String, Value>> {
    let mut filter = Map::new();
    if let Some(dao) = dao {
        let address = resolve_address(ctx, dao).await?;
        filter.insert("dao".to_string(), json!(to_indexer_address(&address)));
    }
    Ok(filter)
}

/// Terminal step of a proposal creation, read out of `ProposalCreated`.
pub(crate) fn proposal_created(
    plugin_address: Address,
    receipt: &TransactionReceipt,
) -> Result<ProposalCreationStep> {
    let mut log = expect_event(receipt, &PROPOSAL_CREATED, Error::ProposalCreationFailed)?;
    let id = expect_uint(take_param(&mut log, "proposalId")?)?;
    let local_id = u64::try_from(id).map_err(|_| Error::ProposalCreationFailed)?;
    Ok(ProposalCreationStep::Done { proposal_id: ProposalId::new(plugin_address, local_id) })
}

pub(crate) fn execute_call(proposal_id: &str) -> Result<ContractCall> {
    let id = ProposalId::decode(proposal_id)?;
    let data = encode_call(EXECUTE, &[Token::Uint(id.local_id().into())]);
    Ok(ContractCall::new(id.plugin_address(), data))
}

/// Execute a passed proposal of any plugin.
pub(crate) fn execute_proposal(
    ctx: &Context,
    proposal_id: &str,
) -> Result<StepStream<ExecuteProposalStep>> {
    let call = execute_call(proposal_id)?;
    let (web3, signer) = ctx.signer()?;

    Ok(submit_call(
        Arc::clone(web3),
        signer,
        call,
        |tx_hash| ExecuteProposalStep::Executing { tx_hash },
        |_| Ok(ExecuteProposalStep::Done),
    ))
}

pub(crate) async fn can_execute(ctx: &Context, proposal_id: &str) -> Result<bool> {
    let id = ProposalId::decode(proposal_id)?;
    let web3 = ctx.web3()?;
    let data = encode_call(CAN_EXECUTE, &[Token::Uint(id.local_id().into())]);
    let call = ContractCall::new(id.plugin_address(), data);
    let ret = static_call(web3.as_ref(), web3.signer_address(), &call).await?;
    decode_bool_return(&ret)
}

/// Fee estimation of `call` from the connected signer.
pub(crate) async fn estimate(ctx: &Context, call: &ContractCall) -> Result<GasFeeEstimation> {
    let (web3, signer) = ctx.signer()?;
    estimate_fee(web3.as_ref(), signer, call).await
}

/// Decode an `(address[])` argument list.
pub(crate) fn decode_address_list(mut tokens: Vec<Token>) -> Result<Vec<Address>> {
    if tokens.len() != 1 {
        return Err(Error::AbiError("Expected a single address list".to_string()))
    }

    expect_array(tokens.remove(0))?
        .into_iter()
        .map(expect_address)
        .collect()
}

pub(crate) fn address_array() -> ParamType {
    ParamType::Array(Box::new(ParamType::Address))
}

/// DAO action calling an `(address[])` function of a plugin.
pub(crate) fn address_list_action(
    signature: &str,
    plugin_address: Address,
    members: &[Address],
) -> DaoAction {
    let members = Token::Array(members.iter().copied().map(Token::Address).collect());
    DaoAction::new(plugin_address, U256::zero(), encode_call(signature, &[members]))
}

/// First of `signatures` whose selector `data` starts with
pub(crate) fn find_interface(signatures: &[&'static str], data: &[u8]) -> Option<&'static str> {
    signatures.iter().copied().find(|signature| matches_selector(signature, data))
}

#[derive(Deserialize)]
struct RawMembersPlugin {
    members: Vec<RawAccount>,
}

/// Members listed by an addresslist or multisig plugin.
pub(crate) async fn plugin_members(
    ctx: &Context,
    query: &str,
    field: &str,
    plugin_address: &str,
) -> Result<Vec<Address>> {
    let address = parse_address(plugin_address)?;
    let plugin: Option<RawMembersPlugin> = query_entity(
        ctx.indexer()?.as_ref(),
        query,
        field,
        json!({ "address": to_indexer_address(&address) }),
    )
    .await?;

    let Some(plugin) = plugin else { return Ok(vec![]) };
    plugin.members.iter().map(|m| parse_address(&m.address)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_modes() -> Result<()> {
        assert_eq!(VotingMode::Standard.to_contract(), 0);
        assert_eq!(VotingMode::EarlyExecution.to_contract(), 1);
        assert_eq!(VotingMode::VoteReplacement.to_contract(), 2);
        for mode in [VotingMode::Standard, VotingMode::EarlyExecution, VotingMode::VoteReplacement] {
            assert_eq!(VotingMode::from_contract(mode.to_contract())?, mode);
        }
        assert!(matches!(VotingMode::from_contract(3), Err(Error::InvalidVotingMode)));
        assert!(matches!(VotingMode::from_indexer("Quadratic"), Err(Error::InvalidVotingMode)));
        assert_eq!(VotingMode::from_indexer("EarlyExecution")?, VotingMode::EarlyExecution);
        Ok(())
    }

    #[test]
    fn settings_tokens() -> Result<()> {
        let settings = VotingSettings {
            support_threshold: 0.5,
            min_participation: 0.25,
            min_duration: 3600,
            min_proposer_voting_power: U256::from(1),
            voting_mode: VotingMode::EarlyExecution,
        };

        let token = settings.to_token()?;
        assert_eq!(
            token,
            Token::Tuple(vec![
                Token::Uint(1.into()),
                Token::Uint(500_000.into()),
                Token::Uint(250_000.into()),
                Token::Uint(3600.into()),
                Token::Uint(1.into()),
            ])
        );
        assert_eq!(VotingSettings::from_token(token)?, settings);

        // Below one hour goes through untouched
        let short = VotingSettings { min_duration: 60, ..settings };
        assert_eq!(VotingSettings::from_token(short.to_token()?)?.min_duration, 60);

        let bad = VotingSettings { support_threshold: 1.5, ..short };
        assert!(matches!(bad.to_token(), Err(Error::InvalidRatio(_))));
        Ok(())
    }

    #[test]
    fn failure_maps() -> Result<()> {
        let action = DaoAction::new(Address::zero(), U256::zero(), vec![]);
        let actions = vec![action.clone(), action];

        assert_eq!(allow_failure_map(&actions, None)?, U256::zero());
        assert_eq!(allow_failure_map(&actions, Some(&[false, true]))?, U256::from(2));
        assert!(matches!(allow_failure_map(&actions, Some(&[true])), Err(Error::ActionsMismatch)));
        assert!(matches!(allow_failure_map(&[], Some(&[true])), Err(Error::ActionsMismatch)));
        Ok(())
    }

    #[test]
    fn query_variables() {
        let params = ProposalQueryParams::default();
        let vars = params.variables(json!({}));
        assert_eq!(
            vars,
            json!({ "where": {}, "limit": 10, "skip": 0, "direction": "asc", "sortBy": "createdAt" })
        );
    }
}
