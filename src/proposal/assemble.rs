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

//! Normalization of raw indexer records into client-facing proposals.
//!
//! Indexer records carry big integers and timestamps as base 10 strings.
//! Everything is parsed here, and the metadata is resolved by the caller
//! beforehand, so assembling never touches the network.

use std::str::FromStr;

use ethers::types::{Address, TxHash, U256};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Deserialize;

use super::{
    id::ProposalId,
    metadata::ProposalMetadata,
    model::{
        DaoAction, DaoRef, MultisigProposal, MultisigProposalListItem, ProposalListItem,
        ProposalSettings, ProposalSnapshot, ProposalVote, TokenDetails, VoteTally, VoteValue,
    },
    status::{compute_status, StatusInput},
};
use crate::{
    util::{
        address::parse_address,
        parse::{decode_ratio, ratio_of, biguint_to_u64_saturating},
        time::Timestamp,
    },
    Error, Result,
};

/// Ratios are stored on-chain with 6 decimal digits
pub const RATIO_DIGITS: u32 = 6;

#[derive(Clone, Debug, Deserialize)]
pub struct RawDao {
    pub id: String,
    #[serde(default)]
    pub subdomain: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawAction {
    pub to: String,
    pub value: String,
    pub data: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawAccount {
    pub address: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVoter {
    pub voter: RawAccount,
    pub vote_option: String,
    #[serde(default)]
    pub vote_replaced: bool,
    /// Absent for addresslist voting, where every member weighs one
    #[serde(default)]
    pub voting_power: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawToken {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawTokenPlugin {
    pub token: RawToken,
}

/// Addresslist or token voting proposal as returned by the indexer.
/// List queries leave the detail fields out.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMajorityProposal {
    pub id: String,
    pub dao: RawDao,
    pub creator: String,
    #[serde(default)]
    pub metadata: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub creation_block_number: Option<String>,
    #[serde(default)]
    pub execution_date: Option<String>,
    #[serde(default)]
    pub execution_block_number: Option<String>,
    #[serde(default)]
    pub execution_tx_hash: Option<String>,
    #[serde(default)]
    pub actions: Vec<RawAction>,
    #[serde(default)]
    pub yes: Option<String>,
    #[serde(default)]
    pub no: Option<String>,
    #[serde(default)]
    pub abstain: Option<String>,
    pub support_threshold: String,
    pub min_voting_power: String,
    pub total_voting_power: String,
    pub executed: bool,
    #[serde(default)]
    pub potentially_executable: bool,
    #[serde(default)]
    pub early_executable: Option<bool>,
    #[serde(default)]
    pub voters: Vec<RawVoter>,
    #[serde(default)]
    pub plugin: Option<RawTokenPlugin>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawApprover {
    pub approver: RawAccount,
}

/// Multisig proposal as returned by the indexer
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMultisigProposal {
    pub id: String,
    pub dao: RawDao,
    pub creator: String,
    #[serde(default)]
    pub metadata: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub creation_block_number: Option<String>,
    #[serde(default)]
    pub execution_date: Option<String>,
    #[serde(default)]
    pub execution_block_number: Option<String>,
    #[serde(default)]
    pub execution_tx_hash: Option<String>,
    #[serde(default)]
    pub actions: Vec<RawAction>,
    pub executed: bool,
    #[serde(default)]
    pub potentially_executable: bool,
    pub min_approvals: u16,
    #[serde(default)]
    pub approvers: Vec<RawApprover>,
}

pub(crate) fn parse_timestamp(s: &str) -> Result<Timestamp> {
    Ok(Timestamp(s.parse()?))
}

fn parse_opt_timestamp(s: Option<&String>) -> Result<Option<Timestamp>> {
    s.filter(|s| !s.is_empty()).map(|s| parse_timestamp(s)).transpose()
}

fn parse_opt_u64(s: Option<&String>) -> Result<Option<u64>> {
    s.filter(|s| !s.is_empty()).map(|s| Ok(s.parse()?)).transpose()
}

pub(crate) fn parse_big(s: &str) -> Result<BigUint> {
    Ok(BigUint::from_str(s)?)
}

fn parse_opt_big(s: Option<&String>) -> Result<BigUint> {
    match s {
        Some(s) if !s.is_empty() => parse_big(s),
        _ => Ok(BigUint::zero()),
    }
}

pub(crate) fn parse_tx_hash(s: Option<&String>) -> Result<Option<TxHash>> {
    s.filter(|s| !s.is_empty())
        .map(|s| TxHash::from_str(s).map_err(|e| Error::ParseFailed(format!("tx hash: {}", e))))
        .transpose()
}

fn parse_dao(dao: &RawDao) -> Result<DaoRef> {
    Ok(DaoRef { address: parse_address(&dao.id)?, name: dao.subdomain.clone() })
}

fn parse_action(action: &RawAction) -> Result<DaoAction> {
    let data = action.data.strip_prefix("0x").unwrap_or(&action.data);
    let data = hex::decode(data).map_err(|e| Error::ParseFailed(format!("action data: {}", e)))?;
    let value = U256::from_dec_str(&action.value)
        .map_err(|e| Error::ParseFailed(format!("action value: {}", e)))?;
    Ok(DaoAction { to: parse_address(&action.to)?, value, data })
}

fn parse_votes(voters: &[RawVoter]) -> Result<Vec<ProposalVote>> {
    voters
        .iter()
        .map(|v| {
            let weight = match &v.voting_power {
                Some(power) => parse_big(power)?,
                None => BigUint::from(1u32),
            };
            Ok(ProposalVote {
                address: parse_address(&v.voter.address)?,
                vote: VoteValue::from_indexer(&v.vote_option)?,
                vote_replaced: v.vote_replaced,
                weight,
            })
        })
        .collect()
}

pub(crate) fn parse_token(plugin: Option<&RawTokenPlugin>) -> Result<Option<TokenDetails>> {
    let Some(RawTokenPlugin { token }) = plugin else { return Ok(None) };

    let address = parse_address(&token.id)?;
    let (name, symbol) = (token.name.clone(), token.symbol.clone());
    match token.typename.as_str() {
        "ERC20Contract" => Ok(Some(TokenDetails::Erc20 {
            address,
            name,
            symbol,
            decimals: token.decimals.unwrap_or(18),
        })),
        "ERC721Contract" => Ok(Some(TokenDetails::Erc721 { address, name, symbol })),
        _ => Ok(None),
    }
}

impl RawMajorityProposal {
    fn status_input(&self) -> Result<StatusInput> {
        Ok(StatusInput {
            start_date: parse_timestamp(&self.start_date)?,
            end_date: parse_timestamp(&self.end_date)?,
            executed: self.executed,
            early_executable: self.early_executable,
            potentially_executable: self.potentially_executable,
        })
    }

    fn settings(&self, input: &StatusInput) -> Result<ProposalSettings> {
        let support = parse_big(&self.support_threshold)?;
        let min_voting_power = parse_big(&self.min_voting_power)?;
        let total_voting_power = parse_big(&self.total_voting_power)?;

        Ok(ProposalSettings {
            support_threshold: decode_ratio(biguint_to_u64_saturating(&support), RATIO_DIGITS)?,
            min_participation: ratio_of(&min_voting_power, &total_voting_power, RATIO_DIGITS)?,
            duration: input.start_date.seconds_until(&input.end_date),
        })
    }

    fn tally(&self) -> Result<VoteTally> {
        Ok(VoteTally {
            yes: parse_opt_big(self.yes.as_ref())?,
            no: parse_opt_big(self.no.as_ref())?,
            abstain: parse_opt_big(self.abstain.as_ref())?,
        })
    }
}

impl RawMultisigProposal {
    fn status_input(&self) -> Result<StatusInput> {
        Ok(StatusInput {
            start_date: parse_timestamp(&self.start_date)?,
            end_date: parse_timestamp(&self.end_date)?,
            executed: self.executed,
            early_executable: None,
            potentially_executable: self.potentially_executable,
        })
    }

    fn approvals(&self) -> Result<Vec<Address>> {
        self.approvers.iter().map(|a| parse_address(&a.approver.address)).collect()
    }
}

/// Assemble the full view of an addresslist or token voting proposal.
pub fn assemble_proposal(
    raw: &RawMajorityProposal,
    metadata: ProposalMetadata,
    now: Timestamp,
) -> Result<ProposalSnapshot> {
    let input = raw.status_input()?;
    let votes = parse_votes(&raw.voters)?;
    let used_voting_weight: BigUint = votes.iter().map(|v| &v.weight).sum();

    Ok(ProposalSnapshot {
        id: ProposalId::decode(&raw.id)?,
        dao: parse_dao(&raw.dao)?,
        creator_address: parse_address(&raw.creator)?,
        metadata,
        start_date: input.start_date,
        end_date: input.end_date,
        creation_date: parse_opt_timestamp(raw.created_at.as_ref())?.unwrap_or_default(),
        creation_block_number: parse_opt_u64(raw.creation_block_number.as_ref())?.unwrap_or(0),
        execution_date: parse_opt_timestamp(raw.execution_date.as_ref())?,
        execution_block_number: parse_opt_u64(raw.execution_block_number.as_ref())?,
        execution_tx_hash: parse_tx_hash(raw.execution_tx_hash.as_ref())?,
        actions: raw.actions.iter().map(parse_action).collect::<Result<_>>()?,
        status: compute_status(&input, now),
        result: raw.tally()?,
        settings: raw.settings(&input)?,
        votes,
        total_voting_weight: parse_big(&raw.total_voting_power)?,
        used_voting_weight,
        token: parse_token(raw.plugin.as_ref())?,
    })
}

/// Assemble the list view of an addresslist or token voting proposal.
pub fn assemble_proposal_list_item(
    raw: &RawMajorityProposal,
    metadata: ProposalMetadata,
    now: Timestamp,
) -> Result<ProposalListItem> {
    let input = raw.status_input()?;

    Ok(ProposalListItem {
        id: ProposalId::decode(&raw.id)?,
        dao: parse_dao(&raw.dao)?,
        creator_address: parse_address(&raw.creator)?,
        metadata: metadata.summary(),
        start_date: input.start_date,
        end_date: input.end_date,
        status: compute_status(&input, now),
        result: raw.tally()?,
        settings: raw.settings(&input)?,
        total_voting_weight: parse_big(&raw.total_voting_power)?,
        votes: parse_votes(&raw.voters)?,
        token: parse_token(raw.plugin.as_ref())?,
    })
}

/// Assemble the full view of a multisig proposal.
pub fn assemble_multisig_proposal(
    raw: &RawMultisigProposal,
    metadata: ProposalMetadata,
    now: Timestamp,
) -> Result<MultisigProposal> {
    let input = raw.status_input()?;

    Ok(MultisigProposal {
        id: ProposalId::decode(&raw.id)?,
        dao: parse_dao(&raw.dao)?,
        creator_address: parse_address(&raw.creator)?,
        metadata,
        start_date: input.start_date,
        end_date: input.end_date,
        creation_date: parse_opt_timestamp(raw.created_at.as_ref())?.unwrap_or_default(),
        creation_block_number: parse_opt_u64(raw.creation_block_number.as_ref())?.unwrap_or(0),
        execution_date: parse_opt_timestamp(raw.execution_date.as_ref())?,
        execution_block_number: parse_opt_u64(raw.execution_block_number.as_ref())?,
        execution_tx_hash: parse_tx_hash(raw.execution_tx_hash.as_ref())?,
        actions: raw.actions.iter().map(parse_action).collect::<Result<_>>()?,
        status: compute_status(&input, now),
        min_approvals: raw.min_approvals,
        approvals: raw.approvals()?,
    })
}

/// Assemble the list view of a multisig proposal.
pub fn assemble_multisig_list_item(
    raw: &RawMultisigProposal,
    metadata: ProposalMetadata,
    now: Timestamp,
) -> Result<MultisigProposalListItem> {
    let input = raw.status_input()?;

    Ok(MultisigProposalListItem {
        id: ProposalId::decode(&raw.id)?,
        dao: parse_dao(&raw.dao)?,
        creator_address: parse_address(&raw.creator)?,
        metadata: metadata.summary(),
        start_date: input.start_date,
        end_date: input.end_date,
        status: compute_status(&input, now),
        min_approvals: raw.min_approvals,
        approvals: raw.approvers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::status::ProposalStatus;
    use serde_json::json;

    fn raw_token_proposal() -> RawMajorityProposal {
        serde_json::from_value(json!({
            "id": "0x1111111111111111111111111111111111111111_0x0000000000000000000000000000000000000000000000000000000000000003",
            "dao": { "id": "0x2222222222222222222222222222222222222222", "subdomain": "builders" },
            "creator": "0x3333333333333333333333333333333333333333",
            "metadata": "ipfs://QmXhJ7o3ztd6pxVXMsFiBjWGHFJt8gNdeaLJWCJ6PXFbkz",
            "startDate": "1000",
            "endDate": "5000",
            "createdAt": "900",
            "creationBlockNumber": "12345",
            "executionDate": null,
            "executionBlockNumber": null,
            "executionTxHash": null,
            "actions": [
                { "to": "0x4444444444444444444444444444444444444444", "value": "10", "data": "0xdeadbeef" }
            ],
            "yes": "300000000000000000000",
            "no": "100",
            "abstain": null,
            "supportThreshold": "500000",
            "minVotingPower": "250",
            "totalVotingPower": "1000",
            "executed": false,
            "potentiallyExecutable": false,
            "earlyExecutable": false,
            "voters": [
                {
                    "voter": { "address": "0x5555555555555555555555555555555555555555" },
                    "voteOption": "Yes",
                    "voteReplaced": false,
                    "votingPower": "600"
                },
                {
                    "voter": { "address": "0x6666666666666666666666666666666666666666" },
                    "voteOption": "No",
                    "voteReplaced": true,
                    "votingPower": "100"
                }
            ],
            "plugin": {
                "token": {
                    "__typename": "ERC20Contract",
                    "id": "0x7777777777777777777777777777777777777777",
                    "name": "Builders",
                    "symbol": "BLD",
                    "decimals": 18
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn token_proposal() -> Result<()> {
        let raw = raw_token_proposal();
        let proposal = assemble_proposal(&raw, ProposalMetadata::empty(), Timestamp(2000))?;

        assert_eq!(proposal.id.to_string(), "0x1111111111111111111111111111111111111111_0x3");
        assert_eq!(proposal.dao.name, "builders");
        assert_eq!(proposal.status, ProposalStatus::Active);
        assert_eq!(proposal.metadata, ProposalMetadata::empty());
        assert_eq!(proposal.creation_date, Timestamp(900));
        assert_eq!(proposal.creation_block_number, 12345);
        assert_eq!(proposal.execution_date, None);
        assert_eq!(proposal.actions.len(), 1);
        assert_eq!(proposal.actions[0].value, U256::from(10));
        assert_eq!(proposal.actions[0].data, vec![0xde, 0xad, 0xbe, 0xef]);

        assert_eq!(proposal.result.yes, BigUint::from(300u32) * BigUint::from(10u32).pow(18));
        assert_eq!(proposal.result.no, BigUint::from(100u32));
        assert_eq!(proposal.result.abstain, BigUint::zero());

        assert_eq!(proposal.settings.support_threshold, 0.5);
        assert_eq!(proposal.settings.min_participation, 0.25);
        assert_eq!(proposal.settings.duration, 4000);

        assert_eq!(proposal.votes.len(), 2);
        assert_eq!(proposal.votes[1].vote, VoteValue::No);
        assert!(proposal.votes[1].vote_replaced);
        assert_eq!(proposal.used_voting_weight, BigUint::from(700u32));
        assert_eq!(proposal.total_voting_weight, BigUint::from(1000u32));
        assert!(matches!(proposal.token, Some(TokenDetails::Erc20 { decimals: 18, .. })));

        let later = assemble_proposal(&raw, ProposalMetadata::empty(), Timestamp(6000))?;
        assert_eq!(later.status, ProposalStatus::Defeated);
        Ok(())
    }

    #[test]
    fn list_item() -> Result<()> {
        let mut raw = raw_token_proposal();
        raw.potentially_executable = true;
        let item =
            assemble_proposal_list_item(&raw, ProposalMetadata::unavailable(), Timestamp(2000))?;

        assert_eq!(item.status, ProposalStatus::Succeeded);
        assert_eq!(item.metadata.title, ProposalMetadata::unavailable().title);
        assert_eq!(item.settings.duration, 4000);
        Ok(())
    }

    #[test]
    fn malformed_records() {
        let mut raw = raw_token_proposal();
        raw.start_date = "soon".to_string();
        assert!(assemble_proposal(&raw, ProposalMetadata::empty(), Timestamp(0)).is_err());

        let mut raw = raw_token_proposal();
        raw.id = "proposal-3".to_string();
        assert!(matches!(
            assemble_proposal(&raw, ProposalMetadata::empty(), Timestamp(0)),
            Err(Error::InvalidProposalId(_))
        ));

        let mut raw = raw_token_proposal();
        raw.voters[0].vote_option = "Maybe".to_string();
        assert!(assemble_proposal(&raw, ProposalMetadata::empty(), Timestamp(0)).is_err());
    }

    #[test]
    fn multisig_proposal() -> Result<()> {
        let raw: RawMultisigProposal = serde_json::from_value(json!({
            "id": "0x1111111111111111111111111111111111111111_0x1",
            "dao": { "id": "0x2222222222222222222222222222222222222222", "subdomain": "" },
            "creator": "0x3333333333333333333333333333333333333333",
            "startDate": "1000",
            "endDate": "2000",
            "executed": true,
            "executionDate": "1500",
            "executionBlockNumber": "99",
            "executionTxHash": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "minApprovals": 2,
            "approvers": [
                { "approver": { "address": "0x5555555555555555555555555555555555555555" } },
                { "approver": { "address": "0x6666666666666666666666666666666666666666" } }
            ]
        }))
        .unwrap();

        let proposal = assemble_multisig_proposal(&raw, ProposalMetadata::empty(), Timestamp(5000))?;
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert_eq!(proposal.execution_date, Some(Timestamp(1500)));
        assert_eq!(proposal.execution_block_number, Some(99));
        assert!(proposal.execution_tx_hash.is_some());
        assert_eq!(proposal.approvals.len(), 2);
        assert_eq!(proposal.creation_date, Timestamp(0));

        let item = assemble_multisig_list_item(&raw, ProposalMetadata::empty(), Timestamp(5000))?;
        assert_eq!(item.approvals, 2);
        assert_eq!(item.min_approvals, 2);
        Ok(())
    }
}
