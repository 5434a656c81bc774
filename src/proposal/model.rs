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
    abi::Token,
    types::{Address, TxHash, U256},
};
use num_bigint::BigUint;

use super::{
    id::ProposalId,
    metadata::{ProposalMetadata, ProposalMetadataSummary},
    status::ProposalStatus,
};
use crate::{
    abi::{expect_address, expect_tuple, expect_uint},
    util::time::Timestamp,
    Error, Result,
};

/// Action executed by the DAO when a proposal passes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoAction {
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl DaoAction {
    pub fn new(to: Address, value: U256, data: Vec<u8>) -> Self {
        Self { to, value, data }
    }

    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.to),
            Token::Uint(self.value),
            Token::Bytes(self.data.clone()),
        ])
    }

    pub fn from_token(token: Token) -> Result<Self> {
        let mut fields = expect_tuple(token)?.into_iter();
        let (Some(to), Some(value), Some(data)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::AbiError("Malformed action tuple".to_string()))
        };

        let data = data.into_bytes().ok_or_else(|| Error::AbiError("Expected bytes".to_string()))?;
        Ok(Self { to: expect_address(to)?, value: expect_uint(value)?, data })
    }
}

/// Option picked by a voter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Abstain = 1,
    Yes = 2,
    No = 3,
}

impl VoteValue {
    pub fn to_contract(self) -> u8 {
        self as u8
    }

    pub fn from_contract(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Abstain),
            2 => Ok(Self::Yes),
            3 => Ok(Self::No),
            _ => Err(Error::InvalidVoteValue),
        }
    }

    /// Parse the indexer representation.
    pub fn from_indexer(value: &str) -> Result<Self> {
        match value {
            "Abstain" => Ok(Self::Abstain),
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            _ => Err(Error::InvalidVoteValue),
        }
    }
}

/// DAO a proposal belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoRef {
    pub address: Address,
    pub name: String,
}

/// Aggregated votes of a proposal
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub yes: BigUint,
    pub no: BigUint,
    pub abstain: BigUint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalVote {
    pub address: Address,
    pub vote: VoteValue,
    pub vote_replaced: bool,
    pub weight: BigUint,
}

/// Voting configuration a proposal was created under
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProposalSettings {
    /// Float between 0 and 1
    pub support_threshold: f64,
    /// Float between 0 and 1
    pub min_participation: f64,
    /// Seconds
    pub duration: u64,
}

/// Token a token voting plugin counts votes with
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenDetails {
    Erc20 { address: Address, name: String, symbol: String, decimals: u8 },
    Erc721 { address: Address, name: String, symbol: String },
}

impl TokenDetails {
    pub fn address(&self) -> Address {
        match self {
            Self::Erc20 { address, .. } | Self::Erc721 { address, .. } => *address,
        }
    }
}

/// Full view of a majority voting proposal
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalSnapshot {
    pub id: ProposalId,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadata,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub creation_date: Timestamp,
    pub creation_block_number: u64,
    pub execution_date: Option<Timestamp>,
    pub execution_block_number: Option<u64>,
    pub execution_tx_hash: Option<TxHash>,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub result: VoteTally,
    pub settings: ProposalSettings,
    pub votes: Vec<ProposalVote>,
    pub total_voting_weight: BigUint,
    pub used_voting_weight: BigUint,
    /// Only set for token voting proposals
    pub token: Option<TokenDetails>,
}

/// Short view of a majority voting proposal
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalListItem {
    pub id: ProposalId,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadataSummary,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: ProposalStatus,
    pub result: VoteTally,
    pub settings: ProposalSettings,
    pub total_voting_weight: BigUint,
    pub votes: Vec<ProposalVote>,
    pub token: Option<TokenDetails>,
}

/// Full view of a multisig proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigProposal {
    pub id: ProposalId,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadata,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub creation_date: Timestamp,
    pub creation_block_number: u64,
    pub execution_date: Option<Timestamp>,
    pub execution_block_number: Option<u64>,
    pub execution_tx_hash: Option<TxHash>,
    pub actions: Vec<DaoAction>,
    pub status: ProposalStatus,
    pub min_approvals: u16,
    pub approvals: Vec<Address>,
}

/// Short view of a multisig proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigProposalListItem {
    pub id: ProposalId,
    pub dao: DaoRef,
    pub creator_address: Address,
    pub metadata: ProposalMetadataSummary,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub status: ProposalStatus,
    pub min_approvals: u16,
    pub approvals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_values() -> Result<()> {
        for vote in [VoteValue::Abstain, VoteValue::Yes, VoteValue::No] {
            assert_eq!(VoteValue::from_contract(vote.to_contract())?, vote);
        }
        assert_eq!(VoteValue::Yes.to_contract(), 2);
        assert_eq!(VoteValue::from_indexer("No")?, VoteValue::No);
        assert!(VoteValue::from_contract(0).is_err());
        assert!(VoteValue::from_indexer("yes").is_err());
        Ok(())
    }

    #[test]
    fn action_tokens() -> Result<()> {
        let action = DaoAction::new(Address::from_low_u64_be(1), U256::from(5), vec![0xde, 0xad]);
        assert_eq!(DaoAction::from_token(action.to_token())?, action);
        assert!(DaoAction::from_token(Token::Bool(true)).is_err());
        Ok(())
    }
}
