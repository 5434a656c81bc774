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

//! GraphQL queries sent to the indexer.

/// Queries of one majority voting plugin flavour
#[derive(Debug)]
pub struct MajorityQueries {
    pub proposal: &'static str,
    pub proposal_field: &'static str,
    pub proposals: &'static str,
    pub proposals_field: &'static str,
    pub settings: &'static str,
    pub settings_field: &'static str,
}

pub const ADDRESSLIST_VOTING: MajorityQueries = MajorityQueries {
    proposal: r#"
query AddresslistVotingProposal($proposalId: ID!) {
  addresslistVotingProposal(id: $proposalId) {
    id
    dao { id subdomain }
    creator
    metadata
    createdAt
    creationBlockNumber
    executionDate
    executionBlockNumber
    executionTxHash
    actions { to value data }
    yes abstain no
    supportThreshold
    minVotingPower
    totalVotingPower
    startDate
    endDate
    executed
    earlyExecutable
    potentiallyExecutable
    voters { voter { address } voteReplaced voteOption }
  }
}"#,
    proposal_field: "addresslistVotingProposal",
    proposals: r#"
query AddresslistVotingProposals($where: AddresslistVotingProposal_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: AddresslistVotingProposal_orderBy!) {
  addresslistVotingProposals(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    id
    dao { id subdomain }
    creator
    metadata
    yes abstain no
    supportThreshold
    minVotingPower
    totalVotingPower
    startDate
    endDate
    executed
    earlyExecutable
    potentiallyExecutable
    voters { voter { address } voteOption }
  }
}"#,
    proposals_field: "addresslistVotingProposals",
    settings: r#"
query AddresslistVotingSettings($address: ID!) {
  addresslistVotingPlugin(id: $address) {
    minDuration
    minProposerVotingPower
    minParticipation
    supportThreshold
    votingMode
  }
}"#,
    settings_field: "addresslistVotingPlugin",
};

pub const TOKEN_VOTING: MajorityQueries = MajorityQueries {
    proposal: r#"
query TokenVotingProposal($proposalId: ID!) {
  tokenVotingProposal(id: $proposalId) {
    id
    dao { id subdomain }
    creator
    metadata
    createdAt
    creationBlockNumber
    executionDate
    executionBlockNumber
    executionTxHash
    actions { to value data }
    yes abstain no
    supportThreshold
    minVotingPower
    totalVotingPower
    startDate
    endDate
    executed
    earlyExecutable
    potentiallyExecutable
    voters { voter { address } votingPower voteReplaced voteOption }
    plugin {
      token {
        __typename
        id name symbol
        ... on ERC20Contract { decimals }
      }
    }
  }
}"#,
    proposal_field: "tokenVotingProposal",
    proposals: r#"
query TokenVotingProposals($where: TokenVotingProposal_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: TokenVotingProposal_orderBy!) {
  tokenVotingProposals(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    id
    dao { id subdomain }
    creator
    metadata
    yes abstain no
    supportThreshold
    minVotingPower
    totalVotingPower
    startDate
    endDate
    executed
    earlyExecutable
    potentiallyExecutable
    voters { voter { address } votingPower voteOption }
    plugin {
      token {
        __typename
        id name symbol
        ... on ERC20Contract { decimals }
      }
    }
  }
}"#,
    proposals_field: "tokenVotingProposals",
    settings: r#"
query TokenVotingSettings($address: ID!) {
  tokenVotingPlugin(id: $address) {
    minDuration
    minProposerVotingPower
    minParticipation
    supportThreshold
    votingMode
  }
}"#,
    settings_field: "tokenVotingPlugin",
};

pub const ADDRESSLIST_VOTING_MEMBERS: &str = r#"
query AddresslistVotingMembers($address: ID!) {
  addresslistVotingPlugin(id: $address) {
    members { address }
  }
}"#;

pub const TOKEN_VOTING_MEMBERS: &str = r#"
query TokenVotingMembers($where: TokenVotingMember_filter!) {
  tokenVotingMembers(where: $where) {
    address
    balance
    votingPower
    delegatee { address }
    delegators { address balance }
  }
}"#;

pub const TOKEN_VOTING_TOKEN: &str = r#"
query TokenVotingToken($address: ID!) {
  tokenVotingPlugin(id: $address) {
    token {
      __typename
      id name symbol
      ... on ERC20Contract { decimals }
    }
  }
}"#;

pub const MULTISIG_PROPOSAL: &str = r#"
query MultisigProposal($proposalId: ID!) {
  multisigProposal(id: $proposalId) {
    id
    dao { id subdomain }
    creator
    metadata
    createdAt
    creationBlockNumber
    executionDate
    executionBlockNumber
    executionTxHash
    actions { to value data }
    startDate
    endDate
    executed
    potentiallyExecutable
    minApprovals
    approvers { approver { address } }
  }
}"#;

pub const MULTISIG_PROPOSALS: &str = r#"
query MultisigProposals($where: MultisigProposal_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: MultisigProposal_orderBy!) {
  multisigProposals(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    id
    dao { id subdomain }
    creator
    metadata
    startDate
    endDate
    executed
    potentiallyExecutable
    minApprovals
    approvers { approver { address } }
  }
}"#;

pub const MULTISIG_SETTINGS: &str = r#"
query MultisigSettings($address: ID!) {
  multisigPlugin(id: $address) {
    minApprovals
    onlyListed
  }
}"#;

pub const MULTISIG_MEMBERS: &str = r#"
query MultisigMembers($address: ID!) {
  multisigPlugin(id: $address) {
    members { address }
  }
}"#;
