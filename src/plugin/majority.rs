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

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    abi::Token,
    types::{Address, U256},
};
use futures::future::join_all;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    actions_token, allow_failure_map, can_execute, dao_filter, estimate, execute_call,
    execute_proposal, proposal_created, queries::MajorityQueries, resolve_address,
    ExecuteProposalStep, ProposalCreationStep, ProposalQueryParams, VoteProposalStep, VotingMode,
    VotingSettings,
};
use crate::{
    abi::{
        decode_bool_return, decode_call, encode_call, voting_settings_param, CAN_VOTE,
        CREATE_MAJORITY_PROPOSAL, UPDATE_VOTING_SETTINGS, VOTE,
    },
    context::Context,
    indexer::{query_entity, query_list},
    ipfs::IpfsClient,
    proposal::{
        assemble::{
            assemble_proposal, assemble_proposal_list_item, RawMajorityProposal, RATIO_DIGITS,
        },
        metadata::{pin_metadata, resolve_metadata},
        DaoAction, ProposalId, ProposalListItem, ProposalMetadata, ProposalSnapshot,
        StatusFilter, VoteValue,
    },
    tx::{static_call, submit_call, ContractCall, GasFeeEstimation, StepStream},
    util::{
        address::{parse_address, to_indexer_address},
        parse::decode_ratio,
        time::Timestamp,
    },
    Error, Result,
};

/// Parameters of a majority voting proposal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateMajorityVotingProposalParams {
    pub plugin_address: Address,
    /// `ipfs://` reference of the pinned metadata
    pub metadata_uri: String,
    pub actions: Vec<DaoAction>,
    /// One flag per action, set when the action may fail without
    /// reverting the whole execution
    pub fail_safe_actions: Option<Vec<bool>>,
    /// Start immediately when `None`
    pub start_date: Option<Timestamp>,
    /// Start date plus the minimal duration when `None`
    pub end_date: Option<Timestamp>,
    pub execute_on_pass: bool,
    pub creator_vote: Option<VoteValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteProposalParams {
    pub proposal_id: String,
    pub vote: VoteValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanVoteParams {
    pub proposal_id: String,
    pub voter_address_or_ens: String,
    pub vote: VoteValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVotingSettings {
    min_duration: String,
    min_proposer_voting_power: String,
    min_participation: String,
    support_threshold: String,
    voting_mode: String,
}

impl RawVotingSettings {
    fn parse(&self) -> Result<VotingSettings> {
        let min_proposer_voting_power = U256::from_dec_str(&self.min_proposer_voting_power)
            .map_err(|e| Error::ParseFailed(format!("minProposerVotingPower: {}", e)))?;

        Ok(VotingSettings {
            support_threshold: decode_ratio(self.support_threshold.parse()?, RATIO_DIGITS)?,
            min_participation: decode_ratio(self.min_participation.parse()?, RATIO_DIGITS)?,
            min_duration: self.min_duration.parse()?,
            min_proposer_voting_power,
            voting_mode: VotingMode::from_indexer(&self.voting_mode)?,
        })
    }
}

fn create_call(params: &CreateMajorityVotingProposalParams) -> Result<ContractCall> {
    let allow_failure_map =
        allow_failure_map(&params.actions, params.fail_safe_actions.as_deref())?;

    let data = encode_call(
        CREATE_MAJORITY_PROPOSAL,
        &[
            Token::Bytes(params.metadata_uri.as_bytes().to_vec()),
            actions_token(&params.actions),
            Token::Uint(allow_failure_map),
            Token::Uint(params.start_date.unwrap_or_default().0.into()),
            Token::Uint(params.end_date.unwrap_or_default().0.into()),
            Token::Uint(params.creator_vote.map_or(0, VoteValue::to_contract).into()),
            Token::Bool(params.execute_on_pass),
        ],
    );

    Ok(ContractCall::new(params.plugin_address, data))
}

fn vote_call(params: &VoteProposalParams) -> Result<ContractCall> {
    let id = ProposalId::decode(&params.proposal_id)?;
    let data = encode_call(
        VOTE,
        &[
            Token::Uint(id.local_id().into()),
            Token::Uint(params.vote.to_contract().into()),
            Token::Bool(false),
        ],
    );
    Ok(ContractCall::new(id.plugin_address(), data))
}

/// Majority voting protocol shared by the addresslist and token voting
/// plugins. Implementors only provide their context and indexer queries.
#[async_trait]
pub trait MajorityVotingPlugin: Send + Sync {
    fn context(&self) -> &Context;

    fn queries(&self) -> &'static MajorityQueries;

    /// Pin proposal metadata, returning the `ipfs://` reference to pass
    /// as [`CreateMajorityVotingProposalParams::metadata_uri`].
    async fn pin_metadata(&self, metadata: &ProposalMetadata) -> Result<String> {
        pin_metadata(self.context().ipfs().map(|ipfs| ipfs.as_ref()), metadata).await
    }

    /// Submit a new proposal. Yields `Creating` once sent and `Done`
    /// with the new proposal id once `ProposalCreated` is confirmed.
    fn create_proposal(
        &self,
        params: CreateMajorityVotingProposalParams,
    ) -> Result<StepStream<ProposalCreationStep>> {
        let call = create_call(&params)?;
        let (web3, signer) = self.context().signer()?;
        let plugin_address = params.plugin_address;

        Ok(submit_call(
            Arc::clone(web3),
            signer,
            call,
            |tx_hash| ProposalCreationStep::Creating { tx_hash },
            move |receipt| proposal_created(plugin_address, receipt),
        ))
    }

    fn vote(&self, params: VoteProposalParams) -> Result<StepStream<VoteProposalStep>> {
        let call = vote_call(&params)?;
        let (web3, signer) = self.context().signer()?;

        Ok(submit_call(
            Arc::clone(web3),
            signer,
            call,
            |tx_hash| VoteProposalStep::Voting { tx_hash },
            |_| Ok(VoteProposalStep::Done),
        ))
    }

    fn execute(&self, proposal_id: &str) -> Result<StepStream<ExecuteProposalStep>> {
        execute_proposal(self.context(), proposal_id)
    }

    /// Whether the voter may cast `vote` on the proposal right now.
    async fn can_vote(&self, params: &CanVoteParams) -> Result<bool> {
        let id = ProposalId::decode(&params.proposal_id)?;
        let ctx = self.context();
        let voter = resolve_address(ctx, &params.voter_address_or_ens).await?;
        let web3 = ctx.web3()?;

        let data = encode_call(
            CAN_VOTE,
            &[
                Token::Uint(id.local_id().into()),
                Token::Address(voter),
                Token::Uint(params.vote.to_contract().into()),
            ],
        );
        let call = ContractCall::new(id.plugin_address(), data);
        let ret = static_call(web3.as_ref(), web3.signer_address(), &call).await?;
        decode_bool_return(&ret)
    }

    async fn can_execute(&self, proposal_id: &str) -> Result<bool> {
        can_execute(self.context(), proposal_id).await
    }

    /// Full view of a proposal, `None` when the indexer does not know it.
    async fn get_proposal(&self, proposal_id: &str) -> Result<Option<ProposalSnapshot>> {
        let id = ProposalId::decode(proposal_id)?;
        let ctx = self.context();
        let queries = self.queries();

        let raw: Option<RawMajorityProposal> = query_entity(
            ctx.indexer()?.as_ref(),
            queries.proposal,
            queries.proposal_field,
            json!({ "proposalId": id.to_extended() }),
        )
        .await?;

        let Some(raw) = raw else {
            debug!(target: "dao-sdk::plugin", "Proposal {} not found", id);
            return Ok(None)
        };

        let ipfs = ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata = resolve_metadata(ipfs, raw.metadata.as_deref()).await;
        Ok(Some(assemble_proposal(&raw, metadata, Timestamp::current_time())?))
    }

    async fn get_proposals(&self, params: &ProposalQueryParams) -> Result<Vec<ProposalListItem>> {
        let ctx = self.context();
        let queries = self.queries();
        let now = Timestamp::current_time();

        let filter = dao_filter(ctx, params.dao_address_or_ens.as_deref()).await?;
        let filter = match params.status {
            Some(status) => StatusFilter::with_early_execution(status, now).to_where(&filter),
            None => Value::Object(filter),
        };

        let raws: Vec<RawMajorityProposal> = query_list(
            ctx.indexer()?.as_ref(),
            queries.proposals,
            queries.proposals_field,
            params.variables(filter),
        )
        .await?;

        let ipfs = ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata =
            join_all(raws.iter().map(|raw| resolve_metadata(ipfs, raw.metadata.as_deref()))).await;

        raws.iter()
            .zip(metadata)
            .map(|(raw, metadata)| assemble_proposal_list_item(raw, metadata, now))
            .collect()
    }

    async fn get_voting_settings(&self, plugin_address: &str) -> Result<Option<VotingSettings>> {
        let address = parse_address(plugin_address)?;
        let ctx = self.context();
        let queries = self.queries();

        let raw: Option<RawVotingSettings> = query_entity(
            ctx.indexer()?.as_ref(),
            queries.settings,
            queries.settings_field,
            json!({ "address": to_indexer_address(&address) }),
        )
        .await?;

        raw.map(|raw| raw.parse()).transpose()
    }

    async fn estimate_create_proposal(
        &self,
        params: &CreateMajorityVotingProposalParams,
    ) -> Result<GasFeeEstimation> {
        let call = create_call(params)?;
        estimate(self.context(), &call).await
    }

    async fn estimate_vote(&self, params: &VoteProposalParams) -> Result<GasFeeEstimation> {
        let call = vote_call(params)?;
        estimate(self.context(), &call).await
    }

    async fn estimate_execute(&self, proposal_id: &str) -> Result<GasFeeEstimation> {
        let call = execute_call(proposal_id)?;
        estimate(self.context(), &call).await
    }

    /// DAO action replacing the voting settings of the plugin
    fn update_plugin_settings_action(
        &self,
        plugin_address: Address,
        settings: &VotingSettings,
    ) -> Result<DaoAction> {
        let data = encode_call(UPDATE_VOTING_SETTINGS, &[settings.to_token()?]);
        Ok(DaoAction::new(plugin_address, U256::zero(), data))
    }

    fn decode_update_plugin_settings_action(&self, data: &[u8]) -> Result<VotingSettings> {
        let mut tokens = decode_call(UPDATE_VOTING_SETTINGS, &[voting_settings_param()], data)?;
        if tokens.is_empty() {
            return Err(Error::AbiError("Missing voting settings".to_string()))
        }
        VotingSettings::from_token(tokens.remove(0))
    }
}

