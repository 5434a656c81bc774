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

use ethers::{
    abi::{encode, Token},
    types::{Address, TxHash, U256},
};
use futures::future::join_all;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    actions_token, address_array, address_list_action, allow_failure_map, can_execute, dao_filter,
    decode_address_list, estimate, execute_call, execute_proposal, find_interface, plugin_members,
    proposal_created, queries, resolve_address, ExecuteProposalStep, PluginInstallItem,
    ProposalCreationStep, ProposalQueryParams,
};
use crate::{
    abi::{
        decode_bool_return, decode_call, encode_call, expect_bool, expect_tuple, expect_uint,
        multisig_settings_param, ADD_ADDRESSES, APPROVE, CAN_APPROVE, CREATE_MULTISIG_PROPOSAL,
        REMOVE_ADDRESSES, UPDATE_MULTISIG_SETTINGS,
    },
    context::Context,
    indexer::{query_entity, query_list},
    ipfs::IpfsClient,
    proposal::{
        assemble::{assemble_multisig_list_item, assemble_multisig_proposal, RawMultisigProposal},
        metadata::{pin_metadata, resolve_metadata},
        DaoAction, MultisigProposal, MultisigProposalListItem, ProposalId, ProposalMetadata,
        StatusFilter,
    },
    tx::{static_call, submit_call, ContractCall, GasFeeEstimation, StepStream},
    util::{
        address::{parse_address, to_indexer_address},
        time::Timestamp,
    },
    Error, Result,
};

/// Functions a DAO action targeting this plugin may call
pub const AVAILABLE_FUNCTION_SIGNATURES: [&str; 3] =
    [ADD_ADDRESSES, REMOVE_ADDRESSES, UPDATE_MULTISIG_SETTINGS];

/// Steps of a proposal approval
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApproveProposalStep {
    Approving { tx_hash: TxHash },
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateMultisigProposalParams {
    pub plugin_address: Address,
    pub metadata_uri: String,
    pub actions: Vec<DaoAction>,
    pub fail_safe_actions: Option<Vec<bool>>,
    /// Approve the proposal as its creator
    pub approve: bool,
    /// Execute right away when the creator approval is enough
    pub try_execution: bool,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApproveMultisigProposalParams {
    pub proposal_id: String,
    pub try_execution: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanApproveParams {
    pub proposal_id: String,
    pub approver_address_or_ens: String,
}

/// Settings of a multisig plugin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultisigVotingSettings {
    pub min_approvals: u16,
    /// Only members may create proposals
    pub only_listed: bool,
}

impl MultisigVotingSettings {
    /// `(bool onlyListed, uint16 minApprovals)`
    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![Token::Bool(self.only_listed), Token::Uint(self.min_approvals.into())])
    }

    pub fn from_token(token: Token) -> Result<Self> {
        let [only_listed, min_approvals]: [Token; 2] = expect_tuple(token)?
            .try_into()
            .map_err(|_| Error::AbiError("Malformed multisig settings tuple".to_string()))?;

        let min_approvals = u16::try_from(expect_uint(min_approvals)?)
            .map_err(|_| Error::AbiError("minApprovals out of range".to_string()))?;
        Ok(Self { min_approvals, only_listed: expect_bool(only_listed)? })
    }
}

/// Initialization parameters of a new multisig plugin
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigInstallParams {
    pub members: Vec<Address>,
    pub settings: MultisigVotingSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMultisigSettings {
    min_approvals: u16,
    only_listed: bool,
}

fn create_call(params: &CreateMultisigProposalParams) -> Result<ContractCall> {
    let allow_failure_map =
        allow_failure_map(&params.actions, params.fail_safe_actions.as_deref())?;

    let data = encode_call(
        CREATE_MULTISIG_PROPOSAL,
        &[
            Token::Bytes(params.metadata_uri.as_bytes().to_vec()),
            actions_token(&params.actions),
            Token::Uint(allow_failure_map),
            Token::Bool(params.approve),
            Token::Bool(params.try_execution),
            Token::Uint(params.start_date.unwrap_or_default().0.into()),
            Token::Uint(params.end_date.unwrap_or_default().0.into()),
        ],
    );

    Ok(ContractCall::new(params.plugin_address, data))
}

fn approve_call(params: &ApproveMultisigProposalParams) -> Result<ContractCall> {
    let id = ProposalId::decode(&params.proposal_id)?;
    let data = encode_call(
        APPROVE,
        &[Token::Uint(id.local_id().into()), Token::Bool(params.try_execution)],
    );
    Ok(ContractCall::new(id.plugin_address(), data))
}

/// Client of the multisig plugin, where proposals pass once enough
/// members approve them.
#[derive(Clone)]
pub struct MultisigClient {
    ctx: Context,
}

impl MultisigClient {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn pin_metadata(&self, metadata: &ProposalMetadata) -> Result<String> {
        pin_metadata(self.ctx.ipfs().map(|ipfs| ipfs.as_ref()), metadata).await
    }

    pub fn create_proposal(
        &self,
        params: CreateMultisigProposalParams,
    ) -> Result<StepStream<ProposalCreationStep>> {
        let call = create_call(&params)?;
        let (web3, signer) = self.ctx.signer()?;
        let plugin_address = params.plugin_address;

        Ok(submit_call(
            Arc::clone(web3),
            signer,
            call,
            |tx_hash| ProposalCreationStep::Creating { tx_hash },
            move |receipt| proposal_created(plugin_address, receipt),
        ))
    }

    pub fn approve_proposal(
        &self,
        params: ApproveMultisigProposalParams,
    ) -> Result<StepStream<ApproveProposalStep>> {
        let call = approve_call(&params)?;
        let (web3, signer) = self.ctx.signer()?;

        Ok(submit_call(
            Arc::clone(web3),
            signer,
            call,
            |tx_hash| ApproveProposalStep::Approving { tx_hash },
            |_| Ok(ApproveProposalStep::Done),
        ))
    }

    pub fn execute(&self, proposal_id: &str) -> Result<StepStream<ExecuteProposalStep>> {
        execute_proposal(&self.ctx, proposal_id)
    }

    pub async fn can_approve(&self, params: &CanApproveParams) -> Result<bool> {
        let id = ProposalId::decode(&params.proposal_id)?;
        let approver = resolve_address(&self.ctx, &params.approver_address_or_ens).await?;
        let web3 = self.ctx.web3()?;

        let data =
            encode_call(CAN_APPROVE, &[Token::Uint(id.local_id().into()), Token::Address(approver)]);
        let call = ContractCall::new(id.plugin_address(), data);
        let ret = static_call(web3.as_ref(), web3.signer_address(), &call).await?;
        decode_bool_return(&ret)
    }

    pub async fn can_execute(&self, proposal_id: &str) -> Result<bool> {
        can_execute(&self.ctx, proposal_id).await
    }

    pub async fn get_proposal(&self, proposal_id: &str) -> Result<Option<MultisigProposal>> {
        let id = ProposalId::decode(proposal_id)?;

        let raw: Option<RawMultisigProposal> = query_entity(
            self.ctx.indexer()?.as_ref(),
            queries::MULTISIG_PROPOSAL,
            "multisigProposal",
            json!({ "proposalId": id.to_extended() }),
        )
        .await?;

        let Some(raw) = raw else {
            debug!(target: "dao-sdk::plugin", "Multisig proposal {} not found", id);
            return Ok(None)
        };

        let ipfs = self.ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata = resolve_metadata(ipfs, raw.metadata.as_deref()).await;
        Ok(Some(assemble_multisig_proposal(&raw, metadata, Timestamp::current_time())?))
    }

    pub async fn get_proposals(
        &self,
        params: &ProposalQueryParams,
    ) -> Result<Vec<MultisigProposalListItem>> {
        let now = Timestamp::current_time();

        let filter = dao_filter(&self.ctx, params.dao_address_or_ens.as_deref()).await?;
        let filter = match params.status {
            Some(status) => StatusFilter::new(status, now).to_where(&filter),
            None => Value::Object(filter),
        };

        let raws: Vec<RawMultisigProposal> = query_list(
            self.ctx.indexer()?.as_ref(),
            queries::MULTISIG_PROPOSALS,
            "multisigProposals",
            params.variables(filter),
        )
        .await?;

        let ipfs = self.ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata =
            join_all(raws.iter().map(|raw| resolve_metadata(ipfs, raw.metadata.as_deref()))).await;

        raws.iter()
            .zip(metadata)
            .map(|(raw, metadata)| assemble_multisig_list_item(raw, metadata, now))
            .collect()
    }

    pub async fn get_voting_settings(
        &self,
        plugin_address: &str,
    ) -> Result<Option<MultisigVotingSettings>> {
        let address = parse_address(plugin_address)?;

        let raw: Option<RawMultisigSettings> = query_entity(
            self.ctx.indexer()?.as_ref(),
            queries::MULTISIG_SETTINGS,
            "multisigPlugin",
            json!({ "address": to_indexer_address(&address) }),
        )
        .await?;

        Ok(raw.map(|raw| MultisigVotingSettings {
            min_approvals: raw.min_approvals,
            only_listed: raw.only_listed,
        }))
    }

    pub async fn get_members(&self, plugin_address: &str) -> Result<Vec<Address>> {
        plugin_members(&self.ctx, queries::MULTISIG_MEMBERS, "multisigPlugin", plugin_address).await
    }

    pub async fn estimate_create_proposal(
        &self,
        params: &CreateMultisigProposalParams,
    ) -> Result<GasFeeEstimation> {
        estimate(&self.ctx, &create_call(params)?).await
    }

    pub async fn estimate_approve(
        &self,
        params: &ApproveMultisigProposalParams,
    ) -> Result<GasFeeEstimation> {
        estimate(&self.ctx, &approve_call(params)?).await
    }

    pub async fn estimate_execute(&self, proposal_id: &str) -> Result<GasFeeEstimation> {
        estimate(&self.ctx, &execute_call(proposal_id)?).await
    }

    /// Install item to pass along a DAO creation.
    pub fn get_plugin_install_item(&self, params: &MultisigInstallParams) -> PluginInstallItem {
        let data = encode(&[
            Token::Array(params.members.iter().copied().map(Token::Address).collect()),
            params.settings.to_token(),
        ]);
        PluginInstallItem { id: self.ctx.deployment.multisig_repo, data }
    }

    pub fn add_addresses_action(&self, plugin_address: Address, members: &[Address]) -> DaoAction {
        address_list_action(ADD_ADDRESSES, plugin_address, members)
    }

    pub fn remove_addresses_action(
        &self,
        plugin_address: Address,
        members: &[Address],
    ) -> DaoAction {
        address_list_action(REMOVE_ADDRESSES, plugin_address, members)
    }

    pub fn update_multisig_settings_action(
        &self,
        plugin_address: Address,
        settings: &MultisigVotingSettings,
    ) -> DaoAction {
        let data = encode_call(UPDATE_MULTISIG_SETTINGS, &[settings.to_token()]);
        DaoAction::new(plugin_address, U256::zero(), data)
    }

    pub fn decode_add_addresses_action(&self, data: &[u8]) -> Result<Vec<Address>> {
        decode_address_list(decode_call(ADD_ADDRESSES, &[address_array()], data)?)
    }

    pub fn decode_remove_addresses_action(&self, data: &[u8]) -> Result<Vec<Address>> {
        decode_address_list(decode_call(REMOVE_ADDRESSES, &[address_array()], data)?)
    }

    pub fn decode_update_multisig_settings_action(
        &self,
        data: &[u8],
    ) -> Result<MultisigVotingSettings> {
        let mut tokens = decode_call(UPDATE_MULTISIG_SETTINGS, &[multisig_settings_param()], data)?;
        if tokens.is_empty() {
            return Err(Error::AbiError("Missing multisig settings".to_string()))
        }
        MultisigVotingSettings::from_token(tokens.remove(0))
    }

    pub fn find_interface(&self, data: &[u8]) -> Option<&'static str> {
        find_interface(&AVAILABLE_FUNCTION_SIGNATURES, data)
    }
}
