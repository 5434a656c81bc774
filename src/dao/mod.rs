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

//! DAO-level client.
//!
//! Creates DAOs through the DAO factory, moves assets into them, checks
//! permissions and reads DAO records off the indexer. Like the plugin
//! clients, state-changing operations return a [`StepStream`] and fail
//! before returning it when their input is invalid.

use std::sync::Arc;

use ethers::{
    abi::Token,
    types::{Address, TxHash, H256, U256},
    utils::keccak256,
};
use futures::{
    future::join_all,
    stream::{self, StreamExt},
};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde_json::{json, Value};

use crate::{
    abi::{
        decode_bool_return, decode_uint_return, encode_call, expect_address, expect_uint,
        CREATE_DAO, DAO_REGISTERED, DEPOSIT, DEPOSITED, ERC20_ALLOWANCE, ERC20_APPROVAL,
        ERC20_APPROVE, HAS_PERMISSION,
    },
    context::Context,
    indexer::{query_entity, query_list},
    ipfs::{pin_content, IpfsClient},
    plugin::{
        dao_filter, estimate, installation::latest_version, resolve_address, PluginInstallItem,
        SortDirection,
    },
    tx::{
        chain_steps,
        event::{expect_event, take_param},
        static_call, submit_call, ContractCall, GasFeeEstimation, StepStream,
    },
    util::address::to_indexer_address,
    web3::Web3,
    Error, Result,
};

/// DAO records and their indexer representation
pub mod model;
pub use model::{
    Asset, AssetBalance, DaoDetails, DaoListItem, DaoMetadata, DaoMetadataSummary,
    DaoResourceLink, InstalledPluginListItem, Transfer, TransferType,
};
use model::{
    assemble_dao, assemble_dao_list_item, resolve_dao_metadata, RawBalance, RawDaoRecord,
    RawTransfer,
};

/// Indexer queries of DAO records
pub mod queries;

lazy_static! {
    static ref SUBDOMAIN_REGEX: Regex = Regex::new(r"^[a-z0-9\-]+$").unwrap();
}

/// `keccak256` of a permission name, e.g. `EXECUTE_PERMISSION`
pub fn permission_id(name: &str) -> H256 {
    H256(keccak256(name))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DaoCreationStep {
    Creating { tx_hash: TxHash },
    Done { address: Address },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetAllowanceStep {
    Setting { tx_hash: TxHash },
    Done { allowance: U256 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DaoDepositStep {
    CheckedAllowance { allowance: U256 },
    SettingAllowance { tx_hash: TxHash },
    AllowanceSet { allowance: U256 },
    Depositing { tx_hash: TxHash },
    Done { amount: U256 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateDaoParams {
    pub metadata_uri: String,
    pub dao_uri: String,
    /// Registered under `dao.eth`. Lowercase letters, digits and `-`
    pub ens_subdomain: String,
    pub trusted_forwarder: Address,
    /// At least one of them has to grant the execute permission
    pub plugins: Vec<PluginInstallItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepositToken {
    Native,
    Erc20 { token_address: Address },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositParams {
    pub dao_address_or_ens: String,
    pub amount: U256,
    pub token: DepositToken,
    pub reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetAllowanceParams {
    pub spender_address_or_ens: String,
    pub token_address: Address,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HasPermissionParams {
    pub dao_address_or_ens: String,
    pub where_address: Address,
    pub who: Address,
    /// Permission name, hashed with [`permission_id`]
    pub permission: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DaoSortBy {
    #[default]
    CreatedAt,
    Subdomain,
}

impl DaoSortBy {
    fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Subdomain => "subdomain",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoQueryParams {
    pub skip: u32,
    pub limit: u32,
    pub direction: SortDirection,
    pub sort_by: DaoSortBy,
}

impl Default for DaoQueryParams {
    fn default() -> Self {
        Self { skip: 0, limit: 10, direction: SortDirection::Asc, sort_by: DaoSortBy::CreatedAt }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceQueryParams {
    /// Balances of every DAO when `None`
    pub dao_address_or_ens: Option<String>,
    pub skip: u32,
    pub limit: u32,
    pub direction: SortDirection,
}

impl Default for BalanceQueryParams {
    fn default() -> Self {
        Self { dao_address_or_ens: None, skip: 0, limit: 10, direction: SortDirection::Asc }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferQueryParams {
    pub dao_address_or_ens: Option<String>,
    pub transfer_type: Option<TransferType>,
    pub skip: u32,
    pub limit: u32,
    pub direction: SortDirection,
}

impl Default for TransferQueryParams {
    fn default() -> Self {
        Self {
            dao_address_or_ens: None,
            transfer_type: None,
            skip: 0,
            limit: 10,
            direction: SortDirection::Asc,
        }
    }
}

fn validate_subdomain(subdomain: &str) -> Result<()> {
    if !subdomain.is_empty() && !SUBDOMAIN_REGEX.is_match(subdomain) {
        return Err(Error::InvalidSubdomain(subdomain.to_string()))
    }

    Ok(())
}

async fn create_dao_call(ctx: &Context, params: &CreateDaoParams) -> Result<ContractCall> {
    validate_subdomain(&params.ens_subdomain)?;
    if params.plugins.is_empty() {
        return Err(Error::MissingExecPermission)
    }

    let (web3, _) = ctx.signer()?;
    let mut plugins = Vec::with_capacity(params.plugins.len());
    for plugin in &params.plugins {
        let version = latest_version(web3.as_ref(), plugin.id).await?;
        plugins.push(Token::Tuple(vec![
            Token::Tuple(vec![version.to_token(), Token::Address(plugin.id)]),
            Token::Bytes(plugin.data.clone()),
        ]));
    }

    let data = encode_call(
        CREATE_DAO,
        &[
            Token::Tuple(vec![
                Token::Address(params.trusted_forwarder),
                Token::String(params.dao_uri.clone()),
                Token::String(params.ens_subdomain.clone()),
                Token::Bytes(params.metadata_uri.as_bytes().to_vec()),
            ]),
            Token::Array(plugins),
        ],
    );

    Ok(ContractCall::new(ctx.deployment.dao_factory, data))
}

fn deposit_call(dao: Address, params: &DepositParams) -> ContractCall {
    let token = match &params.token {
        DepositToken::Native => Address::zero(),
        DepositToken::Erc20 { token_address } => *token_address,
    };

    let data = encode_call(
        DEPOSIT,
        &[
            Token::Address(token),
            Token::Uint(params.amount),
            Token::String(params.reference.clone()),
        ],
    );

    let mut call = ContractCall::new(dao, data);
    if params.token == DepositToken::Native {
        call.value = params.amount;
    }
    call
}

fn approve_call(token: Address, spender: Address, amount: U256) -> ContractCall {
    let data = encode_call(ERC20_APPROVE, &[Token::Address(spender), Token::Uint(amount)]);
    ContractCall::new(token, data)
}

fn set_allowance_steps(
    web3: Arc<dyn Web3>,
    signer: Address,
    call: ContractCall,
) -> StepStream<SetAllowanceStep> {
    submit_call(
        web3,
        signer,
        call,
        |tx_hash| SetAllowanceStep::Setting { tx_hash },
        |receipt| {
            let mut log = expect_event(receipt, &ERC20_APPROVAL, Error::SetAllowanceFailed)?;
            let allowance = expect_uint(take_param(&mut log, "value")?)?;
            Ok(SetAllowanceStep::Done { allowance })
        },
    )
}

/// Client of a DAO itself, as opposed to the plugins governing it
#[derive(Clone)]
pub struct DaoClient {
    ctx: Context,
}

impl DaoClient {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Pin DAO metadata on IPFS, returning its `ipfs://` reference.
    pub async fn pin_metadata(&self, metadata: &DaoMetadata) -> Result<String> {
        let content = serde_json::to_string(metadata)?;
        pin_content(self.ctx.ipfs().map(|ipfs| ipfs.as_ref()), &content).await
    }

    /// Deploy a DAO with its plugins through the DAO factory. Every plugin
    /// is installed at the latest version of its repository.
    pub async fn create_dao(&self, params: CreateDaoParams) -> Result<StepStream<DaoCreationStep>> {
        let call = create_dao_call(&self.ctx, &params).await?;
        let (web3, signer) = self.ctx.signer()?;

        info!(
            target: "dao-sdk::dao",
            "Creating DAO {:?} with {} plugins", params.ens_subdomain, params.plugins.len(),
        );

        Ok(submit_call(
            Arc::clone(web3),
            signer,
            call,
            |tx_hash| DaoCreationStep::Creating { tx_hash },
            |receipt| {
                let mut log = expect_event(receipt, &DAO_REGISTERED, Error::DaoCreationFailed)?;
                let address = expect_address(take_param(&mut log, "dao")?)?;
                Ok(DaoCreationStep::Done { address })
            },
        ))
    }

    /// Allowance `owner` gave `spender` on an ERC20 token.
    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let web3 = self.ctx.web3()?;
        let data = encode_call(ERC20_ALLOWANCE, &[Token::Address(owner), Token::Address(spender)]);
        let ret = static_call(web3.as_ref(), None, &ContractCall::new(token, data)).await?;
        decode_uint_return(&ret)
    }

    pub async fn set_allowance(
        &self,
        params: SetAllowanceParams,
    ) -> Result<StepStream<SetAllowanceStep>> {
        let spender = resolve_address(&self.ctx, &params.spender_address_or_ens).await?;
        let (web3, signer) = self.ctx.signer()?;
        let call = approve_call(params.token_address, spender, params.amount);
        Ok(set_allowance_steps(Arc::clone(web3), signer, call))
    }

    /// Deposit native currency or ERC20 tokens into a DAO. ERC20 deposits
    /// first raise the allowance of the DAO when it falls short of the
    /// amount.
    pub async fn deposit(&self, params: DepositParams) -> Result<StepStream<DaoDepositStep>> {
        let dao = resolve_address(&self.ctx, &params.dao_address_or_ens).await?;
        let (web3, signer) = self.ctx.signer()?;
        let web3 = Arc::clone(web3);
        let amount = params.amount;

        let allowance_steps: StepStream<DaoDepositStep> = match params.token {
            DepositToken::Native => stream::empty().boxed(),
            DepositToken::Erc20 { token_address } => {
                let allowance = self.allowance(token_address, signer, dao).await?;
                debug!(
                    target: "dao-sdk::dao",
                    "Allowance of {:?} on {:?} is {}", dao, token_address, allowance,
                );

                let checked = stream::iter([Ok(DaoDepositStep::CheckedAllowance { allowance })]);
                if allowance >= amount {
                    checked.boxed()
                } else {
                    let call = approve_call(token_address, dao, amount);
                    let approve = set_allowance_steps(Arc::clone(&web3), signer, call).map(|step| {
                        step.map(|step| match step {
                            SetAllowanceStep::Setting { tx_hash } => {
                                DaoDepositStep::SettingAllowance { tx_hash }
                            }
                            SetAllowanceStep::Done { allowance } => {
                                DaoDepositStep::AllowanceSet { allowance }
                            }
                        })
                    });
                    checked.chain(approve).boxed()
                }
            }
        };

        let call = deposit_call(dao, &params);
        info!(target: "dao-sdk::dao", "Depositing {} into {:?}", amount, dao);

        Ok(chain_steps(allowance_steps, move || {
            submit_call(
                web3,
                signer,
                call,
                |tx_hash| DaoDepositStep::Depositing { tx_hash },
                move |receipt| {
                    let mut log = expect_event(receipt, &DEPOSITED, Error::DepositFailed)?;
                    let deposited = expect_uint(take_param(&mut log, "amount")?)?;
                    if deposited != amount {
                        return Err(Error::AmountMismatch(deposited.to_string(), amount.to_string()))
                    }
                    Ok(DaoDepositStep::Done { amount: deposited })
                },
            )
        }))
    }

    /// Whether `who` holds `permission` on `where_address` in the DAO.
    pub async fn has_permission(&self, params: &HasPermissionParams) -> Result<bool> {
        let dao = resolve_address(&self.ctx, &params.dao_address_or_ens).await?;
        let web3 = self.ctx.web3()?;

        let data = encode_call(
            HAS_PERMISSION,
            &[
                Token::Address(params.where_address),
                Token::Address(params.who),
                Token::FixedBytes(permission_id(&params.permission).as_bytes().to_vec()),
                Token::Bytes(params.data.clone()),
            ],
        );
        let ret = static_call(web3.as_ref(), None, &ContractCall::new(dao, data)).await?;
        decode_bool_return(&ret)
    }

    pub async fn get_dao(&self, dao_address_or_ens: &str) -> Result<Option<DaoDetails>> {
        let address = resolve_address(&self.ctx, dao_address_or_ens).await?;

        let raw: Option<RawDaoRecord> = query_entity(
            self.ctx.indexer()?.as_ref(),
            queries::DAO,
            "dao",
            json!({ "address": to_indexer_address(&address) }),
        )
        .await?;

        let Some(raw) = raw else {
            debug!(target: "dao-sdk::dao", "DAO {:?} not found", address);
            return Ok(None)
        };

        let ipfs = self.ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata = resolve_dao_metadata(ipfs, raw.metadata.as_deref()).await;
        Ok(Some(assemble_dao(&raw, metadata)?))
    }

    pub async fn get_daos(&self, params: &DaoQueryParams) -> Result<Vec<DaoListItem>> {
        let raws: Vec<RawDaoRecord> = query_list(
            self.ctx.indexer()?.as_ref(),
            queries::DAOS,
            "daos",
            json!({
                "limit": params.limit,
                "skip": params.skip,
                "direction": params.direction.as_str(),
                "sortBy": params.sort_by.as_str(),
            }),
        )
        .await?;

        let ipfs = self.ctx.ipfs().map(|ipfs| ipfs.as_ref() as &dyn IpfsClient);
        let metadata =
            join_all(raws.iter().map(|raw| resolve_dao_metadata(ipfs, raw.metadata.as_deref())))
                .await;

        raws.iter()
            .zip(metadata)
            .map(|(raw, metadata)| assemble_dao_list_item(raw, metadata))
            .collect()
    }

    /// Balances of a DAO, most recently updated last.
    pub async fn get_dao_balances(&self, params: &BalanceQueryParams) -> Result<Vec<AssetBalance>> {
        let filter = dao_filter(&self.ctx, params.dao_address_or_ens.as_deref()).await?;

        let raws: Vec<RawBalance> = query_list(
            self.ctx.indexer()?.as_ref(),
            queries::TOKEN_BALANCES,
            "tokenBalances",
            json!({
                "where": Value::Object(filter),
                "limit": params.limit,
                "skip": params.skip,
                "direction": params.direction.as_str(),
                "sortBy": "lastUpdated",
            }),
        )
        .await?;

        raws.iter().map(RawBalance::parse).collect()
    }

    pub async fn get_dao_transfers(&self, params: &TransferQueryParams) -> Result<Vec<Transfer>> {
        let mut filter = dao_filter(&self.ctx, params.dao_address_or_ens.as_deref()).await?;
        if let Some(transfer_type) = params.transfer_type {
            filter.insert("type".to_string(), json!(transfer_type.to_indexer()));
        }

        let raws: Vec<RawTransfer> = query_list(
            self.ctx.indexer()?.as_ref(),
            queries::TOKEN_TRANSFERS,
            "tokenTransfers",
            json!({
                "where": Value::Object(filter),
                "limit": params.limit,
                "skip": params.skip,
                "direction": params.direction.as_str(),
                "sortBy": "createdAt",
            }),
        )
        .await?;

        raws.iter().map(RawTransfer::parse).collect()
    }

    pub async fn estimate_create_dao(&self, params: &CreateDaoParams) -> Result<GasFeeEstimation> {
        estimate(&self.ctx, &create_dao_call(&self.ctx, params).await?).await
    }

    /// Fee of the deposit transaction alone, without a prior allowance
    /// change.
    pub async fn estimate_deposit(&self, params: &DepositParams) -> Result<GasFeeEstimation> {
        let dao = resolve_address(&self.ctx, &params.dao_address_or_ens).await?;
        estimate(&self.ctx, &deposit_call(dao, params)).await
    }

    pub async fn estimate_set_allowance(
        &self,
        params: &SetAllowanceParams,
    ) -> Result<GasFeeEstimation> {
        let spender = resolve_address(&self.ctx, &params.spender_address_or_ens).await?;
        estimate(&self.ctx, &approve_call(params.token_address, spender, params.amount)).await
    }
}
