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

//! Plugin installation through the plugin setup processor.
//!
//! Installing a plugin on an existing DAO takes two moves. The client
//! prepares the installation, which deploys the plugin and reports the
//! permissions it needs. The DAO then applies it through a proposal
//! built out of [`apply_installation_actions`].

use std::sync::Arc;

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Address, TxHash, H256, U256},
    utils::keccak256,
};
use log::{debug, info};

use crate::{
    abi::{
        encode_call, expect_address, expect_array, expect_fixed_bytes, expect_tuple, expect_uint,
        version_tag_param, APPLY_INSTALLATION, APPLY_UNINSTALLATION, GET_LATEST_VERSION, GRANT,
        INSTALLATION_PREPARED, LATEST_RELEASE, PREPARE_INSTALLATION, PREPARE_UNINSTALLATION,
        REVOKE, UNINSTALLATION_PREPARED,
    },
    context::Context,
    proposal::DaoAction,
    tx::{
        event::{expect_event, take_param},
        static_call, submit_call, ContractCall, StepStream,
    },
    web3::Web3,
    Error, Result,
};

/// Release and build of a plugin repository version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VersionTag {
    pub release: u8,
    pub build: u16,
}

impl VersionTag {
    pub(crate) fn to_token(self) -> Token {
        Token::Tuple(vec![Token::Uint(self.release.into()), Token::Uint(self.build.into())])
    }

    fn from_token(token: Token) -> Result<Self> {
        let [release, build]: [Token; 2] = expect_tuple(token)?
            .try_into()
            .map_err(|_| Error::AbiError("Malformed version tag".to_string()))?;

        let release = u8::try_from(expect_uint(release)?)
            .map_err(|_| Error::AbiError("Release out of range".to_string()))?;
        let build = u16::try_from(expect_uint(build)?)
            .map_err(|_| Error::AbiError("Build out of range".to_string()))?;
        Ok(Self { release, build })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionOperation {
    Grant = 0,
    Revoke = 1,
    GrantWithCondition = 2,
}

impl PermissionOperation {
    fn from_contract(value: U256) -> Result<Self> {
        match u8::try_from(value) {
            Ok(0) => Ok(Self::Grant),
            Ok(1) => Ok(Self::Revoke),
            Ok(2) => Ok(Self::GrantWithCondition),
            _ => Err(Error::AbiError(format!("Unknown permission operation {}", value))),
        }
    }
}

/// Permission change requested by a plugin setup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiTargetPermission {
    pub operation: PermissionOperation,
    pub where_address: Address,
    pub who: Address,
    pub condition: Address,
    pub permission_id: H256,
}

impl MultiTargetPermission {
    fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Uint((self.operation as u8).into()),
            Token::Address(self.where_address),
            Token::Address(self.who),
            Token::Address(self.condition),
            Token::FixedBytes(self.permission_id.as_bytes().to_vec()),
        ])
    }

    fn from_token(token: Token) -> Result<Self> {
        let [operation, where_address, who, condition, permission_id]: [Token; 5] =
            expect_tuple(token)?
                .try_into()
                .map_err(|_| Error::AbiError("Malformed permission".to_string()))?;

        let permission_id = expect_fixed_bytes(permission_id)?;
        if permission_id.len() != 32 {
            return Err(Error::AbiError("Malformed permission id".to_string()))
        }

        Ok(Self {
            operation: PermissionOperation::from_contract(expect_uint(operation)?)?,
            where_address: expect_address(where_address)?,
            who: expect_address(who)?,
            condition: expect_address(condition)?,
            permission_id: H256::from_slice(&permission_id),
        })
    }
}

fn permissions_from_token(token: Token) -> Result<Vec<MultiTargetPermission>> {
    expect_array(token)?.into_iter().map(MultiTargetPermission::from_token).collect()
}

fn addresses_from_token(token: Token) -> Result<Vec<Address>> {
    expect_array(token)?.into_iter().map(expect_address).collect()
}

/// `keccak256(abi.encode(helpers))`, as the setup processor checks it
pub fn helpers_hash(helpers: &[Address]) -> H256 {
    let helpers = Token::Array(helpers.iter().copied().map(Token::Address).collect());
    H256(keccak256(encode(&[helpers])))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareInstallationParams {
    pub dao_address: Address,
    pub plugin_repo: Address,
    /// Latest version of the repository when `None`
    pub version: Option<VersionTag>,
    /// ABI encoded plugin initialization parameters
    pub installation_data: Vec<u8>,
}

/// Everything the DAO needs to apply a prepared installation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyInstallationParams {
    pub plugin_repo: Address,
    pub version_tag: VersionTag,
    pub plugin_address: Address,
    pub permissions: Vec<MultiTargetPermission>,
    pub helpers: Vec<Address>,
    pub helpers_hash: H256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareInstallationStep {
    Preparing { tx_hash: TxHash },
    Done(ApplyInstallationParams),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareUninstallationParams {
    pub dao_address: Address,
    pub plugin_address: Address,
    pub plugin_repo: Address,
    /// Version the plugin was installed with
    pub version: VersionTag,
    /// Helpers reported when the plugin was installed
    pub current_helpers: Vec<Address>,
    pub uninstallation_data: Vec<u8>,
}

/// Everything the DAO needs to apply a prepared uninstallation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyUninstallationParams {
    pub plugin_repo: Address,
    pub version_tag: VersionTag,
    pub plugin_address: Address,
    pub permissions: Vec<MultiTargetPermission>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareUninstallationStep {
    Preparing { tx_hash: TxHash },
    Done(ApplyUninstallationParams),
}

/// Latest version published in a plugin repository.
pub async fn latest_version(web3: &dyn Web3, plugin_repo: Address) -> Result<VersionTag> {
    let call = ContractCall::new(plugin_repo, encode_call(LATEST_RELEASE, &[]));
    let ret = static_call(web3, None, &call).await?;
    let release = expect_uint(decode(&[ParamType::Uint(8)], &ret)?.remove(0))?;

    let call =
        ContractCall::new(plugin_repo, encode_call(GET_LATEST_VERSION, &[Token::Uint(release)]));
    let ret = static_call(web3, None, &call).await?;
    let version =
        ParamType::Tuple(vec![version_tag_param(), ParamType::Address, ParamType::Bytes]);
    let mut version = expect_tuple(decode(&[version], &ret)?.remove(0))?;
    if version.is_empty() {
        return Err(Error::AbiError("Empty version".to_string()))
    }

    let tag = VersionTag::from_token(version.remove(0))?;
    debug!(
        target: "dao-sdk::install",
        "Latest version of {:?} is {}.{}", plugin_repo, tag.release, tag.build,
    );
    Ok(tag)
}

/// Prepare the installation of a plugin on a DAO. Yields `Preparing`
/// once sent and `Done` with the parameters to apply the installation
/// with once `InstallationPrepared` is confirmed.
pub async fn prepare_installation(
    ctx: &Context,
    params: PrepareInstallationParams,
) -> Result<StepStream<PrepareInstallationStep>> {
    let (web3, signer) = ctx.signer()?;
    let version = match params.version {
        Some(version) => version,
        None => latest_version(web3.as_ref(), params.plugin_repo).await?,
    };

    info!(
        target: "dao-sdk::install",
        "Preparing installation of {:?} v{}.{} on {:?}",
        params.plugin_repo, version.release, version.build, params.dao_address,
    );

    let data = encode_call(
        PREPARE_INSTALLATION,
        &[
            Token::Address(params.dao_address),
            Token::Tuple(vec![
                Token::Tuple(vec![version.to_token(), Token::Address(params.plugin_repo)]),
                Token::Bytes(params.installation_data),
            ]),
        ],
    );
    let call = ContractCall::new(ctx.deployment.plugin_setup_processor, data);

    Ok(submit_call(
        Arc::clone(web3),
        signer,
        call,
        |tx_hash| PrepareInstallationStep::Preparing { tx_hash },
        |receipt| {
            let mut log =
                expect_event(receipt, &INSTALLATION_PREPARED, Error::InstallationPreparationFailed)?;

            let plugin_repo = expect_address(take_param(&mut log, "pluginSetupRepo")?)?;
            let version_tag = VersionTag::from_token(take_param(&mut log, "versionTag")?)?;
            let plugin_address = expect_address(take_param(&mut log, "plugin")?)?;
            let [helpers, permissions]: [Token; 2] =
                expect_tuple(take_param(&mut log, "preparedSetupData")?)?
                    .try_into()
                    .map_err(|_| Error::InstallationPreparationFailed)?;

            let helpers = addresses_from_token(helpers)?;
            Ok(PrepareInstallationStep::Done(ApplyInstallationParams {
                plugin_repo,
                version_tag,
                plugin_address,
                permissions: permissions_from_token(permissions)?,
                helpers_hash: helpers_hash(&helpers),
                helpers,
            }))
        },
    ))
}

/// Prepare the removal of a plugin from a DAO. Yields `Preparing` once
/// sent and `Done` once `UninstallationPrepared` is confirmed.
pub fn prepare_uninstallation(
    ctx: &Context,
    params: PrepareUninstallationParams,
) -> Result<StepStream<PrepareUninstallationStep>> {
    let (web3, signer) = ctx.signer()?;
    let plugin_address = params.plugin_address;

    let data = encode_call(
        PREPARE_UNINSTALLATION,
        &[
            Token::Address(params.dao_address),
            Token::Tuple(vec![
                Token::Tuple(vec![params.version.to_token(), Token::Address(params.plugin_repo)]),
                Token::Tuple(vec![
                    Token::Address(params.plugin_address),
                    Token::Array(params.current_helpers.into_iter().map(Token::Address).collect()),
                    Token::Bytes(params.uninstallation_data),
                ]),
            ]),
        ],
    );
    let call = ContractCall::new(ctx.deployment.plugin_setup_processor, data);

    Ok(submit_call(
        Arc::clone(web3),
        signer,
        call,
        |tx_hash| PrepareUninstallationStep::Preparing { tx_hash },
        move |receipt| {
            let mut log = expect_event(
                receipt,
                &UNINSTALLATION_PREPARED,
                Error::UninstallationPreparationFailed,
            )?;

            Ok(PrepareUninstallationStep::Done(ApplyUninstallationParams {
                plugin_repo: expect_address(take_param(&mut log, "pluginSetupRepo")?)?,
                version_tag: VersionTag::from_token(take_param(&mut log, "versionTag")?)?,
                plugin_address,
                permissions: permissions_from_token(take_param(&mut log, "permissions")?)?,
            }))
        },
    ))
}

/// `keccak256("ROOT_PERMISSION")`
pub fn root_permission_id() -> H256 {
    H256(keccak256("ROOT_PERMISSION"))
}

fn permission_action(signature: &str, dao: Address, who: Address, permission: H256) -> DaoAction {
    let data = encode_call(
        signature,
        &[Token::Address(dao), Token::Address(who), Token::FixedBytes(permission.as_bytes().to_vec())],
    );
    DaoAction::new(dao, U256::zero(), data)
}

/// DAO actions applying a prepared installation. The setup processor is
/// granted root on the DAO for the duration of the call.
pub fn apply_installation_actions(
    ctx: &Context,
    dao_address: Address,
    params: &ApplyInstallationParams,
) -> Vec<DaoAction> {
    let psp = ctx.deployment.plugin_setup_processor;
    let data = encode_call(
        APPLY_INSTALLATION,
        &[
            Token::Address(dao_address),
            Token::Tuple(vec![
                Token::Tuple(vec![params.version_tag.to_token(), Token::Address(params.plugin_repo)]),
                Token::Address(params.plugin_address),
                Token::Array(params.permissions.iter().map(MultiTargetPermission::to_token).collect()),
                Token::FixedBytes(params.helpers_hash.as_bytes().to_vec()),
            ]),
        ],
    );

    vec![
        permission_action(GRANT, dao_address, psp, root_permission_id()),
        DaoAction::new(psp, U256::zero(), data),
        permission_action(REVOKE, dao_address, psp, root_permission_id()),
    ]
}

/// DAO actions applying a prepared uninstallation, wrapped in the same
/// root grant and revoke.
pub fn apply_uninstallation_actions(
    ctx: &Context,
    dao_address: Address,
    params: &ApplyUninstallationParams,
) -> Vec<DaoAction> {
    let psp = ctx.deployment.plugin_setup_processor;
    let data = encode_call(
        APPLY_UNINSTALLATION,
        &[
            Token::Address(dao_address),
            Token::Tuple(vec![
                Token::Address(params.plugin_address),
                Token::Tuple(vec![params.version_tag.to_token(), Token::Address(params.plugin_repo)]),
                Token::Array(params.permissions.iter().map(MultiTargetPermission::to_token).collect()),
            ]),
        ],
    );

    vec![
        permission_action(GRANT, dao_address, psp, root_permission_id()),
        DaoAction::new(psp, U256::zero(), data),
        permission_action(REVOKE, dao_address, psp, root_permission_id()),
    ]
}
