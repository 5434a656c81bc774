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

//! DAO records as seen by clients, and their indexer representation.

use ethers::types::{Address, TxHash};
use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::{
    ipfs::{fetch_json, IpfsClient},
    proposal::{
        assemble::{parse_big, parse_timestamp, parse_tx_hash},
        TokenDetails,
    },
    util::{address::parse_address, time::Timestamp},
    Error, Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoResourceLink {
    pub name: String,
    pub url: String,
}

/// Human readable information about a DAO, stored off-chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoMetadata {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub links: Vec<DaoResourceLink>,
}

impl DaoMetadata {
    fn placeholder(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            avatar: None,
            links: vec![],
        }
    }

    pub fn unsupported_link() -> Self {
        Self::placeholder("(unsupported metadata link)", "(the metadata link is not supported)")
    }

    /// Also used for DAOs registered without metadata
    pub fn unavailable() -> Self {
        Self::placeholder("(unavailable metadata)", "(the DAO metadata is not available)")
    }
}

/// Fetch the metadata of a DAO, falling back to a placeholder.
pub async fn resolve_dao_metadata(ipfs: Option<&dyn IpfsClient>, uri: Option<&str>) -> DaoMetadata {
    let uri = match uri.map(str::trim) {
        None | Some("") => return DaoMetadata::unavailable(),
        Some(uri) => uri,
    };

    match fetch_json(ipfs, uri).await {
        Ok(metadata) => metadata,
        Err(Error::InvalidCid(_)) => {
            debug!(target: "dao-sdk::dao", "Unsupported DAO metadata link: {}", uri);
            DaoMetadata::unsupported_link()
        }
        Err(e) => {
            warn!(target: "dao-sdk::dao", "DAO metadata {} unavailable: {}", uri, e);
            DaoMetadata::unavailable()
        }
    }
}

/// Plugin installed on a DAO
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstalledPluginListItem {
    pub instance_address: Address,
    /// ENS name of the plugin repository
    pub id: String,
    pub release: u8,
    pub build: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoDetails {
    pub address: Address,
    /// `None` for DAOs registered without a subdomain
    pub ens_domain: Option<String>,
    pub metadata: DaoMetadata,
    pub creation_date: Timestamp,
    pub plugins: Vec<InstalledPluginListItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoMetadataSummary {
    pub name: String,
    pub description: String,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaoListItem {
    pub address: Address,
    pub ens_domain: Option<String>,
    pub metadata: DaoMetadataSummary,
    pub plugins: Vec<InstalledPluginListItem>,
}

/// Asset held or moved by a DAO
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asset {
    Native,
    Token(TokenDetails),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetBalance {
    pub asset: Asset,
    pub balance: BigUint,
    pub update_date: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferType {
    Deposit,
    Withdraw,
}

impl TransferType {
    pub fn to_indexer(self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdraw => "Withdraw",
        }
    }

    pub fn from_indexer(value: &str) -> Result<Self> {
        match value {
            "Deposit" => Ok(Self::Deposit),
            "Withdraw" => Ok(Self::Withdraw),
            _ => Err(Error::ParseFailed(format!("transfer type {}", value))),
        }
    }
}

/// Asset movement in or out of a DAO
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub transfer_type: TransferType,
    pub asset: Asset,
    pub amount: BigUint,
    pub creation_date: Timestamp,
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    /// Proposal that executed a withdrawal
    pub proposal_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPreparation {
    plugin_address: String,
}

#[derive(Clone, Debug, Deserialize)]
struct RawPluginRepo {
    subdomain: String,
}

#[derive(Clone, Debug, Deserialize)]
struct RawRelease {
    release: u8,
}

#[derive(Clone, Debug, Deserialize)]
struct RawVersion {
    build: u16,
    release: RawRelease,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstalledPlugin {
    applied_preparation: Option<RawPreparation>,
    applied_plugin_repo: Option<RawPluginRepo>,
    applied_version: Option<RawVersion>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDaoRecord {
    pub id: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub metadata: Option<String>,
    pub created_at: String,
    #[serde(default)]
    plugins: Vec<RawInstalledPlugin>,
}

impl RawDaoRecord {
    fn ens_domain(&self) -> Option<String> {
        (!self.subdomain.is_empty()).then(|| format!("{}.dao.eth", self.subdomain))
    }

    /// Plugins whose installation was applied. Prepared but not yet
    /// applied installations are left out.
    fn plugins(&self) -> Result<Vec<InstalledPluginListItem>> {
        self.plugins
            .iter()
            .filter_map(|p| {
                match (&p.applied_preparation, &p.applied_plugin_repo, &p.applied_version) {
                    (Some(preparation), Some(repo), Some(version)) => {
                        Some((preparation, repo, version))
                    }
                    _ => None,
                }
            })
            .map(|(preparation, repo, version)| {
                Ok(InstalledPluginListItem {
                    instance_address: parse_address(&preparation.plugin_address)?,
                    id: format!("{}.plugin.dao.eth", repo.subdomain),
                    release: version.release.release,
                    build: version.build,
                })
            })
            .collect()
    }
}

pub fn assemble_dao(raw: &RawDaoRecord, metadata: DaoMetadata) -> Result<DaoDetails> {
    Ok(DaoDetails {
        address: parse_address(&raw.id)?,
        ens_domain: raw.ens_domain(),
        metadata,
        creation_date: parse_timestamp(&raw.created_at)?,
        plugins: raw.plugins()?,
    })
}

pub fn assemble_dao_list_item(raw: &RawDaoRecord, metadata: DaoMetadata) -> Result<DaoListItem> {
    Ok(DaoListItem {
        address: parse_address(&raw.id)?,
        ens_domain: raw.ens_domain(),
        metadata: DaoMetadataSummary {
            name: metadata.name,
            description: metadata.description,
            avatar: metadata.avatar,
        },
        plugins: raw.plugins()?,
    })
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawAssetToken {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// `typename` is one of `NativeBalance`, `ERC20Balance`, `ERC721Balance`
/// or the matching `*Transfer` names
fn parse_asset(typename: &str, token: Option<&RawAssetToken>) -> Result<Asset> {
    let kind = typename.strip_suffix("Balance").or_else(|| typename.strip_suffix("Transfer"));

    match (kind, token) {
        (Some("Native"), _) => Ok(Asset::Native),
        (Some("ERC20"), Some(token)) => Ok(Asset::Token(TokenDetails::Erc20 {
            address: parse_address(&token.id)?,
            name: token.name.clone(),
            symbol: token.symbol.clone(),
            decimals: token.decimals.unwrap_or(18),
        })),
        (Some("ERC721"), Some(token)) => Ok(Asset::Token(TokenDetails::Erc721 {
            address: parse_address(&token.id)?,
            name: token.name.clone(),
            symbol: token.symbol.clone(),
        })),
        _ => Err(Error::ParseFailed(format!("unknown asset {}", typename))),
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBalance {
    #[serde(rename = "__typename")]
    pub typename: String,
    pub last_updated: String,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub token: Option<RawAssetToken>,
}

impl RawBalance {
    pub fn parse(&self) -> Result<AssetBalance> {
        let balance = match &self.balance {
            Some(balance) => parse_big(balance)?,
            None => BigUint::zero(),
        };

        Ok(AssetBalance {
            asset: parse_asset(&self.typename, self.token.as_ref())?,
            balance,
            update_date: parse_timestamp(&self.last_updated)?,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawProposalRef {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransfer {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub from: String,
    pub to: String,
    pub tx_hash: String,
    pub created_at: String,
    #[serde(default)]
    pub proposal: Option<RawProposalRef>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token: Option<RawAssetToken>,
}

impl RawTransfer {
    pub fn parse(&self) -> Result<Transfer> {
        // ERC721 transfers move a single token and carry no amount
        let amount = match &self.amount {
            Some(amount) => parse_big(amount)?,
            None => BigUint::one(),
        };
        let tx_hash = parse_tx_hash(Some(&self.tx_hash))?
            .ok_or_else(|| Error::ParseFailed("empty transfer tx hash".to_string()))?;

        Ok(Transfer {
            transfer_type: TransferType::from_indexer(&self.transfer_type)?,
            asset: parse_asset(&self.typename, self.token.as_ref())?,
            amount,
            creation_date: parse_timestamp(&self.created_at)?,
            tx_hash,
            from: parse_address(&self.from)?,
            to: parse_address(&self.to)?,
            proposal_id: self.proposal.as_ref().map(|p| p.id.clone()),
        })
    }
}
