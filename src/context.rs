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

//! Client context: deployment addresses and external collaborators.

use std::{fs, sync::Arc};

use ethers::{
    providers::{Http, Provider},
    types::Address,
};
use log::info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    indexer::{HttpIndexerClient, IndexerClient},
    ipfs::{HttpIpfsClient, IpfsClient},
    util::path::expand_path,
    web3::{EthersWeb3, Web3},
    Error, Result,
};

/// Addresses of the governance framework contracts on a network
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeployment {
    /// Deploys new DAOs together with their plugins
    pub dao_factory: Address,
    /// Prepares plugin installations on existing DAOs
    pub plugin_setup_processor: Address,
    pub multisig_repo: Address,
    pub addresslist_voting_repo: Address,
    pub token_voting_repo: Address,
}

fn default_confirmations() -> usize {
    1
}

/// Parsed configuration, usually read from a TOML file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextParams {
    /// Network name, informative
    pub network: String,

    /// Web3 JSON-RPC endpoint
    #[serde(default)]
    pub web3_provider: Option<Url>,

    /// IPFS node HTTP API endpoints, tried in order
    #[serde(default)]
    pub ipfs_nodes: Vec<Url>,

    /// Indexer GraphQL endpoint
    #[serde(default)]
    pub indexer_url: Option<Url>,

    /// Block confirmations to wait for on submitted transactions
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,

    /// Framework contract addresses
    pub deployment: NetworkDeployment,
}

impl ContextParams {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read parameters from a TOML file, `~` is expanded.
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path)?;
        let contents = fs::read_to_string(&path)?;
        info!(target: "dao-sdk::context", "Loaded configuration from {:?}", path);
        Self::from_toml_str(&contents)
    }
}

/// Everything a plugin client needs: the deployment it talks to and the
/// collaborators it goes through. Missing collaborators are reported
/// when an operation needs them.
#[derive(Clone)]
pub struct Context {
    pub network: String,
    pub deployment: NetworkDeployment,
    web3: Option<Arc<dyn Web3>>,
    ipfs: Option<Arc<dyn IpfsClient>>,
    indexer: Option<Arc<dyn IndexerClient>>,
}

impl Context {
    pub fn new(network: &str, deployment: NetworkDeployment) -> Self {
        Self { network: network.to_string(), deployment, web3: None, ipfs: None, indexer: None }
    }

    /// Build a context with HTTP collaborators out of parsed parameters.
    /// The web3 side is read-only; use [`Context::with_web3`] to plug
    /// in a signing middleware.
    pub fn from_params(params: &ContextParams) -> Result<Self> {
        let mut ctx = Self::new(&params.network, params.deployment.clone());

        if let Some(url) = &params.web3_provider {
            let provider = Provider::<Http>::try_from(url.as_str())
                .map_err(|e| Error::Custom(format!("Invalid web3 provider URL: {}", e)))?;
            ctx = ctx.with_web3(Arc::new(EthersWeb3::new(Arc::new(provider), params.confirmations)));
        }

        if !params.ipfs_nodes.is_empty() {
            ctx = ctx.with_ipfs(Arc::new(HttpIpfsClient::new(params.ipfs_nodes.clone())));
        }

        if let Some(url) = &params.indexer_url {
            ctx = ctx.with_indexer(Arc::new(HttpIndexerClient::new(url.clone())));
        }

        Ok(ctx)
    }

    pub fn with_web3(mut self, web3: Arc<dyn Web3>) -> Self {
        self.web3 = Some(web3);
        self
    }

    pub fn with_ipfs(mut self, ipfs: Arc<dyn IpfsClient>) -> Self {
        self.ipfs = Some(ipfs);
        self
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn IndexerClient>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn web3(&self) -> Result<&Arc<dyn Web3>> {
        self.web3.as_ref().ok_or(Error::ProviderMissing)
    }

    /// The web3 capability together with its connected signer.
    pub fn signer(&self) -> Result<(&Arc<dyn Web3>, Address)> {
        let web3 = self.web3()?;
        let signer = web3.signer_address().ok_or(Error::SignerMissing)?;
        Ok((web3, signer))
    }

    pub fn ipfs(&self) -> Option<&Arc<dyn IpfsClient>> {
        self.ipfs.as_ref()
    }

    pub fn indexer(&self) -> Result<&Arc<dyn IndexerClient>> {
        self.indexer.as_ref().ok_or(Error::IndexerMissing)
    }
}
