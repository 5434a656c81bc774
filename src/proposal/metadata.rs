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

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    ipfs::{fetch_json, pin_content, IpfsClient},
    Error, Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResource {
    pub url: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Human readable information about a proposal, stored off-chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub title: String,
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub resources: Vec<ProposalResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<ProposalMedia>,
}

/// Short version of [`ProposalMetadata`] used by list items
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalMetadataSummary {
    pub title: String,
    pub summary: String,
}

impl ProposalMetadata {
    fn placeholder(title: &str, summary: &str) -> Self {
        Self {
            title: title.to_string(),
            summary: summary.to_string(),
            description: String::new(),
            resources: vec![],
            media: None,
        }
    }

    /// The proposal was created without metadata.
    pub fn empty() -> Self {
        Self::placeholder("(No proposal metadata)", "(the current proposal has no metadata)")
    }

    /// The metadata reference is not a supported content link.
    pub fn unsupported_link() -> Self {
        Self::placeholder(
            "(unsupported metadata link)",
            "(the metadata link is not supported)",
        )
    }

    /// The metadata exists but could not be fetched or parsed.
    pub fn unavailable() -> Self {
        Self::placeholder("(unavailable metadata)", "(the proposal metadata is not available)")
    }

    pub fn summary(&self) -> ProposalMetadataSummary {
        ProposalMetadataSummary { title: self.title.clone(), summary: self.summary.clone() }
    }
}

/// Fetch and parse the metadata behind `uri`.
///
/// Failures never propagate: they are turned into one of the
/// placeholders so a proposal can always be assembled.
pub async fn resolve_metadata(ipfs: Option<&dyn IpfsClient>, uri: Option<&str>) -> ProposalMetadata {
    let uri = match uri.map(str::trim) {
        None | Some("") => return ProposalMetadata::empty(),
        Some(uri) => uri,
    };

    match fetch_json(ipfs, uri).await {
        Ok(metadata) => metadata,
        Err(Error::InvalidCid(_)) => {
            debug!(target: "dao-sdk::metadata", "Unsupported metadata link: {}", uri);
            ProposalMetadata::unsupported_link()
        }
        Err(e) => {
            warn!(target: "dao-sdk::metadata", "Metadata {} unavailable: {}", uri, e);
            ProposalMetadata::unavailable()
        }
    }
}

/// Pin proposal metadata on IPFS, returning its `ipfs://` reference.
pub async fn pin_metadata(
    ipfs: Option<&dyn IpfsClient>,
    metadata: &ProposalMetadata,
) -> Result<String> {
    let content = serde_json::to_string(metadata)?;
    pin_content(ipfs, &content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const CID: &str = "QmXhJ7o3ztd6pxVXMsFiBjWGHFJt8gNdeaLJWCJ6PXFbkz";

    struct FixedIpfs(Option<String>);

    #[async_trait]
    impl IpfsClient for FixedIpfs {
        async fn fetch_string(&self, cid: &str) -> Result<String> {
            self.0.clone().ok_or_else(|| Error::IpfsUnavailable(cid.to_string()))
        }

        async fn add(&self, _content: &str) -> Result<String> {
            Ok(CID.to_string())
        }

        async fn pin(&self, _cid: &str) -> Result<()> {
            Ok(())
        }
    }

    fn resolve(ipfs: Option<&dyn IpfsClient>, uri: Option<&str>) -> ProposalMetadata {
        smol::block_on(resolve_metadata(ipfs, uri))
    }

    #[test]
    fn placeholders() {
        let uri = format!("ipfs://{}", CID);
        let ipfs = FixedIpfs(Some("not json".to_string()));

        assert_eq!(resolve(Some(&ipfs), None), ProposalMetadata::empty());
        assert_eq!(resolve(Some(&ipfs), Some("  ")), ProposalMetadata::empty());
        assert_eq!(resolve(Some(&ipfs), Some("https://x.org/m.json")), ProposalMetadata::unsupported_link());
        assert_eq!(resolve(Some(&ipfs), Some(&uri)), ProposalMetadata::unavailable());
        assert_eq!(resolve(Some(&FixedIpfs(None)), Some(&uri)), ProposalMetadata::unavailable());
        assert_eq!(resolve(None, Some(&uri)), ProposalMetadata::unavailable());
    }

    #[test]
    fn resolved_metadata() -> Result<()> {
        let metadata = ProposalMetadata {
            title: "Fund the treasury".to_string(),
            summary: "Move funds".to_string(),
            description: "Longer text".to_string(),
            resources: vec![ProposalResource {
                url: "https://dark.fi".to_string(),
                name: "Site".to_string(),
            }],
            media: None,
        };

        let ipfs = FixedIpfs(Some(serde_json::to_string(&metadata)?));
        let uri = smol::block_on(pin_metadata(Some(&ipfs), &metadata))?;
        assert_eq!(uri, format!("ipfs://{}", CID));
        assert_eq!(resolve(Some(&ipfs), Some(&uri)), metadata);
        assert_eq!(metadata.summary().title, "Fund the treasury");
        Ok(())
    }
}
