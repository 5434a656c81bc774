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

//! Content-addressed storage used for proposal metadata.

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::{Error, Result};

lazy_static! {
    /// `ipfs://` reference to a CIDv0 or a multibase CIDv1
    static ref IPFS_URI_REGEX: Regex = Regex::new(
        r"^ipfs://(Qm[1-9A-HJ-NP-Za-km-z]{44,}|b[A-Za-z2-7]{58,}|B[A-Z2-7]{58,}|z[1-9A-HJ-NP-Za-km-z]{48,}|F[0-9A-F]{50,})(/.*)?$"
    )
    .unwrap();
}

/// Extract the CID out of an `ipfs://<cid>` reference.
pub fn resolve_ipfs_cid(uri: &str) -> Result<String> {
    match IPFS_URI_REGEX.captures(uri).and_then(|c| c.get(1)) {
        Some(cid) => Ok(cid.as_str().to_string()),
        None => Err(Error::InvalidCid(uri.to_string())),
    }
}

/// Content-addressed storage capability
#[async_trait]
pub trait IpfsClient: Send + Sync {
    /// Fetch the content behind `cid` as a UTF-8 string.
    async fn fetch_string(&self, cid: &str) -> Result<String>;

    /// Store `content`, returning its CID.
    async fn add(&self, content: &str) -> Result<String>;

    /// Pin an already stored CID.
    async fn pin(&self, cid: &str) -> Result<()>;
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

const MULTIPART_BOUNDARY: &str = "dao-sdk-ipfs-boundary";

/// Multipart boundary that does not occur in `content`.
fn multipart_boundary(content: &str) -> String {
    let mut boundary = MULTIPART_BOUNDARY.to_string();
    let mut n = 0u64;
    while content.contains(&boundary) {
        n += 1;
        boundary = format!("{}-{:x}", MULTIPART_BOUNDARY, n);
    }
    boundary
}

/// [`IpfsClient`] speaking the IPFS node HTTP API (`/api/v0`).
/// Nodes are tried in order until one answers.
#[derive(Clone, Debug)]
pub struct HttpIpfsClient {
    nodes: Vec<Url>,
}

impl HttpIpfsClient {
    pub fn new(nodes: Vec<Url>) -> Self {
        Self { nodes }
    }

    async fn post(&self, method: &str, arg: Option<&str>, body: Option<&str>) -> Result<String> {
        if self.nodes.is_empty() {
            return Err(Error::IpfsUnavailable("No IPFS nodes configured".to_string()))
        }

        let mut last_err = String::new();
        for node in &self.nodes {
            let mut endpoint = node.join(&format!("api/v0/{}", method))?;
            if let Some(arg) = arg {
                endpoint.query_pairs_mut().append_pair("arg", arg);
            }

            let mut req = surf::post(endpoint.as_str());
            if let Some(content) = body {
                let boundary = multipart_boundary(content);
                let multipart = format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"data\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
                    b = boundary,
                    c = content,
                );
                req = req
                    .header("Content-Type", format!("multipart/form-data; boundary={}", boundary))
                    .body(multipart);
            }

            let mut rep = match req.await {
                Ok(v) => v,
                Err(e) => {
                    last_err = format!("Failed sending IPFS {} request to {}: {}", method, node, e);
                    error!(target: "dao-sdk::ipfs", "{}", last_err);
                    continue
                }
            };

            if !rep.status().is_success() {
                last_err = format!("IPFS node {} answered {} to {}", node, rep.status(), method);
                error!(target: "dao-sdk::ipfs", "{}", last_err);
                continue
            }

            match rep.body_string().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    last_err = format!("Failed reading IPFS {} response: {}", method, e);
                    error!(target: "dao-sdk::ipfs", "{}", last_err);
                }
            }
        }

        Err(Error::IpfsUnavailable(last_err))
    }
}

#[async_trait]
impl IpfsClient for HttpIpfsClient {
    async fn fetch_string(&self, cid: &str) -> Result<String> {
        debug!(target: "dao-sdk::ipfs", "Fetching {}", cid);
        self.post("cat", Some(cid), None).await
    }

    async fn add(&self, content: &str) -> Result<String> {
        let rep = self.post("add", None, Some(content)).await?;
        let rep: AddResponse = serde_json::from_str(&rep)?;
        debug!(target: "dao-sdk::ipfs", "Added content as {}", rep.hash);
        Ok(rep.hash)
    }

    async fn pin(&self, cid: &str) -> Result<()> {
        self.post("pin/add", Some(cid), None).await?;
        Ok(())
    }
}

/// Fetch the JSON document behind an `ipfs://` reference.
///
/// Fails with `InvalidCid` when `uri` is not a supported link and with
/// `MetadataUnparseable` when the content does not parse as `T`.
pub async fn fetch_json<T: DeserializeOwned>(ipfs: Option<&dyn IpfsClient>, uri: &str) -> Result<T> {
    let cid = resolve_ipfs_cid(uri.trim())?;
    let Some(ipfs) = ipfs else {
        return Err(Error::IpfsUnavailable("No IPFS client configured".to_string()))
    };

    let raw = ipfs.fetch_string(&cid).await?;
    serde_json::from_str(&raw).map_err(|e| Error::MetadataUnparseable(e.to_string()))
}

/// Store and pin `content`, returning its `ipfs://` reference.
pub async fn pin_content(ipfs: Option<&dyn IpfsClient>, content: &str) -> Result<String> {
    let Some(ipfs) = ipfs else {
        error!(target: "dao-sdk::ipfs", "No IPFS client configured to pin content with");
        return Err(Error::IpfsPinFailed)
    };

    let cid = match ipfs.add(content).await {
        Ok(cid) => cid,
        Err(e) => {
            error!(target: "dao-sdk::ipfs", "Failed adding content: {}", e);
            return Err(Error::IpfsPinFailed)
        }
    };

    if let Err(e) = ipfs.pin(&cid).await {
        error!(target: "dao-sdk::ipfs", "Failed pinning {}: {}", cid, e);
        return Err(Error::IpfsPinFailed)
    }

    Ok(format!("ipfs://{}", cid))
}
