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

//! Indexer query service. The indexer exposes a GraphQL endpoint with
//! one entity per plugin proposal type.

use async_trait::async_trait;
use log::{debug, error};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use url::Url;

use crate::{Error, Result};

/// Indexer query capability
#[async_trait]
pub trait IndexerClient: Send + Sync {
    /// Run `query` with `variables`, returning the `data` object.
    async fn request(&self, query: &str, variables: Value) -> Result<Value>;
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

/// [`IndexerClient`] posting GraphQL requests over HTTP.
#[derive(Clone, Debug)]
pub struct HttpIndexerClient {
    endpoint: Url,
}

impl HttpIndexerClient {
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl IndexerClient for HttpIndexerClient {
    async fn request(&self, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        debug!(target: "dao-sdk::indexer", "--> {}", body);

        let client = surf::Client::new();
        let mut rep = match client
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
        {
            Ok(v) => v,
            Err(e) => {
                let e = format!("Failed sending indexer request: {}", e);
                error!(target: "dao-sdk::indexer", "{}", e);
                return Err(Error::IndexerError(e))
            }
        };

        let rep: GraphqlResponse = match rep.body_string().await {
            Ok(v) => serde_json::from_str(&v)?,
            Err(e) => {
                let e = format!("Failed reading indexer response: {}", e);
                error!(target: "dao-sdk::indexer", "{}", e);
                return Err(Error::IndexerError(e))
            }
        };

        if !rep.errors.is_empty() {
            let e = rep.errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            error!(target: "dao-sdk::indexer", "Indexer returned errors: {}", e);
            return Err(Error::IndexerError(e))
        }

        Ok(rep.data.unwrap_or(Value::Null))
    }
}

/// Run a query and deserialize `data.<field>`. A missing or `null`
/// field gives `None`.
pub async fn query_entity<T: DeserializeOwned>(
    indexer: &dyn IndexerClient,
    query: &str,
    field: &str,
    variables: Value,
) -> Result<Option<T>> {
    let mut data = indexer.request(query, variables).await?;
    match data.get_mut(field).map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}

/// Like [`query_entity`] for list fields, a missing field is an empty list.
pub async fn query_list<T: DeserializeOwned>(
    indexer: &dyn IndexerClient,
    query: &str,
    field: &str,
    variables: Value,
) -> Result<Vec<T>> {
    Ok(query_entity(indexer, query, field, variables).await?.unwrap_or_default())
}
