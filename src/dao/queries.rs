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

//! GraphQL queries of DAO records.

pub const DAO: &str = r#"
query Dao($address: ID!) {
  dao(id: $address) {
    id
    subdomain
    metadata
    createdAt
    plugins {
      appliedPreparation { pluginAddress }
      appliedPluginRepo { subdomain }
      appliedVersion { build release { release } }
    }
  }
}"#;

pub const DAOS: &str = r#"
query Daos($limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: Dao_orderBy!) {
  daos(first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    id
    subdomain
    metadata
    createdAt
    plugins {
      appliedPreparation { pluginAddress }
      appliedPluginRepo { subdomain }
      appliedVersion { build release { release } }
    }
  }
}"#;

pub const TOKEN_BALANCES: &str = r#"
query TokenBalances($where: TokenBalance_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: TokenBalance_orderBy!) {
  tokenBalances(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    __typename
    lastUpdated
    ... on ERC20Balance {
      balance
      token { id name symbol decimals }
    }
    ... on ERC721Balance {
      token { id name symbol }
    }
    ... on NativeBalance {
      balance
    }
  }
}"#;

pub const TOKEN_TRANSFERS: &str = r#"
query TokenTransfers($where: TokenTransfer_filter!, $limit: Int!, $skip: Int!, $direction: OrderDirection!, $sortBy: TokenTransfer_orderBy!) {
  tokenTransfers(where: $where, first: $limit, skip: $skip, orderDirection: $direction, orderBy: $sortBy) {
    __typename
    type
    from
    to
    txHash
    createdAt
    proposal { id }
    ... on ERC20Transfer {
      amount
      token { id name symbol decimals }
    }
    ... on ERC721Transfer {
      token { id name symbol }
    }
    ... on NativeTransfer {
      amount
    }
  }
}"#;
