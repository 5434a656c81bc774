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

use ethers::{
    abi::{encode, ParamType, Token},
    types::{Address, U256},
};
use num_bigint::BigUint;
use serde::Deserialize;
use serde_json::json;

use super::{
    find_interface,
    majority::MajorityVotingPlugin,
    queries::{self, MajorityQueries},
    PluginInstallItem, VotingSettings,
};
use crate::{
    abi::{decode_call, encode_call, expect_address, expect_uint, MINT, UPDATE_VOTING_SETTINGS},
    context::Context,
    indexer::{query_entity, query_list},
    proposal::{
        assemble::{parse_big, parse_token, RawAccount, RawTokenPlugin},
        DaoAction, TokenDetails,
    },
    util::address::{parse_address, to_indexer_address},
    Error, Result,
};

/// Functions a DAO action targeting this plugin may call
pub const AVAILABLE_FUNCTION_SIGNATURES: [&str; 2] = [UPDATE_VOTING_SETTINGS, MINT];

/// Holder of the voting token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenVotingMember {
    pub address: Address,
    pub balance: BigUint,
    pub voting_power: BigUint,
    /// `None` when the member votes with its own power
    pub delegatee: Option<Address>,
    pub delegators: Vec<TokenVotingDelegator>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenVotingDelegator {
    pub address: Address,
    pub balance: BigUint,
}

/// Token a new token voting plugin counts votes with
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenVotingTokenParams {
    /// Wrap an existing ERC20
    Existing { address: Address, wrapped_name: String, wrapped_symbol: String },
    /// Deploy a governance ERC20 minting `balances`
    New { name: String, symbol: String, balances: Vec<(Address, U256)> },
}

/// Initialization parameters of a new token voting plugin
#[derive(Clone, Debug, PartialEq)]
pub struct TokenVotingInstallParams {
    pub voting_settings: VotingSettings,
    pub token: TokenVotingTokenParams,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintTokenParams {
    pub address: Address,
    pub amount: U256,
}

#[derive(Deserialize)]
struct RawDelegator {
    address: String,
    balance: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenVotingMember {
    address: String,
    balance: String,
    voting_power: String,
    #[serde(default)]
    delegatee: Option<RawAccount>,
    #[serde(default)]
    delegators: Vec<RawDelegator>,
}

impl RawTokenVotingMember {
    fn parse(&self) -> Result<TokenVotingMember> {
        let address = parse_address(&self.address)?;
        let delegatee = match &self.delegatee {
            Some(d) => Some(parse_address(&d.address)?).filter(|d| *d != address),
            None => None,
        };

        // A self-delegating member shows up among its own delegators
        let delegators = self
            .delegators
            .iter()
            .map(|d| {
                Ok(TokenVotingDelegator {
                    address: parse_address(&d.address)?,
                    balance: parse_big(&d.balance)?,
                })
            })
            .filter(|d: &Result<TokenVotingDelegator>| {
                d.as_ref().map_or(true, |d| d.address != address)
            })
            .collect::<Result<_>>()?;

        Ok(TokenVotingMember {
            address,
            balance: parse_big(&self.balance)?,
            voting_power: parse_big(&self.voting_power)?,
            delegatee,
            delegators,
        })
    }
}

/// Client of the token voting plugin, where votes weigh the voting
/// power of an ERC20 or ERC721 token.
#[derive(Clone)]
pub struct TokenVotingClient {
    ctx: Context,
}

impl TokenVotingClient {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn get_members(&self, plugin_address: &str) -> Result<Vec<TokenVotingMember>> {
        let address = parse_address(plugin_address)?;
        let raws: Vec<RawTokenVotingMember> = query_list(
            self.ctx.indexer()?.as_ref(),
            queries::TOKEN_VOTING_MEMBERS,
            "tokenVotingMembers",
            json!({ "where": { "plugin": to_indexer_address(&address) } }),
        )
        .await?;

        raws.iter().map(RawTokenVotingMember::parse).collect()
    }

    /// Token the plugin counts votes with, `None` for an unknown plugin
    /// or an unsupported token standard.
    pub async fn get_token(&self, plugin_address: &str) -> Result<Option<TokenDetails>> {
        let address = parse_address(plugin_address)?;
        let plugin: Option<RawTokenPlugin> = query_entity(
            self.ctx.indexer()?.as_ref(),
            queries::TOKEN_VOTING_TOKEN,
            "tokenVotingPlugin",
            json!({ "address": to_indexer_address(&address) }),
        )
        .await?;

        parse_token(plugin.as_ref())
    }

    /// Install item to pass along a DAO creation.
    pub fn get_plugin_install_item(
        &self,
        params: &TokenVotingInstallParams,
    ) -> Result<PluginInstallItem> {
        let (token, name, symbol, balances) = match &params.token {
            TokenVotingTokenParams::Existing { address, wrapped_name, wrapped_symbol } => {
                (*address, wrapped_name, wrapped_symbol, &[][..])
            }
            TokenVotingTokenParams::New { name, symbol, balances } => {
                (Address::zero(), name, symbol, &balances[..])
            }
        };

        let data = encode(&[
            params.voting_settings.to_token()?,
            Token::Tuple(vec![
                Token::Address(token),
                Token::String(name.clone()),
                Token::String(symbol.clone()),
            ]),
            Token::Tuple(vec![
                Token::Array(balances.iter().map(|(a, _)| Token::Address(*a)).collect()),
                Token::Array(balances.iter().map(|(_, b)| Token::Uint(*b)).collect()),
            ]),
        ]);

        Ok(PluginInstallItem { id: self.ctx.deployment.token_voting_repo, data })
    }

    /// DAO action minting governance tokens.
    pub fn mint_token_action(&self, token_address: Address, params: &MintTokenParams) -> DaoAction {
        let data = encode_call(MINT, &[Token::Address(params.address), Token::Uint(params.amount)]);
        DaoAction::new(token_address, U256::zero(), data)
    }

    pub fn decode_mint_token_action(&self, data: &[u8]) -> Result<MintTokenParams> {
        let tokens = decode_call(MINT, &[ParamType::Address, ParamType::Uint(256)], data)?;
        let [address, amount]: [Token; 2] = tokens
            .try_into()
            .map_err(|_| Error::AbiError("Malformed mint arguments".to_string()))?;
        Ok(MintTokenParams { address: expect_address(address)?, amount: expect_uint(amount)? })
    }

    /// Signature of the function `data` calls, if any.
    pub fn find_interface(&self, data: &[u8]) -> Option<&'static str> {
        find_interface(&AVAILABLE_FUNCTION_SIGNATURES, data)
    }
}

impl MajorityVotingPlugin for TokenVotingClient {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn queries(&self) -> &'static MajorityQueries {
        &queries::TOKEN_VOTING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{abi::voting_settings_param, context::NetworkDeployment, plugin::VotingMode};

    fn client() -> TokenVotingClient {
        let deployment = NetworkDeployment {
            token_voting_repo: Address::from_low_u64_be(0xb2),
            ..Default::default()
        };
        TokenVotingClient::new(Context::new("local", deployment))
    }

    fn settings() -> VotingSettings {
        VotingSettings {
            support_threshold: 0.5,
            min_participation: 0.15,
            min_duration: 86400,
            min_proposer_voting_power: U256::from(10),
            voting_mode: VotingMode::EarlyExecution,
        }
    }

    #[test]
    fn mint_action() -> Result<()> {
        let client = client();
        let token = Address::from_low_u64_be(0x70);
        let params = MintTokenParams { address: Address::from_low_u64_be(3), amount: U256::exp10(18) };

        let action = client.mint_token_action(token, &params);
        assert_eq!(action.to, token);
        assert_eq!(hex::encode(&action.data[..4]), "40c10f19");
        assert_eq!(client.decode_mint_token_action(&action.data)?, params);
        assert_eq!(client.find_interface(&action.data), Some(MINT));
        Ok(())
    }

    #[test]
    fn install_item_new_token() -> Result<()> {
        let client = client();
        let holder = Address::from_low_u64_be(9);
        let params = TokenVotingInstallParams {
            voting_settings: settings(),
            token: TokenVotingTokenParams::New {
                name: "Builders".to_string(),
                symbol: "BLD".to_string(),
                balances: vec![(holder, U256::from(500))],
            },
        };

        let item = client.get_plugin_install_item(&params)?;
        assert_eq!(item.id, Address::from_low_u64_be(0xb2));

        let mut tokens = ethers::abi::decode(
            &[
                voting_settings_param(),
                ParamType::Tuple(vec![ParamType::Address, ParamType::String, ParamType::String]),
                ParamType::Tuple(vec![
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Array(Box::new(ParamType::Uint(256))),
                ]),
            ],
            &item.data,
        )?;

        assert_eq!(VotingSettings::from_token(tokens.remove(0))?, settings());
        assert_eq!(
            tokens.remove(0),
            Token::Tuple(vec![
                Token::Address(Address::zero()),
                Token::String("Builders".to_string()),
                Token::String("BLD".to_string()),
            ])
        );
        assert_eq!(
            tokens.remove(0),
            Token::Tuple(vec![
                Token::Array(vec![Token::Address(holder)]),
                Token::Array(vec![Token::Uint(U256::from(500))]),
            ])
        );
        Ok(())
    }

    #[test]
    fn members_delegation() -> Result<()> {
        let raw: RawTokenVotingMember = serde_json::from_value(json!({
            "address": "0x1111111111111111111111111111111111111111",
            "balance": "100",
            "votingPower": "0",
            "delegatee": { "address": "0x2222222222222222222222222222222222222222" },
            "delegators": []
        }))?;
        let member = raw.parse()?;
        assert_eq!(member.delegatee, Some(Address::repeat_byte(0x22)));
        assert_eq!(member.balance, BigUint::from(100u32));

        // Self delegation reads as no delegation
        let raw: RawTokenVotingMember = serde_json::from_value(json!({
            "address": "0x1111111111111111111111111111111111111111",
            "balance": "100",
            "votingPower": "150",
            "delegatee": { "address": "0x1111111111111111111111111111111111111111" },
            "delegators": [
                { "address": "0x3333333333333333333333333333333333333333", "balance": "50" }
            ]
        }))?;
        let member = raw.parse()?;
        assert_eq!(member.delegatee, None);
        assert_eq!(member.voting_power, BigUint::from(150u32));
        assert_eq!(member.delegators.len(), 1);
        assert_eq!(member.delegators[0].balance, BigUint::from(50u32));

        let raw: RawTokenVotingMember = serde_json::from_value(json!({
            "address": "0x5555555555555555555555555555555555555555",
            "balance": "10",
            "votingPower": "60",
            "delegatee": { "address": "0x5555555555555555555555555555555555555555" },
            "delegators": [
                { "address": "0x5555555555555555555555555555555555555555", "balance": "10" },
                { "address": "0x3333333333333333333333333333333333333333", "balance": "50" }
            ]
        }))?;
        let member = raw.parse()?;
        assert_eq!(member.delegatee, None);
        assert_eq!(member.delegators.len(), 1);
        assert_eq!(member.delegators[0].address, Address::repeat_byte(0x33));

        let raw: RawTokenVotingMember = serde_json::from_value(json!({
            "address": "0x5555555555555555555555555555555555555555",
            "balance": "10",
            "votingPower": "10",
            "delegatee": { "address": "0x5555555555555555555555555555555555555555" },
            "delegators": [
                { "address": "0x5555555555555555555555555555555555555555", "balance": "10" }
            ]
        }))?;
        assert!(raw.parse()?.delegators.is_empty());
        Ok(())
    }
}
