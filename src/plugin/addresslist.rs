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
    abi::{encode, Token},
    types::Address,
};

use super::{
    address_array, address_list_action, decode_address_list, find_interface,
    majority::MajorityVotingPlugin, plugin_members,
    queries::{self, MajorityQueries},
    PluginInstallItem, VotingSettings,
};
use crate::{
    abi::{decode_call, ADD_ADDRESSES, REMOVE_ADDRESSES, UPDATE_VOTING_SETTINGS},
    context::Context,
    proposal::DaoAction,
    Result,
};

/// Functions a DAO action targeting this plugin may call
pub const AVAILABLE_FUNCTION_SIGNATURES: [&str; 3] =
    [UPDATE_VOTING_SETTINGS, ADD_ADDRESSES, REMOVE_ADDRESSES];

/// Initialization parameters of a new addresslist voting plugin
#[derive(Clone, Debug, PartialEq)]
pub struct AddresslistVotingInstallParams {
    pub voting_settings: VotingSettings,
    /// Initial voters
    pub addresses: Vec<Address>,
}

/// Client of the addresslist voting plugin, where every listed address
/// holds one vote.
#[derive(Clone)]
pub struct AddresslistVotingClient {
    ctx: Context,
}

impl AddresslistVotingClient {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Addresses currently allowed to vote.
    pub async fn get_members(&self, plugin_address: &str) -> Result<Vec<Address>> {
        plugin_members(
            &self.ctx,
            queries::ADDRESSLIST_VOTING_MEMBERS,
            "addresslistVotingPlugin",
            plugin_address,
        )
        .await
    }

    /// Install item to pass along a DAO creation.
    pub fn get_plugin_install_item(
        &self,
        params: &AddresslistVotingInstallParams,
    ) -> Result<PluginInstallItem> {
        let data = encode(&[
            params.voting_settings.to_token()?,
            Token::Array(params.addresses.iter().copied().map(Token::Address).collect()),
        ]);
        Ok(PluginInstallItem { id: self.ctx.deployment.addresslist_voting_repo, data })
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

    pub fn decode_add_addresses_action(&self, data: &[u8]) -> Result<Vec<Address>> {
        decode_address_list(decode_call(ADD_ADDRESSES, &[address_array()], data)?)
    }

    pub fn decode_remove_addresses_action(&self, data: &[u8]) -> Result<Vec<Address>> {
        decode_address_list(decode_call(REMOVE_ADDRESSES, &[address_array()], data)?)
    }

    /// Signature of the plugin function `data` calls, if any.
    pub fn find_interface(&self, data: &[u8]) -> Option<&'static str> {
        find_interface(&AVAILABLE_FUNCTION_SIGNATURES, data)
    }
}

impl MajorityVotingPlugin for AddresslistVotingClient {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn queries(&self) -> &'static MajorityQueries {
        &queries::ADDRESSLIST_VOTING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{abi::voting_settings_param, context::NetworkDeployment, plugin::VotingMode};
    use ethers::{abi::ParamType, types::U256};

    fn client() -> AddresslistVotingClient {
        let deployment = NetworkDeployment {
            addresslist_voting_repo: Address::from_low_u64_be(0xa1),
            ..Default::default()
        };
        AddresslistVotingClient::new(Context::new("local", deployment))
    }

    #[test]
    fn member_actions() -> Result<()> {
        let client = client();
        let plugin = Address::from_low_u64_be(0x10);
        let members = vec![Address::from_low_u64_be(1), Address::from_low_u64_be(2)];

        let action = client.add_addresses_action(plugin, &members);
        assert_eq!(action.to, plugin);
        assert_eq!(action.value, U256::zero());
        assert_eq!(hex::encode(&action.data[..4]), "3628731c");
        assert_eq!(client.decode_add_addresses_action(&action.data)?, members);
        assert_eq!(client.find_interface(&action.data), Some(ADD_ADDRESSES));
        assert!(client.decode_remove_addresses_action(&action.data).is_err());

        let action = client.remove_addresses_action(plugin, &members);
        assert_eq!(client.decode_remove_addresses_action(&action.data)?, members);
        assert_eq!(client.find_interface(&action.data), Some(REMOVE_ADDRESSES));

        assert_eq!(client.find_interface(&[0, 1, 2, 3]), None);
        assert_eq!(client.find_interface(&[]), None);
        Ok(())
    }

    #[test]
    fn settings_action() -> Result<()> {
        let client = client();
        let plugin = Address::from_low_u64_be(0x10);
        let settings = VotingSettings {
            support_threshold: 0.5,
            min_participation: 0.2,
            min_duration: 7200,
            min_proposer_voting_power: U256::zero(),
            voting_mode: VotingMode::Standard,
        };

        let action = client.update_plugin_settings_action(plugin, &settings)?;
        assert_eq!(client.find_interface(&action.data), Some(UPDATE_VOTING_SETTINGS));
        assert_eq!(client.decode_update_plugin_settings_action(&action.data)?, settings);
        Ok(())
    }

    #[test]
    fn install_item() -> Result<()> {
        let client = client();
        let settings = VotingSettings {
            support_threshold: 0.5,
            min_participation: 0.1,
            min_duration: 3600,
            min_proposer_voting_power: U256::from(1),
            voting_mode: VotingMode::VoteReplacement,
        };
        let addresses = vec![Address::from_low_u64_be(7)];
        let params = AddresslistVotingInstallParams { voting_settings: settings.clone(), addresses };

        let item = client.get_plugin_install_item(&params)?;
        assert_eq!(item.id, Address::from_low_u64_be(0xa1));

        let mut tokens = ethers::abi::decode(
            &[voting_settings_param(), ParamType::Array(Box::new(ParamType::Address))],
            &item.data,
        )?;
        assert_eq!(VotingSettings::from_token(tokens.remove(0))?, settings);
        assert_eq!(decode_address_list(tokens)?, params.addresses);
        Ok(())
    }
}
