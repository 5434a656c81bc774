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

use std::sync::Arc;

use ethers::types::{Address, U256};
use num_bigint::BigUint;
use serde_json::{json, Value};

use dao_sdk::{
    plugin::{
        AddresslistVotingClient, MajorityVotingPlugin, MultisigClient, ProposalQueryParams,
        SortDirection, TokenVotingClient, VotingMode,
    },
    proposal::{ProposalMetadata, ProposalStatus, TokenDetails, VoteValue},
    Error, Result,
};

mod harness;
use harness::*;

const EXTENDED_ID: &str = "0x1111111111111111111111111111111111111111_0x0000000000000000000000000000000000000000000000000000000000000002";

fn raw_proposal(metadata: Value) -> Value {
    json!({
        "id": EXTENDED_ID,
        "dao": { "id": "0x2222222222222222222222222222222222222222", "subdomain": "builders" },
        "creator": "0x3333333333333333333333333333333333333333",
        "metadata": metadata,
        "createdAt": "900",
        "creationBlockNumber": "100",
        "actions": [],
        "yes": "2",
        "no": "1",
        "abstain": "0",
        "supportThreshold": "500000",
        "minVotingPower": "1",
        "totalVotingPower": "4",
        "startDate": "1000",
        "endDate": "2000",
        "executed": true,
        "earlyExecutable": false,
        "potentiallyExecutable": false,
        "voters": [
            { "voter": { "address": "0x5555555555555555555555555555555555555555" }, "voteOption": "Yes", "voteReplaced": false },
            { "voter": { "address": "0x6666666666666666666666666666666666666666" }, "voteOption": "Yes", "voteReplaced": false },
            { "voter": { "address": "0x7777777777777777777777777777777777777777" }, "voteOption": "No", "voteReplaced": false }
        ]
    })
}

fn metadata_json() -> String {
    json!({
        "title": "Fund the builders",
        "summary": "Send 10 ETH",
        "description": "Long form",
        "resources": [{ "url": "https://dark.fi", "name": "Site" }]
    })
    .to_string()
}

fn addresslist_client(
    data: Value,
    ipfs: Option<Arc<MockIpfs>>,
) -> (AddresslistVotingClient, Arc<MockIndexer>) {
    let indexer = Arc::new(MockIndexer::new(data));
    let client = AddresslistVotingClient::new(context(None, Some(indexer.clone()), ipfs));
    (client, indexer)
}

#[test]
fn proposal_with_metadata() -> Result<()> {
    init_logger();

    let mut ipfs = MockIpfs::default();
    ipfs.contents.insert(VALID_CID.to_string(), metadata_json());
    let data = json!({ "addresslistVotingProposal": raw_proposal(json!(format!("ipfs://{}", VALID_CID))) });
    let (client, indexer) = addresslist_client(data, Some(Arc::new(ipfs)));

    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(indexer.last_variables(), json!({ "proposalId": EXTENDED_ID }));

    assert_eq!(proposal.id.to_string(), "0x1111111111111111111111111111111111111111_0x2");
    assert_eq!(proposal.metadata.title, "Fund the builders");
    assert_eq!(proposal.metadata.resources.len(), 1);
    assert_eq!(proposal.status, ProposalStatus::Executed);
    assert_eq!(proposal.settings.duration, 1000);
    assert_eq!(proposal.settings.support_threshold, 0.5);
    assert_eq!(proposal.settings.min_participation, 0.25);
    assert_eq!(proposal.result.yes, BigUint::from(2u32));
    // Addresslist voters weigh one each
    assert_eq!(proposal.used_voting_weight, BigUint::from(3u32));
    assert_eq!(proposal.votes[2].vote, VoteValue::No);
    assert_eq!(proposal.token, None);
    Ok(())
}

#[test]
fn unavailable_metadata() -> Result<()> {
    init_logger();

    // Valid reference, content is not metadata
    let mut ipfs = MockIpfs::default();
    ipfs.contents.insert(VALID_CID.to_string(), "<html>gateway error</html>".to_string());
    let data = json!({ "addresslistVotingProposal": raw_proposal(json!(format!("ipfs://{}", VALID_CID))) });
    let (client, _) = addresslist_client(data.clone(), Some(Arc::new(ipfs)));
    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(proposal.metadata, ProposalMetadata::unavailable());

    // Valid reference, nothing to fetch it with
    let (client, _) = addresslist_client(data, None);
    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(proposal.metadata, ProposalMetadata::unavailable());

    // Not a content reference at all
    let data = json!({ "addresslistVotingProposal": raw_proposal(json!("https://example.org/p.json")) });
    let (client, _) = addresslist_client(data, Some(Arc::new(MockIpfs::default())));
    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(proposal.metadata, ProposalMetadata::unsupported_link());

    // No reference
    let data = json!({ "addresslistVotingProposal": raw_proposal(Value::Null) });
    let (client, _) = addresslist_client(data, None);
    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(proposal.metadata, ProposalMetadata::empty());
    Ok(())
}

#[test]
fn unknown_proposal() -> Result<()> {
    init_logger();

    let (client, _) = addresslist_client(json!({ "addresslistVotingProposal": null }), None);
    assert!(smol::block_on(client.get_proposal(&format!("{}_0x9", PLUGIN)))?.is_none());

    let res = smol::block_on(client.get_proposal("not-an-id"));
    assert!(matches!(res, Err(Error::InvalidProposalId(_))));

    let client = AddresslistVotingClient::new(context(None, None, None));
    let res = smol::block_on(client.get_proposal(&format!("{}_0x9", PLUGIN)));
    assert!(matches!(res, Err(Error::IndexerMissing)));
    Ok(())
}

#[test]
fn proposal_list_variables() -> Result<()> {
    init_logger();

    let data = json!({ "addresslistVotingProposals": [raw_proposal(Value::Null), raw_proposal(Value::Null)] });
    let (client, indexer) = addresslist_client(data, None);

    let proposals = smol::block_on(client.get_proposals(&ProposalQueryParams::default()))?;
    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].metadata.title, ProposalMetadata::empty().title);
    assert_eq!(
        indexer.last_variables(),
        json!({ "where": {}, "limit": 10, "skip": 0, "direction": "asc", "sortBy": "createdAt" })
    );

    let params = ProposalQueryParams {
        dao_address_or_ens: Some("0x2222222222222222222222222222222222222222".to_string()),
        status: Some(ProposalStatus::Executed),
        skip: 20,
        direction: SortDirection::Desc,
        ..Default::default()
    };
    smol::block_on(client.get_proposals(&params))?;
    let vars = indexer.last_variables();
    assert_eq!(
        vars["where"],
        json!({ "dao": "0x2222222222222222222222222222222222222222", "executed": true })
    );
    assert_eq!(vars["skip"], json!(20));
    assert_eq!(vars["direction"], json!("desc"));

    // Succeeded is reached either way, each branch keeps the DAO condition
    let params = ProposalQueryParams { status: Some(ProposalStatus::Succeeded), ..params };
    smol::block_on(client.get_proposals(&params))?;
    let clauses = indexer.last_variables()["where"]["or"].as_array().cloned().unwrap();
    assert_eq!(clauses.len(), 2);
    for clause in clauses {
        assert_eq!(clause["dao"], json!("0x2222222222222222222222222222222222222222"));
        assert_eq!(clause["executed"], json!(false));
    }
    Ok(())
}

#[test]
fn dao_names() -> Result<()> {
    init_logger();

    let dao = Address::repeat_byte(0x22);
    let mut web3 = MockWeb3::default();
    web3.names.insert("builders.dao.eth".to_string(), dao);

    let indexer = Arc::new(MockIndexer::new(json!({ "tokenVotingProposals": [] })));
    let client = TokenVotingClient::new(context(Some(Arc::new(web3)), Some(indexer.clone()), None));

    let params = ProposalQueryParams {
        dao_address_or_ens: Some("builders.dao.eth".to_string()),
        ..Default::default()
    };
    assert!(smol::block_on(client.get_proposals(&params))?.is_empty());
    assert_eq!(
        indexer.last_variables()["where"],
        json!({ "dao": "0x2222222222222222222222222222222222222222" })
    );

    let params = ProposalQueryParams {
        dao_address_or_ens: Some("unknown.dao.eth".to_string()),
        ..Default::default()
    };
    let res = smol::block_on(client.get_proposals(&params));
    assert!(matches!(res, Err(Error::InvalidAddressOrEns)));

    // Without a provider names cannot be resolved
    let client = TokenVotingClient::new(context(None, Some(indexer), None));
    let res = smol::block_on(client.get_proposals(&params));
    assert!(matches!(res, Err(Error::NoProvider)));
    Ok(())
}

#[test]
fn token_voting_proposal() -> Result<()> {
    init_logger();

    let mut raw = raw_proposal(Value::Null);
    raw["executed"] = json!(false);
    raw["startDate"] = json!("0");
    raw["endDate"] = json!("1");
    raw["potentiallyExecutable"] = json!(true);
    raw["voters"] = json!([
        { "voter": { "address": "0x5555555555555555555555555555555555555555" }, "voteOption": "Yes", "votingPower": "3000" },
        { "voter": { "address": "0x6666666666666666666666666666666666666666" }, "voteOption": "Abstain", "votingPower": "500" }
    ]);
    raw["plugin"] = json!({
        "token": { "__typename": "ERC721Contract", "id": "0x8888888888888888888888888888888888888888", "name": "Pass", "symbol": "PASS" }
    });

    let indexer = Arc::new(MockIndexer::new(json!({ "tokenVotingProposal": raw })));
    let client = TokenVotingClient::new(context(None, Some(indexer), None));

    let proposal = smol::block_on(client.get_proposal(&format!("{}_0x2", PLUGIN)))?.unwrap();
    assert_eq!(proposal.status, ProposalStatus::Succeeded);
    assert_eq!(proposal.used_voting_weight, BigUint::from(3500u32));
    assert_eq!(
        proposal.token,
        Some(TokenDetails::Erc721 {
            address: Address::repeat_byte(0x88),
            name: "Pass".to_string(),
            symbol: "PASS".to_string(),
        })
    );
    Ok(())
}

#[test]
fn voting_settings() -> Result<()> {
    init_logger();

    let data = json!({
        "addresslistVotingPlugin": {
            "minDuration": "86400",
            "minProposerVotingPower": "1000000000000000000",
            "minParticipation": "150000",
            "supportThreshold": "500000",
            "votingMode": "EarlyExecution"
        }
    });
    let (client, indexer) = addresslist_client(data, None);

    let settings = smol::block_on(client.get_voting_settings(PLUGIN))?.unwrap();
    assert_eq!(indexer.last_variables(), json!({ "address": PLUGIN }));
    assert_eq!(settings.min_duration, 86400);
    assert_eq!(settings.min_proposer_voting_power, U256::exp10(18));
    assert_eq!(settings.min_participation, 0.15);
    assert_eq!(settings.support_threshold, 0.5);
    assert_eq!(settings.voting_mode, VotingMode::EarlyExecution);

    let (client, _) = addresslist_client(json!({ "addresslistVotingPlugin": null }), None);
    assert!(smol::block_on(client.get_voting_settings(PLUGIN))?.is_none());

    let res = smol::block_on(client.get_voting_settings("0x1234"));
    assert!(matches!(res, Err(Error::InvalidAddress)));
    Ok(())
}

#[test]
fn plugin_members() -> Result<()> {
    init_logger();

    let data = json!({
        "addresslistVotingPlugin": {
            "members": [
                { "address": "0x5555555555555555555555555555555555555555" },
                { "address": "0x6666666666666666666666666666666666666666" }
            ]
        }
    });
    let (client, _) = addresslist_client(data, None);
    let members = smol::block_on(client.get_members(PLUGIN))?;
    assert_eq!(members, vec![Address::repeat_byte(0x55), Address::repeat_byte(0x66)]);

    let data = json!({
        "tokenVotingMembers": [
            {
                "address": "0x5555555555555555555555555555555555555555",
                "balance": "10",
                "votingPower": "10",
                "delegatee": { "address": "0x5555555555555555555555555555555555555555" },
                "delegators": [
                    { "address": "0x5555555555555555555555555555555555555555", "balance": "10" }
                ]
            }
        ]
    });
    let indexer = Arc::new(MockIndexer::new(data));
    let client = TokenVotingClient::new(context(None, Some(indexer.clone()), None));
    let members = smol::block_on(client.get_members(PLUGIN))?;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].voting_power, BigUint::from(10u32));
    assert_eq!(members[0].delegatee, None);
    assert!(members[0].delegators.is_empty());
    assert_eq!(indexer.last_variables(), json!({ "where": { "plugin": PLUGIN } }));
    Ok(())
}

#[test]
fn multisig_queries() -> Result<()> {
    init_logger();

    let raw = json!({
        "id": EXTENDED_ID,
        "dao": { "id": "0x2222222222222222222222222222222222222222", "subdomain": "council" },
        "creator": "0x3333333333333333333333333333333333333333",
        "metadata": null,
        "startDate": "0",
        "endDate": "1",
        "executed": false,
        "potentiallyExecutable": false,
        "minApprovals": 2,
        "approvers": [{ "approver": { "address": "0x5555555555555555555555555555555555555555" } }]
    });
    let data = json!({
        "multisigProposals": [raw],
        "multisigPlugin": { "minApprovals": 2, "onlyListed": true }
    });
    let indexer = Arc::new(MockIndexer::new(data));
    let client = MultisigClient::new(context(None, Some(indexer.clone()), None));

    let params = ProposalQueryParams { status: Some(ProposalStatus::Defeated), ..Default::default() };
    let proposals = smol::block_on(client.get_proposals(&params))?;
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].status, ProposalStatus::Defeated);
    assert_eq!(proposals[0].approvals, 1);

    // Multisig proposals have no early execution
    let filter = indexer.last_variables()["where"].clone();
    assert_eq!(filter["potentiallyExecutable"], json!(false));
    assert!(filter.get("earlyExecutable").is_none());

    let settings = smol::block_on(client.get_voting_settings(PLUGIN))?.unwrap();
    assert_eq!(settings.min_approvals, 2);
    assert!(settings.only_listed);
    Ok(())
}
