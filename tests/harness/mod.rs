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

//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use ethers::{
    abi::{encode, Event, Token},
    types::{Address, Bytes, Log, TransactionReceipt, TransactionRequest, TxHash, H256, U256},
};
use log::debug;
use serde_json::Value;

use dao_sdk::{
    abi::PROPOSAL_CREATED,
    context::{Context, NetworkDeployment},
    indexer::IndexerClient,
    ipfs::IpfsClient,
    web3::{FeeData, Web3},
    Error, Result,
};

pub const PLUGIN: &str = "0x1111111111111111111111111111111111111111";
pub const VALID_CID: &str = "QmXhJ7o3ztd6pxVXMsFiBjWGHFJt8gNdeaLJWCJ6PXFbkz";

pub fn init_logger() {
    let mut cfg = simplelog::ConfigBuilder::new();
    cfg.add_filter_ignore("surf".to_string());
    // Several tests of the same binary race to install it
    if simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        cfg.build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .is_err()
    {
        debug!(target: "test_harness", "Logger already initialized");
    }
}

pub fn plugin_address() -> Address {
    Address::repeat_byte(0x11)
}

pub fn tx_hash() -> TxHash {
    TxHash::repeat_byte(0xaa)
}

pub fn deployment() -> NetworkDeployment {
    NetworkDeployment {
        dao_factory: Address::from_low_u64_be(0xfac),
        plugin_setup_processor: Address::from_low_u64_be(0x505),
        multisig_repo: Address::from_low_u64_be(0x31),
        addresslist_voting_repo: Address::from_low_u64_be(0x32),
        token_voting_repo: Address::from_low_u64_be(0x33),
    }
}

/// Scripted signer and provider. Every submission is confirmed with a
/// receipt carrying `logs`, read-only calls pop `call_returns` in order.
pub struct MockWeb3 {
    pub signer: Option<Address>,
    pub up: bool,
    pub revert: bool,
    pub logs: Vec<Log>,
    pub names: HashMap<String, Address>,
    pub call_returns: Mutex<VecDeque<Vec<u8>>>,
    pub signer_calls: AtomicUsize,
    pub submitted: Mutex<Vec<TransactionRequest>>,
    pub calls: Mutex<Vec<TransactionRequest>>,
}

impl Default for MockWeb3 {
    fn default() -> Self {
        Self {
            signer: Some(Address::from_low_u64_be(0x5167e7)),
            up: true,
            revert: false,
            logs: vec![],
            names: HashMap::new(),
            call_returns: Mutex::new(VecDeque::new()),
            signer_calls: AtomicUsize::new(0),
            submitted: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
        }
    }
}

impl MockWeb3 {
    pub fn with_logs(logs: Vec<Log>) -> Self {
        Self { logs, ..Default::default() }
    }

    pub fn push_return(&self, tokens: &[Token]) {
        self.call_returns.lock().unwrap().push_back(encode(tokens));
    }

    pub fn signer_calls(&self) -> usize {
        self.signer_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Web3 for MockWeb3 {
    fn signer_address(&self) -> Option<Address> {
        self.signer_calls.fetch_add(1, Ordering::SeqCst);
        self.signer
    }

    async fn is_up(&self) -> bool {
        self.up
    }

    async fn submit(&self, tx: &TransactionRequest) -> Result<TxHash> {
        self.submitted.lock().unwrap().push(tx.clone());
        Ok(tx_hash())
    }

    async fn wait(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let status: u64 = if self.revert { 0 } else { 1 };
        Ok(TransactionReceipt {
            transaction_hash: tx_hash,
            status: Some(status.into()),
            logs: self.logs.clone(),
            ..Default::default()
        })
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(tx.clone());
        match self.call_returns.lock().unwrap().pop_front() {
            Some(ret) => Ok(ret),
            None => Err(Error::ProviderError("execution reverted".to_string())),
        }
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        Ok(U256::from(100_000))
    }

    async fn fee_data(&self) -> Result<FeeData> {
        Ok(FeeData { gas_price: U256::from(2), max_fee_per_gas: U256::from(5) })
    }

    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        Ok(self.names.get(name).copied())
    }
}

/// Indexer answering every query with the same `data` object and
/// recording what it was asked.
#[derive(Default)]
pub struct MockIndexer {
    pub data: Value,
    pub requests: Mutex<Vec<(String, Value)>>,
}

impl MockIndexer {
    pub fn new(data: Value) -> Self {
        Self { data, requests: Mutex::new(vec![]) }
    }

    pub fn last_variables(&self) -> Value {
        self.requests.lock().unwrap().last().map(|(_, v)| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IndexerClient for MockIndexer {
    async fn request(&self, query: &str, variables: Value) -> Result<Value> {
        self.requests.lock().unwrap().push((query.to_string(), variables));
        Ok(self.data.clone())
    }
}

/// IPFS node backed by a map of CID to content
#[derive(Default)]
pub struct MockIpfs {
    pub contents: HashMap<String, String>,
    pub added: Mutex<Vec<String>>,
    pub pinned: Mutex<Vec<String>>,
}

#[async_trait]
impl IpfsClient for MockIpfs {
    async fn fetch_string(&self, cid: &str) -> Result<String> {
        match self.contents.get(cid) {
            Some(content) => Ok(content.clone()),
            None => Err(Error::IpfsUnavailable(format!("{} not found", cid))),
        }
    }

    async fn add(&self, content: &str) -> Result<String> {
        self.added.lock().unwrap().push(content.to_string());
        Ok(VALID_CID.to_string())
    }

    async fn pin(&self, cid: &str) -> Result<()> {
        self.pinned.lock().unwrap().push(cid.to_string());
        Ok(())
    }
}

pub fn context(
    web3: Option<Arc<MockWeb3>>,
    indexer: Option<Arc<MockIndexer>>,
    ipfs: Option<Arc<MockIpfs>>,
) -> Context {
    let mut ctx = Context::new("local", deployment());
    if let Some(web3) = web3 {
        ctx = ctx.with_web3(web3);
    }
    if let Some(indexer) = indexer {
        ctx = ctx.with_indexer(indexer);
    }
    if let Some(ipfs) = ipfs {
        ctx = ctx.with_ipfs(ipfs);
    }
    ctx
}

/// Log of `event` as emitted by `address`. Indexed arguments go to the
/// topics, the rest is ABI encoded into the data.
pub fn event_log(address: Address, event: &Event, args: Vec<Token>) -> Log {
    let mut topics = vec![event.signature()];
    let mut data = vec![];

    for (param, arg) in event.inputs.iter().zip(args) {
        if param.indexed {
            topics.push(H256::from_slice(&encode(&[arg])));
        } else {
            data.push(arg);
        }
    }

    Log { address, topics, data: Bytes::from(encode(&data)), ..Default::default() }
}

pub fn proposal_created_log(plugin: Address, proposal_id: u64) -> Log {
    event_log(
        plugin,
        &PROPOSAL_CREATED,
        vec![
            Token::Uint(proposal_id.into()),
            Token::Address(Address::from_low_u64_be(0x5167e7)),
            Token::Uint(1000.into()),
            Token::Uint(5000.into()),
            Token::Bytes(format!("ipfs://{}", VALID_CID).into_bytes()),
            Token::Array(vec![]),
            Token::Uint(U256::zero()),
        ],
    )
}

/// Log emitted by an unrelated contract
pub fn unrelated_log() -> Log {
    Log {
        address: Address::from_low_u64_be(0xdead),
        topics: vec![H256::repeat_byte(0x42)],
        ..Default::default()
    }
}
