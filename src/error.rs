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

// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // ==============
    // Parsing errors
    // ==============
    #[error("Parse failed: {0}")]
    ParseFailed(String),

    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error(transparent)]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error(transparent)]
    ParseBigIntError(#[from] num_bigint::ParseBigIntError),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Invalid address or ENS name")]
    InvalidAddressOrEns,

    #[error("Invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("Invalid CID: {0}")]
    InvalidCid(String),

    #[error("JSON error: {0}")]
    SerdeJsonError(String),

    #[error("TOML error: {0}")]
    TomlError(String),

    // ===============
    // Encoding errors
    // ===============
    #[error("ABI error: {0}")]
    AbiError(String),

    #[error("Invalid precision: {0}")]
    InvalidPrecision(u32),

    #[error("Invalid ratio: {0}")]
    InvalidRatio(f64),

    #[error("Invalid voting mode")]
    InvalidVotingMode,

    #[error("Invalid vote value")]
    InvalidVoteValue,

    #[error("Too many flags for a bitmap: {0}")]
    BitmapOverflow(usize),

    // ===================
    // Collaborator errors
    // ===================
    #[error("A signer is needed")]
    SignerMissing,

    #[error("A web3 provider is needed")]
    ProviderMissing,

    #[error("No web3 provider is available")]
    NoProvider,

    #[error("An indexer client is needed")]
    IndexerMissing,

    #[error("Web3 provider error: {0}")]
    ProviderError(String),

    #[error("Indexer request failed: {0}")]
    IndexerError(String),

    #[error("IPFS unavailable: {0}")]
    IpfsUnavailable(String),

    #[error("Could not pin data on IPFS")]
    IpfsPinFailed,

    #[error("Could not parse metadata: {0}")]
    MetadataUnparseable(String),

    // ===============
    // Protocol errors
    // ===============
    #[error("Actions and fail-safe actions must have the same length")]
    ActionsMismatch,

    #[error("Event {0} not found in transaction receipt")]
    EventNotFound(String),

    #[error("Transaction {0} reverted")]
    TransactionReverted(String),

    #[error("Transaction {0} dropped before confirmation")]
    TransactionDropped(String),

    #[error("Failed to create proposal")]
    ProposalCreationFailed,

    #[error("Failed to prepare plugin installation")]
    InstallationPreparationFailed,

    #[error("Failed to prepare plugin uninstallation")]
    UninstallationPreparationFailed,

    #[error("Invalid subdomain format: use a-z, 0-9 and -")]
    InvalidSubdomain(String),

    #[error("A DAO needs at least one plugin holding the execute permission")]
    MissingExecPermission,

    #[error("Failed to create DAO")]
    DaoCreationFailed,

    #[error("Failed to deposit")]
    DepositFailed,

    #[error("Failed to set the token allowance")]
    SetAllowanceFailed,

    #[error("Deposited amount {0} differs from the requested {1}")]
    AmountMismatch(String, String),

    // ===========
    // Misc errors
    // ===========
    #[error("IO error: {0:?}")]
    Io(std::io::ErrorKind),

    #[error("{0}")]
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeJsonError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlError(err.to_string())
    }
}

impl From<ethers::abi::Error> for Error {
    fn from(err: ethers::abi::Error) -> Self {
        Self::AbiError(err.to_string())
    }
}

impl From<ethers::providers::ProviderError> for Error {
    fn from(err: ethers::providers::ProviderError) -> Self {
        Self::ProviderError(err.to_string())
    }
}

impl From<surf::Error> for Error {
    fn from(err: surf::Error) -> Self {
        Self::Custom(format!("HTTP error: {}", err))
    }
}
