use std::fmt;

/// The error taxonomy for the Synnergy core (spec §7).
#[derive(Debug, Clone)]
pub enum SynnergyError {
    /// Zero amounts, empty names, malformed addresses, bad signatures, duplicates.
    InvalidInput(String),
    /// Missing block / channel / batch / bridge / transfer / asset / contract.
    NotFound(String),
    InsufficientFunds { address: String, balance: u64, required: u64 },
    InsufficientStake { address: String, staked: u64, required: u64 },
    InsufficientBalance { address: String, balance: u64, required: u64 },
    /// Relayer not in set, signer not a party, validator not active.
    Unauthorised(String),
    /// Already closed/paused/finalised, wrong height, wrong state for transition.
    StateViolation(String),
    /// Out-of-gas, supply cap reached.
    ResourceExhausted(String),
    /// Merkle verification failed, signature mismatch.
    ProofInvalid(String),
    /// WAL write, snapshot write, archive write.
    IOFailure(String),
    /// Ping deadline, sync context cancelled.
    Timeout(String),
    SerializationError(String),
}

impl fmt::Display for SynnergyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynnergyError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            SynnergyError::NotFound(msg) => write!(f, "not found: {msg}"),
            SynnergyError::InsufficientFunds { address, balance, required } => {
                write!(f, "insufficient funds for {address}: have {balance}, need {required}")
            }
            SynnergyError::InsufficientStake { address, staked, required } => {
                write!(f, "insufficient stake for {address}: have {staked}, need {required}")
            }
            SynnergyError::InsufficientBalance { address, balance, required } => {
                write!(f, "insufficient balance for {address}: have {balance}, need {required}")
            }
            SynnergyError::Unauthorised(msg) => write!(f, "unauthorised: {msg}"),
            SynnergyError::StateViolation(msg) => write!(f, "state violation: {msg}"),
            SynnergyError::ResourceExhausted(msg) => write!(f, "resource exhausted: {msg}"),
            SynnergyError::ProofInvalid(msg) => write!(f, "proof invalid: {msg}"),
            SynnergyError::IOFailure(msg) => write!(f, "io failure: {msg}"),
            SynnergyError::Timeout(msg) => write!(f, "timeout: {msg}"),
            SynnergyError::SerializationError(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SynnergyError {}

pub type Result<T> = std::result::Result<T, SynnergyError>;

impl From<serde_json::Error> for SynnergyError {
    fn from(err: serde_json::Error) -> Self {
        SynnergyError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for SynnergyError {
    fn from(err: std::io::Error) -> Self {
        SynnergyError::IOFailure(err.to_string())
    }
}

impl From<sled::Error> for SynnergyError {
    fn from(err: sled::Error) -> Self {
        SynnergyError::IOFailure(err.to_string())
    }
}

impl From<bincode::Error> for SynnergyError {
    fn from(err: bincode::Error) -> Self {
        SynnergyError::SerializationError(err.to_string())
    }
}
