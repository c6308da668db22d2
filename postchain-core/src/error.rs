use thiserror::Error;

/// Typed validation failures, surfaced to the HTTP boundary as status codes
/// and to the gossip layer as reasons to reject-without-amplify.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("signature invalid")]
    SignatureInvalid,
    #[error("block signature invalid")]
    BlockSignatureInvalid,
    #[error("timestamp is in the future")]
    TimestampFuture,
    #[error("transaction fee is negative")]
    FeeNegative,
    #[error("account does not exist")]
    AccountMissing,
    #[error("stake transaction invalid: {0}")]
    StakeInvalid(&'static str),
    #[error("transfer transaction invalid: {0}")]
    TransferInvalid(&'static str),
    #[error("tip transaction invalid: {0}")]
    TipInvalid(&'static str),
    #[error("ico transaction invalid: {0}")]
    IcoInvalid(&'static str),
    #[error("ico transaction outside genesis block")]
    IcoOutsideGenesis,
    #[error("block is not linked to the current head")]
    NotHead,
    #[error("validator does not match the elected validator")]
    ValidatorMismatch,
    #[error("validator rand invalid: {0}")]
    RandInvalid(&'static str),
}

/// Lower-level failures: malformed hex/hash data, signing-backend errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed hex string")]
    BadHex,
    #[error("hash is not 32 bytes")]
    BadHash,
    #[error("signing key material invalid")]
    BadKey,
    #[error("peer unreachable")]
    PeerUnreachable,
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}
