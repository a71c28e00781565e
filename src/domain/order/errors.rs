// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed order payload: {0}")]
    MalformedPayload(String),

    #[error("order_uid empty")]
    EmptyOrderUid,

    #[error("order_uid too long: {len} > {max}")]
    OrderUidTooLong { len: usize, max: usize },

    #[error("order_uid has invalid characters")]
    OrderUidFormat,

    #[error("track_number empty")]
    EmptyTrackNumber,

    #[error("items empty")]
    NoItems,

    #[error("payment amount negative: {0}")]
    NegativeAmount(i64),

    #[error("delivery email invalid")]
    InvalidEmail,
}
