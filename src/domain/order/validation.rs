use super::errors::ValidationError;
use super::value_objects::{Order, OrderEnvelope};

// ============================================================================
// Order Validation
// ============================================================================
//
// Pure checks, no I/O. Checks run in a fixed order and the first failure is
// reported. `validate_order` guards durable persistence inside the consumer;
// `validate_envelope` is the cheap subset run at the HTTP boundary before a
// payload is queued.
//
// ============================================================================

pub const MAX_ORDER_UID_LEN: usize = 100;

/// Canonical identifier form: surrounding whitespace removed.
///
/// Applied once right after decoding, so the acknowledgement, partition key,
/// primary key and cache key all agree.
pub fn normalize_order_uid(order_uid: &mut String) {
    let trimmed = order_uid.trim();
    if trimmed.len() != order_uid.len() {
        *order_uid = trimmed.to_string();
    }
}

/// Full validation of a decoded order.
pub fn validate_order(order: &Order) -> Result<(), ValidationError> {
    validate_order_uid(&order.order_uid)?;
    validate_track_number(&order.track_number)?;

    if order.items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    if order.payment.amount < 0 {
        return Err(ValidationError::NegativeAmount(order.payment.amount));
    }

    let email = order.delivery.email.trim();
    if !email.is_empty() && !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

/// Minimal validation of the fields a publish request must carry.
pub fn validate_envelope(envelope: &OrderEnvelope) -> Result<(), ValidationError> {
    validate_order_uid(&envelope.order_uid)?;
    validate_track_number(&envelope.track_number)
}

fn validate_order_uid(order_uid: &str) -> Result<(), ValidationError> {
    let uid = order_uid.trim();
    if uid.is_empty() {
        return Err(ValidationError::EmptyOrderUid);
    }
    let len = uid.chars().count();
    if len > MAX_ORDER_UID_LEN {
        return Err(ValidationError::OrderUidTooLong {
            len,
            max: MAX_ORDER_UID_LEN,
        });
    }
    if !uid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::OrderUidFormat);
    }
    Ok(())
}

fn validate_track_number(track_number: &str) -> Result<(), ValidationError> {
    if track_number.trim().is_empty() {
        return Err(ValidationError::EmptyTrackNumber);
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
