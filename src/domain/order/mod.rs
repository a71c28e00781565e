// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, Delivery, Payment, Item, OrderEnvelope)
// - Errors (ValidationError)
// - Validation (validate_order, validate_envelope)
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod validation;

// Re-export for convenience
pub use value_objects::*;
pub use errors::*;
pub use validation::*;
