// ============================================================================
// Domain Layer
// ============================================================================
//
// The order model and its validation rules. Nothing in here performs I/O;
// messaging, storage and caching all build on these types.
//
// ============================================================================

pub mod order;
