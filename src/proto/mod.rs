//! Wire message definitions, written as `prost` derive structs in the same
//! shape `prost-build` emits so clients can regenerate from the published
//! schema and stay byte-compatible.

pub mod feed;
pub mod pubsub;
