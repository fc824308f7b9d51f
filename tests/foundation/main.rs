//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: EntityId, EntityIdSet, Mutation, Liveness, and Error.

mod errors;
mod id_sets;
