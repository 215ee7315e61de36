//! apistack data models.
//!
//! Strongly-typed representations of everything that ends up in a manifest:
//! resource nodes, the gateway path tree, request schemas and usage plans.
//!
//! Design goals:
//! - **Stable wire names:** serde field names and kind names are the contract
//!   a provisioning backend consumes.
//! - **Deterministic serialization:** ordered collections only (`BTreeMap`,
//!   `BTreeSet`, `Vec` in declaration order); hashing goes through
//!   `crate::determinism::canonical_json`.
//! - **Minimal policy:** models are mostly data. Builders and the synthesizer
//!   apply validation.

pub mod ids;
pub mod manifest;
pub mod node;
pub mod plan;
pub mod schema;
pub mod tree;

pub use manifest::Manifest;
pub use node::{ResourceKind, ResourceNode};
pub use plan::{StageBinding, ThrottleSettings, UsagePlan};
pub use schema::{SchemaDoc, SchemaType};
pub use tree::{ApiResourceTree, HttpVerb, TreeIndex};
