//! Warden selector algebra: label requirements and node placement matching.
//!
//! Turns a declarative [`NodePlacement`](warden_cluster::NodePlacement)
//! (equality terms plus node affinity expressions) into a [`Selector`]
//! that can be evaluated against a node's labels.
//!
//! # Components
//!
//! - **`requirement`**: One validated `key <op> values` term
//! - **`selector`**: Conjunction of requirements
//! - **`convert`**: Placement → selector translation and the operator table

pub mod convert;
pub mod error;
pub mod requirement;
pub mod selector;

pub use convert::{placement_to_selector, translate_operator};
pub use error::{SelectorError, SelectorResult};
pub use requirement::{Operator, Requirement};
pub use selector::Selector;
