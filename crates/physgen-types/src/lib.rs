//! # physgen-types
//!
//! Shared types, identifiers, error types, and constants
//! for the physgen dataset generator.
//!
//! This crate has zero domain logic; it defines the vocabulary
//! that all other physgen crates share.

pub mod constants;
pub mod error;
pub mod ids;
pub mod vector;

pub use error::{PhysgenError, PhysgenResult};
pub use ids::{zero_padding, IdAllocator, ObjectId};
pub use vector::{Color, Vector3};
