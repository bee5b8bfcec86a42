//! # physgen-catalog
//!
//! Read-only metadata about the assets scenarios place into the scene.
//!
//! ## Design
//!
//! A [`ModelLibrary`] is a named collection of [`ModelRecord`]s. Two
//! libraries ship embedded (`models_flex.json` primitives and
//! `models_special.json`); more can be loaded from JSON files into a
//! [`LibrarySet`].
//!
//! The [`PhysicsCatalog`] maps model names to default mass, friction and
//! bounciness. It is loaded once and only extended offline by the
//! [`PhysicsInfoCalculator`], which asks the Simulation Host for an
//! object's volume and applies [`SemanticMaterial`] heuristics.

pub mod calculator;
pub mod library;
pub mod material;
pub mod model;
pub mod physics;

pub use calculator::PhysicsInfoCalculator;
pub use library::{LibrarySet, ModelLibrary, FLEX_LIBRARY, SPECIAL_LIBRARY};
pub use material::SemanticMaterial;
pub use model::{Bounds, ModelRecord};
pub use physics::{PhysicsCatalog, PhysicsInfo};
