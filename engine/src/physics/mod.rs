//! Physics module
//!
//! The simple rigid-body layer debris runs on. Built from scratch without an
//! external physics library: bodies are axis-aligned boxes that never rotate
//! and never collide with each other, only with the level grid.
//!
//! # Unit System
//!
//! **1 unit = 1 block edge**
//!
//! - Distances in blocks
//! - Velocities in blocks/s
//! - Accelerations in blocks/s²
//!
//! # Submodules
//!
//! - [`types`] - glam re-exports and the [`Aabb`] helper
//! - [`entity`] - The [`PhysicsEntity`] contract and ground contacts
//! - [`collision`] - Box-vs-grid queries
//! - [`integrator`] - The [`Integrator`] trait and the grid-backed implementation

pub mod collision;
pub mod entity;
pub mod integrator;
pub mod types;

pub use entity::{GroundContacts, PhysicsEntity};
pub use integrator::{GridIntegrator, Integrator, MOVE_EPSILON};
pub use types::{Aabb, IVec3, Vec3};
