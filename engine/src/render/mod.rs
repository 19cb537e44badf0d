//! Render Module
//!
//! The rendering side of debris: the instance record format explosion
//! systems pack into, the [`FragmentRenderer`] seam the scheduler draws
//! through, and a wgpu implementation of it.

pub mod fragment_pass;
pub mod instancing;

use crate::debris::SystemId;

pub use fragment_pass::{CUBE_VERTEX_COUNT, FragmentPass, FragmentUniforms};
pub use instancing::{FragmentInstance, InstanceBuffer, fragment_instance_layout};

/// Backend that turns packed instance buffers into pixels.
///
/// The scheduler calls `draw_system` for each visible system every frame
/// and clears the buffer's dirty flag afterwards, so implementations only
/// need to upload when [`InstanceBuffer::is_dirty`] is set or the system is
/// new to them.
pub trait FragmentRenderer {
    fn draw_system(&mut self, id: SystemId, instances: &InstanceBuffer);

    /// The system is gone; free whatever was allocated for it.
    fn release_system(&mut self, id: SystemId);
}
