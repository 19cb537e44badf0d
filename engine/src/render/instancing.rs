//! GPU Instance Buffer System for Trixel Fragments
//!
//! One explosion system owns one [`InstanceBuffer`]: a fixed array of
//! [`FragmentInstance`] records, one slot per fragment, for the lifetime of
//! the system. Disabled fragments keep their slot and write an all-zero
//! record, which the shader collapses to a degenerate (invisible) cube.

use static_assertions::const_assert_eq;

/// GPU instance data for a single fragment.
///
/// Layout (56 bytes total, tightly packed vertex attributes):
/// - position:             vec3<f32> (12 bytes) - World-space center
/// - size:                 vec3<f32> (12 bytes) - Box extents in blocks
/// - tinted_color:         vec3<f32> (12 bytes) - color * (1 + incandescence), HDR
/// - opacity:              f32 (4 bytes) - System fade, 0..1
/// - texture_offset_scale: vec4<f32> (16 bytes) - Atlas (u, v, width, height)
///
/// Total: 12 + 12 + 12 + 4 + 16 = 56 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentInstance {
    /// World-space center (x, y, z) - 12 bytes
    pub position: [f32; 3],
    /// Box extents in blocks - 12 bytes
    pub size: [f32; 3],
    /// Tint with incandescence glow applied - 12 bytes
    pub tinted_color: [f32; 3],
    /// Fade opacity - 4 bytes
    pub opacity: f32,
    /// Atlas sub-rectangle (u, v, width, height) - 16 bytes
    pub texture_offset_scale: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<FragmentInstance>(), 56);

impl FragmentInstance {
    /// The record written for disabled fragments.
    pub const HIDDEN: Self = Self {
        position: [0.0; 3],
        size: [0.0; 3],
        tinted_color: [0.0; 3],
        opacity: 0.0,
        texture_offset_scale: [0.0; 4],
    };

    /// True if this record draws nothing.
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.size == [0.0; 3]
    }
}

/// CPU-side instance records of one explosion system plus a dirty flag.
///
/// Only the owning system writes records; the renderer reads them and calls
/// [`InstanceBuffer::mark_clean`] once it has uploaded.
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    records: Vec<FragmentInstance>,
    dirty: bool,
}

impl InstanceBuffer {
    /// A buffer of `slots` hidden records, dirty so the first draw uploads it.
    pub fn new(slots: usize) -> Self {
        Self {
            records: vec![FragmentInstance::HIDDEN; slots],
            dirty: true,
        }
    }

    /// Write the record of `slot`, flagging the buffer dirty if it changed.
    #[inline]
    pub fn write(&mut self, slot: usize, record: FragmentInstance) {
        let current = &mut self.records[slot];
        if *current != record {
            *current = record;
            self.dirty = true;
        }
    }

    /// Replace the record of `slot` with the hidden record.
    #[inline]
    pub fn hide(&mut self, slot: usize) {
        self.write(slot, FragmentInstance::HIDDEN);
    }

    pub fn records(&self) -> &[FragmentInstance] {
        &self.records
    }

    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that draw something.
    pub fn visible_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_hidden()).count()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the renderer after uploading.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Describes the vertex buffer layout for FragmentInstance.
/// Shader locations 1..=5; location 0 is left to the cube corner index.
pub fn fragment_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<FragmentInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            // position: vec3<f32> at offset 0
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 1,
            },
            // size: vec3<f32> at offset 12
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 2,
            },
            // tinted_color: vec3<f32> at offset 24
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 24,
                shader_location: 3,
            },
            // opacity: f32 at offset 36
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32,
                offset: 36,
                shader_location: 4,
            },
            // texture_offset_scale: vec4<f32> at offset 40
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 40,
                shader_location: 5,
            },
        ],
    }
}
