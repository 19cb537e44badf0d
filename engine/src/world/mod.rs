//! World Module
//!
//! The level as the debris simulation sees it: a read-only block grid and
//! the camera's view volume.

pub mod grid;
pub mod view;

pub use grid::{BlockGrid, BlockInstance, LevelGrid, TRIXELS_PER_BLOCK, cell_of};
pub use view::ViewVolume;
