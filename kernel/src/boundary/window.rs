//! GUI window-surface contract, grounded in
//! `original_source/gui/include/sentinal_gui.h` and the teacher's
//! `window_manager/` manager/window split — only that split is in
//! scope here, no compositor or pixel routines.

use crate::lib::{Level, Result};

pub struct WindowId(pub u32);

pub trait WindowSurface: Send + Sync {
    fn create(&self, width: u32, height: u32, classification: Level) -> Result<WindowId>;
    fn destroy(&self, id: WindowId) -> Result<()>;
    fn blit(&self, id: &WindowId, pixels: &[u32], width: u32, height: u32) -> Result<()>;
    /// Renders the classification-level border required by `spec.md`
    /// §4.6 wherever windowed output crosses a classification boundary.
    fn set_classification_border(&self, id: &WindowId, classification: Level) -> Result<()>;
}
