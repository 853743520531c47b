//! Surface that records draw operations instead of rasterising them.
//! Used by tests and by the engine when no real output is wanted.

use std::cell::RefCell;
use std::rc::Rc;

use crate::surface::{Color, Context2d, DrawingSurface, Rect};
use crate::texture::Image;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear(Rect),
    Fill { rect: Rect, color: Color },
    Image { image_size: (u32, u32), src: Rect, dst: Rect },
}

#[derive(Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn ops(&self) -> Vec<DrawOp> {
        self.ops.borrow().clone()
    }

    /// `(src, dst)` of every image blit, in order.
    pub fn image_ops(&self) -> Vec<(Rect, Rect)> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { src, dst, .. } => Some((*src, *dst)),
                _ => None,
            })
            .collect()
    }

    pub fn fill_ops(&self) -> Vec<(Rect, Color)> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Fill { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn take(&self) -> Vec<DrawOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }
}

impl DrawingSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn context_2d(&mut self) -> Option<Box<dyn Context2d>> {
        Some(Box::new(RecordingContext {
            ops: self.ops.clone(),
        }))
    }
}

struct RecordingContext {
    ops: Rc<RefCell<Vec<DrawOp>>>,
}

impl Context2d for RecordingContext {
    fn clear_rect(&mut self, rect: Rect) {
        self.ops.borrow_mut().push(DrawOp::Clear(rect));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.borrow_mut().push(DrawOp::Fill { rect, color });
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) {
        self.ops.borrow_mut().push(DrawOp::Image {
            image_size: (image.width(), image.height()),
            src,
            dst,
        });
    }
}
