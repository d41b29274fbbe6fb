//! Pixel algorithms used by the tools: line rasterization, flood fill and
//! symmetry mirroring. None of these allocate history or touch the viewport.

pub mod fill;
pub mod line;
pub mod symmetry;
