// Compositing primitives shared by the label and watermark pipelines.
//
// Every primitive takes its inputs by reference and returns a new 8-bit
// image, so intermediates are plain owned values that drop on any early
// return.
mod arith;
mod blend;
mod embed;
mod layout;
mod replicate;
mod rotate;

pub use arith::{black, cast_u8, linear};
pub use blend::ifthenelse;
pub use embed::{Extend, crop, embed};
pub(crate) use embed::paste;
pub use layout::{Interpretation, bands, conform_layout, ensure_alpha, interpretation, to_8bit};
pub(crate) use layout::alloc_raw;
pub use replicate::{replicate, replicate_to_cover, tile_counts};
pub use rotate::{rotate, rotated_bounds};
