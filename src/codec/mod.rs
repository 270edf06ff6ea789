//! SQL Server native geometry serialization (version 1).
//!
//! Layout: SRID (i32 LE), version (u8), serialization properties (u8), then
//! either one or two inline points (single point / single line segment
//! shortcuts) or the three flat arrays:
//!
//! - points: x/y pairs, then z values, then m values
//! - figures: attribute (u8) + point offset (i32)
//! - shapes: parent offset (i32, -1 for root) + figure offset (i32, -1 if
//!   empty) + OpenGIS type code (u8)

mod decoder;
mod encoder;
mod layout;
mod properties;
pub mod registry;

pub use decoder::*;
pub use encoder::*;
pub use layout::{FigureAttribute, HEADER_SIZE, VERSION};
pub use properties::*;
pub use registry::{OpenGisType, TypeRule};
