pub mod atoms;
pub mod boxes;
pub mod error;
pub mod known_boxes;
pub mod nal;
pub mod parser;
pub mod reader;
pub mod track;
pub mod util;

pub use boxes::{BoxData, BoxHeader, FourCC, Mp4Box};
pub use error::{DemuxError, Result};
pub use nal::sample_nal_units;
pub use parser::{Mp4File, read_box, read_box_header, read_children};
pub use track::Track;
