//! Bidirectional codec between a version-agnostic filter model and the OGC
//! Filter Encoding wire revisions 1.0.0, 1.1.0 and 2.0.0.
//!
//! ```no_run
//! use fescodec::{Filter, FilterCodecs, tree};
//!
//! let codecs = FilterCodecs::default();
//! let filter = Filter::equal("name", "Main St");
//! let element = codecs.encode("1.1.0", &filter)?;
//! println!("{}", tree::to_xml_string(&element)?);
//! assert_eq!(codecs.decode("1.1.0", &element, None)?, filter);
//! # Ok::<(), fescodec::FilterError>(())
//! ```

pub mod capabilities;
pub mod codec;
pub mod crs;
pub mod error;
pub mod gml;
pub mod model;
pub mod tree;
mod utils;

pub use capabilities::{Capabilities, Version};
pub use codec::{CodecOptions, Decoder, Encoder, FilterCodecs, NestedIdPolicy, VersionCodec, encode_color};
pub use crs::{BuiltinCrsRegistry, Crs, CrsDefinition, CrsRegistry};
pub use error::{FilterError, Result};
pub use model::*;
