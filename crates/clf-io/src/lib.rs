//! # clf-io
//!
//! Reader, writer and baker for the Academy/ASC *Common LUT Format*
//! (CLF) and the *Color Transform Format* (CTF).
//!
//! Both formats are XML containers describing an ordered ProcessList of
//! color operators; CTF is a strict superset of CLF. The reader turns a
//! byte stream into a [`clf_ops::ProcessList`] with all parameters
//! normalized to 32-bit float scaling; the writer emits either dialect;
//! the baker realizes an arbitrary evaluator as a 1D/3D LUT pipeline.
//! The sibling ASC CDL grammars (`.cc`, `.ccc`, `.cdl`) are handled by
//! the [`cdl`] module.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let pl = clf_io::read_clf(Path::new("grade.clf")).unwrap();
//! let mut rgba = [0.5, 0.3, 0.2, 1.0];
//! pl.apply(&mut rgba);
//! ```
//!
//! # Dependencies
//!
//! - [`clf-core`] - versions, bit depths, scanning
//! - [`clf-ops`] - the operator data model
//! - [`quick-xml`] - XML events in and out
//! - [`tracing`] - warnings for tolerated irregularities

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod baker;
mod error;
mod events;
mod parser;
mod readers;
mod tags;
mod writer;

pub mod cdl;

pub use baker::{Baker, BakeShape};
pub use error::{CancelToken, Error, ErrorKind, IoResult, WriteError};
pub use parser::{is_loadable, parse_process_list, read_clf, read_ctf, ParseOptions};
pub use writer::{write_process_list, Dialect};
