//! # clf-core
//!
//! Core types shared by the CLF/CTF reader, writer and operator model.
//!
//! The Academy/ASC *Common LUT Format* (CLF) and the Autodesk *Color
//! Transform Format* (CTF) are XML container formats describing an ordered
//! list of color operators. This crate holds the pieces everything else is
//! built on:
//!
//! - [`scan`] - whitespace-aware tokenization and strict number parsing for
//!   the large numeric blocks found in LUT arrays
//! - [`Version`] - ordered `(major, minor)` file versions and the CLF to
//!   CTF version mapping
//! - [`BitDepth`] - declared scaling of stored parameters
//! - [`Metadata`] - the recursive `Info` / metadata tree attached to a
//!   process list and to every operator
//!
//! # Dependencies
//!
//! - [`thiserror`] - Error handling
//!
//! # Used By
//!
//! - `clf-ops` - Operator data model
//! - `clf-io` - Parser and writer

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod scan;

mod depth;
mod metadata;
mod version;

pub use depth::BitDepth;
pub use metadata::Metadata;
pub use version::{Version, VersionError, CLF_VERSION_MAX, CTF_VERSION_MAX};
pub use version::{V1_2, V1_3, V1_4, V1_5, V1_6, V1_7, V1_8, V2_0};
