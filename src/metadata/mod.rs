//! Metadata parsing for .NET modules (ECMA-335 partition II).
//!
//! Everything needed to get from the CLR runtime header of a PE image to decoded metadata rows
//! and attribute values, without ever loading the module for execution.
//!
//! # Key Components
//!
//! - [`moduleview`] - The loaded module, with identity, reference and attribute queries
//! - [`cor20header`] / [`root`] - CLR header and metadata root with its stream directory
//! - [`streams`] - The tables stream and the `#Strings` / `#Blob` heaps
//! - [`tables`] - Typed rows of the tables this crate reads
//! - [`signatures`] - Method signatures of attribute constructors
//! - [`customattributes`] - Custom attribute blob decoding
//! - [`identity`] - Assembly identities and public key tokens
//! - [`diagnostics`] - Non-fatal findings
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotinfo::metadata::moduleview::ModuleView;
//!
//! let view = ModuleView::from_mem(std::fs::read("Sample.dll")?)?;
//! for reference in view.references()? {
//!     println!("{}", reference.display_name());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of custom attribute parsing and representation
pub mod customattributes;
/// Non-fatal findings collected during extraction
pub mod diagnostics;
/// Assembly identities, versions and public key tokens
pub mod identity;
/// The loaded module and the queries it answers
pub mod moduleview;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method signatures
pub mod signatures;
/// Implementation of the metadata streams (tables, heaps)
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
