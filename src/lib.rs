// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotinfo
//!
//! Descriptive information about .NET modules, read straight from the ECMA-335 metadata
//! without loading or executing anything.
//!
//! Given the path of a `.dll` or `.exe`, `dotinfo` reports the assembly identity, the file
//! timestamps, the values of the well-known assembly attributes (title, description, company,
//! copyright, target framework, ...) and the list of referenced assemblies.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let info = dotinfo::extract(Path::new("MyLibrary.dll"))?;
//!
//! println!("{}", info.full_name());
//! println!("{}", info.name_and_version());
//! for reference in info.references() {
//!     println!("  -> {reference}");
//! }
//! # Ok::<(), dotinfo::ExtractionError>(())
//! ```
//!
//! Many modules can be processed in parallel; the results keep the order of the input:
//!
//! ```rust,no_run
//! let results = dotinfo::extract_all(&["First.dll", "Second.exe"]);
//! for result in results {
//!     match result {
//!         Ok(info) => println!("{}", info.name_and_version()),
//!         Err(error) => eprintln!("{error}"),
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - PE image access, memory-mapped or buffered
//! - [`metadata`] - CLR header, metadata root, heaps, tables and custom attribute decoding
//! - [`moduleinfo`] - The extraction pipeline and the [`ModuleInfo`] record
//!
//! ## Errors
//!
//! Loading and parsing produce [`Error`]; the public extraction API classifies those into
//! [`ExtractionError`]. A recognized attribute that cannot be decoded does not fail the
//! extraction, it is reported through [`ModuleInfo::diagnostics`].

#[macro_use]
pub(crate) mod error;

pub mod file;
pub mod metadata;
pub mod moduleinfo;

#[cfg(test)]
pub(crate) mod test;

/// `dotinfo` Result type
pub type Result<T> = std::result::Result<T, Error>;

pub use error::{Error, ExtractionError};
pub use metadata::{
    diagnostics::Diagnostic,
    identity::{AssemblyIdentity, AssemblyVersion},
};
pub use moduleinfo::{
    extract, extract_all, extract_with, ExtractorConfig, KnownAttribute, ModuleInfo, ModuleKind,
    TargetFramework,
};
