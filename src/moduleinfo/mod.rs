//! Descriptive information about a .NET module.
//!
//! [`ModuleInfo`] is the flat record produced by [`crate::extract`]: identity, file
//! timestamps, the values of well-known assembly attributes and the list of referenced
//! assemblies, plus a few display strings derived from them.
//!
//! # Key Components
//!
//! - [`ModuleInfo`] - The extracted record
//! - [`ModuleKind`] - Executable or library, from the file extension
//! - [`TargetFramework`] - Raw target framework moniker with its derived .NET Framework version
//! - [`KnownAttribute`] - The attribute types that populate fields
//! - [`ExtractorConfig`] - Limits and options of an extraction
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let info = dotinfo::extract(Path::new("Sample.dll"))?;
//!
//! println!("{}", info.name_and_version());
//! if let Some(title) = info.title() {
//!     println!("Title: {title}");
//! }
//! println!("References:\n{}", info.references_as_text());
//! # Ok::<(), dotinfo::ExtractionError>(())
//! ```

mod attributes;
mod config;
mod extractor;

pub use attributes::KnownAttribute;
pub use config::ExtractorConfig;
pub use extractor::{extract, extract_all, extract_with};

use std::{fmt, path::Path, path::PathBuf};

use chrono::{DateTime, Local};
use strum::Display;

use crate::metadata::{
    diagnostics::Diagnostic,
    identity::{AssemblyIdentity, AssemblyVersion},
};

/// Separator used by [`ModuleInfo::references_as_text`]
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// Separator used by [`ModuleInfo::references_as_text`]
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

const NET_FRAMEWORK_PREFIX: &str = ".NETFramework,Version=v";

/// Kind of module, derived from the file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ModuleKind {
    /// Any extension other than `.exe` and `.dll`
    #[default]
    Unknown,
    /// `.exe`
    Exe,
    /// `.dll`
    Dll,
}

impl ModuleKind {
    /// Classify `path` by the suffix of its file name, ignoring case.
    ///
    /// A file named just `.dll` counts as a library.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(file_name) = path.file_name() else {
            return ModuleKind::Unknown;
        };

        let file_name = file_name.to_string_lossy().to_ascii_lowercase();
        if file_name.ends_with(".exe") {
            ModuleKind::Exe
        } else if file_name.ends_with(".dll") {
            ModuleKind::Dll
        } else {
            ModuleKind::Unknown
        }
    }
}

/// The value of a `TargetFrameworkAttribute`, e.g. `.NETFramework,Version=v4.7.2`.
///
/// The .NET Framework version is derived once, on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    value: String,
    framework_version: Option<String>,
}

impl TargetFramework {
    /// Wrap a target framework moniker
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let framework_version = value
            .strip_prefix(NET_FRAMEWORK_PREFIX)
            .map(ToString::to_string);

        TargetFramework {
            value,
            framework_version,
        }
    }

    /// The moniker as stored in the attribute
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The version part of a `.NETFramework,Version=v...` moniker, `None` for other frameworks
    #[must_use]
    pub fn framework_version(&self) -> Option<&str> {
        self.framework_version.as_deref()
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Descriptive information about a module.
///
/// Everything except [`ModuleInfo::id`] is fixed once extraction finishes. Optional fields are
/// only set if the module carries the corresponding attribute and it decoded successfully; if
/// an attribute occurs more than once, the last occurrence wins.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Caller-assigned identifier, 0 unless set
    pub id: u32,
    kind: ModuleKind,
    identity: AssemblyIdentity,
    full_name: String,
    location: PathBuf,
    creation_time: Option<DateTime<Local>>,
    last_write_time: Option<DateTime<Local>>,
    last_access_time: Option<DateTime<Local>>,
    runtime_version: String,
    title: Option<String>,
    description: Option<String>,
    company: Option<String>,
    guid: Option<String>,
    copyright: Option<String>,
    product: Option<String>,
    trademark: Option<String>,
    target_framework: Option<TargetFramework>,
    debug_info: Option<String>,
    references: Vec<AssemblyIdentity>,
    diagnostics: Vec<Diagnostic>,
}

impl ModuleInfo {
    pub(crate) fn new(
        kind: ModuleKind,
        identity: AssemblyIdentity,
        location: PathBuf,
        runtime_version: String,
    ) -> Self {
        ModuleInfo {
            id: 0,
            kind,
            full_name: identity.display_name(),
            identity,
            location,
            creation_time: None,
            last_write_time: None,
            last_access_time: None,
            runtime_version,
            title: None,
            description: None,
            company: None,
            guid: None,
            copyright: None,
            product: None,
            trademark: None,
            target_framework: None,
            debug_info: None,
            references: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        ModuleInfo::new(
            ModuleKind::Dll,
            AssemblyIdentity {
                name: "Sample".to_string(),
                version: AssemblyVersion::new(1, 2, 0, 0),
                culture: None,
                public_key_token: None,
                retargetable: false,
            },
            PathBuf::from("/modules/Sample.dll"),
            "v4.0.30319".to_string(),
        )
    }

    /// Module kind, from the file extension
    #[must_use]
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Simple assembly name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Display name, e.g. `Sample, Version=1.2.0.0, Culture=neutral, PublicKeyToken=null`
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The complete identity of the assembly
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// Absolute path the module was read from
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// File creation time, if the filesystem records it
    #[must_use]
    pub fn creation_time(&self) -> Option<DateTime<Local>> {
        self.creation_time
    }

    /// Last modification time
    #[must_use]
    pub fn last_write_time(&self) -> Option<DateTime<Local>> {
        self.last_write_time
    }

    /// Last access time
    #[must_use]
    pub fn last_access_time(&self) -> Option<DateTime<Local>> {
        self.last_access_time
    }

    /// Assembly version
    #[must_use]
    pub fn version(&self) -> AssemblyVersion {
        self.identity.version
    }

    /// Runtime version from the metadata root, e.g. `v4.0.30319`
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    /// `AssemblyTitleAttribute`
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `AssemblyDescriptionAttribute`
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `AssemblyCompanyAttribute`
    #[must_use]
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    /// `GuidAttribute`
    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    /// `AssemblyCopyrightAttribute`
    #[must_use]
    pub fn copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    /// `AssemblyProductAttribute`
    #[must_use]
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// `AssemblyTrademarkAttribute`
    #[must_use]
    pub fn trademark(&self) -> Option<&str> {
        self.trademark.as_deref()
    }

    /// `TargetFrameworkAttribute`
    #[must_use]
    pub fn target_framework(&self) -> Option<&TargetFramework> {
        self.target_framework.as_ref()
    }

    /// The .NET Framework version of the target framework, e.g. `4.7.2`
    #[must_use]
    pub fn framework_version(&self) -> Option<&str> {
        self.target_framework
            .as_ref()
            .and_then(TargetFramework::framework_version)
    }

    /// `DebuggableAttribute` debugging modes, in base 2
    #[must_use]
    pub fn debug_info(&self) -> Option<&str> {
        self.debug_info.as_deref()
    }

    /// Referenced assemblies, in metadata order
    #[must_use]
    pub fn references(&self) -> &[AssemblyIdentity] {
        &self.references
    }

    /// Names of the referenced assemblies, one per line
    #[must_use]
    pub fn references_as_text(&self) -> String {
        self.references
            .iter()
            .map(|reference| reference.name.as_str())
            .collect::<Vec<_>>()
            .join(LINE_SEPARATOR)
    }

    /// Attribute decode problems found during extraction
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// One-line label, e.g. `Sample.dll   v1.2.0.0   fw:4.7.2`
    #[must_use]
    pub fn name_and_version(&self) -> String {
        let mut label = format!("{}.{}   v{} ", self.name(), self.kind, self.version());
        if let Some(framework_version) = self.framework_version() {
            label.push_str("  fw:");
            label.push_str(framework_version);
        }
        label
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> AssemblyIdentity {
        AssemblyIdentity {
            name: name.to_string(),
            version: AssemblyVersion::new(4, 0, 0, 0),
            culture: None,
            public_key_token: None,
            retargetable: false,
        }
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ModuleKind::from_path(Path::new("a/Sample.dll")), ModuleKind::Dll);
        assert_eq!(ModuleKind::from_path(Path::new("Sample.DLL")), ModuleKind::Dll);
        assert_eq!(ModuleKind::from_path(Path::new("Tool.Exe")), ModuleKind::Exe);
        assert_eq!(ModuleKind::from_path(Path::new("Sample.netmodule")), ModuleKind::Unknown);
        assert_eq!(ModuleKind::from_path(Path::new("Sample")), ModuleKind::Unknown);
        assert_eq!(ModuleKind::from_path(Path::new("dll")), ModuleKind::Unknown);
        assert_eq!(ModuleKind::from_path(Path::new("a/.dll")), ModuleKind::Dll);
        assert_eq!(ModuleKind::from_path(Path::new(".EXE")), ModuleKind::Exe);
        assert_eq!(ModuleKind::from_path(Path::new("Sample.dll.config")), ModuleKind::Unknown);
        assert_eq!(ModuleKind::from_path(Path::new("/")), ModuleKind::Unknown);
    }

    #[test]
    fn kind_display_is_lowercase() {
        assert_eq!(ModuleKind::Unknown.to_string(), "unknown");
        assert_eq!(ModuleKind::Exe.to_string(), "exe");
        assert_eq!(ModuleKind::Dll.to_string(), "dll");
    }

    #[test]
    fn target_framework_version() {
        let framework = TargetFramework::new(".NETFramework,Version=v4.7.2");
        assert_eq!(framework.value(), ".NETFramework,Version=v4.7.2");
        assert_eq!(framework.framework_version(), Some("4.7.2"));

        assert_eq!(
            TargetFramework::new(".NETCoreApp,Version=v8.0").framework_version(),
            None
        );
        assert_eq!(
            TargetFramework::new(".NETFramework,Version=v").framework_version(),
            Some("")
        );
        assert_eq!(
            TargetFramework::new("x.NETFramework,Version=v4.8").framework_version(),
            None
        );
    }

    #[test]
    fn label_without_framework() {
        let info = ModuleInfo::empty();
        assert_eq!(info.name_and_version(), "Sample.dll   v1.2.0.0 ");
        assert!(!info.name_and_version().contains("fw:"));
    }

    #[test]
    fn label_with_framework() {
        let mut info = ModuleInfo::empty();
        info.target_framework = Some(TargetFramework::new(".NETFramework,Version=v4.8"));
        assert_eq!(info.name_and_version(), "Sample.dll   v1.2.0.0   fw:4.8");

        info.target_framework = Some(TargetFramework::new(".NETStandard,Version=v2.0"));
        assert_eq!(info.name_and_version(), "Sample.dll   v1.2.0.0 ");
    }

    #[test]
    fn references_text() {
        let mut info = ModuleInfo::empty();
        assert_eq!(info.references_as_text(), "");

        info.references = vec![reference("mscorlib")];
        assert_eq!(info.references_as_text(), "mscorlib");

        info.references = vec![reference("mscorlib"), reference("System"), reference("System.Core")];
        assert_eq!(
            info.references_as_text(),
            ["mscorlib", "System", "System.Core"].join(LINE_SEPARATOR)
        );
    }

    #[test]
    fn display_is_full_name() {
        let mut info = ModuleInfo::empty();
        info.id = 7;
        assert_eq!(
            info.to_string(),
            "Sample, Version=1.2.0.0, Culture=neutral, PublicKeyToken=null"
        );
        assert_eq!(info.full_name(), info.to_string());
        assert_eq!(info.id, 7);
    }
}
