//! The extraction pipeline: path in, [`ModuleInfo`] out.

use std::{fs, io, path::Path};

use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    metadata::{
        diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
        moduleview::ModuleView,
    },
    moduleinfo::{ExtractorConfig, KnownAttribute, ModuleInfo, ModuleKind},
    Error, ExtractionError,
};

/// Extract module information from the file at `path` with the default configuration.
///
/// # Errors
/// Returns [`ExtractionError::NotFound`] if `path` does not name a readable file, and
/// [`ExtractionError::InvalidModule`] if it is not a .NET assembly.
pub fn extract(path: &Path) -> Result<ModuleInfo, ExtractionError> {
    extract_with(path, &ExtractorConfig::default())
}

/// Extract module information from the file at `path`.
///
/// The module is only ever read as data. Attributes that fail to decode do not fail the
/// extraction; they are reported in [`ModuleInfo::diagnostics`] and their field is left unset,
/// even if an earlier occurrence of the same attribute decoded.
///
/// # Errors
/// Returns [`ExtractionError::NotFound`] if `path` does not name a readable file, and
/// [`ExtractionError::InvalidModule`] if it is not a .NET assembly or exceeds
/// [`ExtractorConfig::max_file_size`].
pub fn extract_with(path: &Path, config: &ExtractorConfig) -> Result<ModuleInfo, ExtractionError> {
    debug!("Extracting module information from {}", path.display());

    let not_found = |source: io::Error| ExtractionError::NotFound {
        path: path.to_path_buf(),
        source,
    };

    let file_metadata = fs::metadata(path).map_err(not_found)?;
    if !file_metadata.is_file() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let location = path.canonicalize().map_err(not_found)?;

    if file_metadata.len() == 0 {
        return Err(ExtractionError::InvalidModule {
            path: location,
            source: Error::Empty,
        });
    }

    if file_metadata.len() > config.max_file_size {
        return Err(ExtractionError::InvalidModule {
            path: location,
            source: Error::FileTooLarge {
                size: file_metadata.len(),
                limit: config.max_file_size,
            },
        });
    }

    let view = if config.load_into_memory {
        fs::read(&location)
            .map_err(Error::FileError)
            .and_then(|data| ModuleView::from_mem_with(data, config.strict_headers))
    } else {
        ModuleView::from_file_with(&location, config.strict_headers)
    }
    .map_err(|error| ExtractionError::from_load(location.clone(), error))?;

    let identity = match view.assembly() {
        Ok(identity) => identity,
        Err(source) => {
            return Err(ExtractionError::InvalidModule {
                path: location,
                source,
            })
        }
    };

    let mut info = ModuleInfo::new(
        ModuleKind::from_path(path),
        identity,
        location,
        view.runtime_version().to_string(),
    );
    info.creation_time = file_metadata.created().ok().map(DateTime::<Local>::from);
    info.last_write_time = file_metadata.modified().ok().map(DateTime::<Local>::from);
    info.last_access_time = file_metadata.accessed().ok().map(DateTime::<Local>::from);

    let mut diagnostics = Diagnostics::new();
    for attribute in view.assembly_attributes(&mut diagnostics) {
        let Some(kind) = KnownAttribute::from_type_name(&attribute.type_name) else {
            debug!("Skipping attribute {}", attribute.type_name);
            continue;
        };

        if !kind.sets_field() {
            continue;
        }

        let result = match view.decode_attribute(&attribute) {
            Ok(value) => {
                if let Some(error) = &value.named_args_error {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticSeverity::Info,
                            DiagnosticCategory::CustomAttribute,
                            format!(
                                "Ignored named arguments of {}: {error}",
                                attribute.type_name
                            ),
                        )
                        .with_token(attribute.token),
                    );
                }
                kind.apply(&value, &mut info)
            }
            Err(error) => Err(ExtractionError::AttributeDecode {
                attribute: attribute.type_name.clone(),
                message: error.to_string(),
            }),
        };

        // The last occurrence wins, even when it cannot be decoded
        if let Err(error) = result {
            kind.clear(&mut info);
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticSeverity::Warning,
                    DiagnosticCategory::CustomAttribute,
                    error.to_string(),
                )
                .with_token(attribute.token),
            );
        }
    }

    info.references = match view.references() {
        Ok(references) => references,
        Err(source) => {
            return Err(ExtractionError::InvalidModule {
                path: info.location,
                source,
            })
        }
    };

    for diagnostic in diagnostics.iter() {
        match diagnostic.severity {
            DiagnosticSeverity::Info => debug!("{}: {}", info.location.display(), diagnostic),
            _ => warn!("{}: {}", info.location.display(), diagnostic),
        }
    }
    info.diagnostics = diagnostics.into_vec();

    debug!(
        "Extracted {} with {} references",
        info.full_name,
        info.references.len()
    );

    Ok(info)
}

/// Extract module information from every path in parallel.
///
/// The results are in the same order as `paths`; a failure for one path does not affect the
/// others.
pub fn extract_all<P: AsRef<Path> + Sync>(paths: &[P]) -> Vec<Result<ModuleInfo, ExtractionError>> {
    paths
        .par_iter()
        .map(|path| extract(path.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::test::builder::{
        int32_attribute_blob, string_attribute_blob, Constructor, ModuleBuilder, Param,
    };

    fn write_module(dir: &Path, file_name: &str, builder: ModuleBuilder) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, builder.build()).unwrap();
        path
    }

    fn string_attribute(name: &str) -> Constructor {
        Constructor::new("System.Reflection", name).param(Param::String)
    }

    #[test]
    fn extracts_identity_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample")
                .version(1, 2, 0, 0)
                .attribute(
                    string_attribute("AssemblyTitleAttribute"),
                    string_attribute_blob(Some("Sample Title")),
                )
                .attribute(
                    string_attribute("AssemblyCopyrightAttribute"),
                    string_attribute_blob(Some("Copyright © 2024")),
                )
                .attribute(
                    Constructor::new("System.Runtime.Versioning", "TargetFrameworkAttribute")
                        .param(Param::String),
                    string_attribute_blob(Some(".NETFramework,Version=v4.7.2")),
                )
                .attribute(
                    Constructor::new("System.Diagnostics", "DebuggableAttribute")
                        .param(Param::NestedEnum("DebuggingModes".to_string())),
                    int32_attribute_blob(2),
                )
                .reference("mscorlib", (4, 0, 0, 0), Some([0xb7, 0x7a, 0x5c, 0x56, 0x19, 0x34, 0xe0, 0x89])),
        );

        let info = extract(&path).unwrap();

        assert_eq!(info.id, 0);
        assert_eq!(info.kind(), ModuleKind::Dll);
        assert_eq!(info.name(), "Sample");
        assert_eq!(
            info.full_name(),
            "Sample, Version=1.2.0.0, Culture=neutral, PublicKeyToken=null"
        );
        assert_eq!(info.location(), path.canonicalize().unwrap());
        assert!(info.location().is_absolute());
        assert!(info.last_write_time().is_some());
        assert_eq!(info.runtime_version(), "v4.0.30319");
        assert_eq!(info.title(), Some("Sample Title"));
        assert_eq!(info.copyright(), Some("Copyright © 2024"));
        assert_eq!(info.framework_version(), Some("4.7.2"));
        assert_eq!(info.debug_info(), Some("10"));
        assert_eq!(info.references_as_text(), "mscorlib");
        assert_eq!(info.name_and_version(), "Sample.dll   v1.2.0.0   fw:4.7.2");
        assert!(info.diagnostics().is_empty());
    }

    #[test]
    fn last_duplicate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample")
                .attribute(
                    string_attribute("AssemblyCompanyAttribute"),
                    string_attribute_blob(Some("First")),
                )
                .attribute(
                    string_attribute("AssemblyCompanyAttribute"),
                    string_attribute_blob(Some("Second")),
                ),
        );

        assert_eq!(extract(&path).unwrap().company(), Some("Second"));
    }

    #[test]
    fn undecodable_last_duplicate_clears_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample")
                .attribute(
                    string_attribute("AssemblyTitleAttribute"),
                    string_attribute_blob(Some("First")),
                )
                .attribute(
                    string_attribute("AssemblyTitleAttribute"),
                    string_attribute_blob(None),
                )
                .attribute(
                    Constructor::new("System.Runtime.Versioning", "TargetFrameworkAttribute")
                        .param(Param::String),
                    string_attribute_blob(Some(".NETFramework,Version=v4.8")),
                )
                .attribute(
                    Constructor::new("System.Runtime.Versioning", "TargetFrameworkAttribute")
                        .param(Param::String),
                    int32_attribute_blob(48),
                ),
        );

        let info = extract(&path).unwrap();

        assert_eq!(info.title(), None);
        assert_eq!(info.target_framework(), None);
        assert_eq!(info.framework_version(), None);
        assert_eq!(info.name_and_version(), "Sample.dll   v0.0.0.0 ");
        assert_eq!(info.diagnostics().len(), 2);
    }

    #[test]
    fn damaged_named_arguments_keep_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut blob = string_attribute_blob(Some("Sample Title"));
        // One named property with an undefined type tag
        blob.truncate(blob.len() - 2);
        blob.extend_from_slice(&[0x01, 0x00, 0x54, 0x99, 0x01, b'X']);

        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample").attribute(string_attribute("AssemblyTitleAttribute"), blob),
        );

        let info = extract(&path).unwrap();

        assert_eq!(info.title(), Some("Sample Title"));
        assert_eq!(info.diagnostics().len(), 1);
        assert_eq!(info.diagnostics()[0].severity, DiagnosticSeverity::Info);
        assert!(info.diagnostics()[0].message.contains("named arguments"));
    }

    #[test]
    fn decode_failures_become_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample")
                .attribute(
                    string_attribute("AssemblyTitleAttribute"),
                    string_attribute_blob(None),
                )
                .attribute(
                    Constructor::new("System.Diagnostics", "DebuggableAttribute")
                        .param(Param::Bool)
                        .param(Param::Bool),
                    vec![0x01, 0x00, 0x01, 0x00, 0x00, 0x00],
                )
                .attribute(
                    string_attribute("AssemblyProductAttribute"),
                    string_attribute_blob(Some("Product")),
                ),
        );

        let info = extract(&path).unwrap();

        assert_eq!(info.title(), None);
        assert_eq!(info.debug_info(), None);
        assert_eq!(info.product(), Some("Product"));

        let diagnostics = info.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.category == DiagnosticCategory::CustomAttribute && d.token.is_some()));
        assert!(diagnostics[0]
            .message
            .contains("System.Reflection.AssemblyTitleAttribute"));
    }

    #[test]
    fn unknown_and_ignored_attributes_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Tool.EXE",
            ModuleBuilder::new("Tool")
                .attribute(
                    Constructor::new("Vendor.Build", "BuildStampAttribute").param(Param::Int32),
                    vec![0xFF],
                )
                .attribute(
                    Constructor::new("System.Runtime.CompilerServices", "CompilationRelaxationsAttribute")
                        .param(Param::Int32),
                    int32_attribute_blob(8),
                )
                .attribute(
                    string_attribute("AssemblyFileVersionAttribute"),
                    vec![0xFF],
                ),
        );

        let info = extract(&path).unwrap();
        assert_eq!(info.kind(), ModuleKind::Exe);
        assert!(info.diagnostics().is_empty());
        assert_eq!(info.title(), None);
        assert_eq!(info.name_and_version(), "Tool.exe   v0.0.0.0 ");
    }

    #[test]
    fn size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(dir.path(), "Sample.dll", ModuleBuilder::new("Sample"));

        let config = ExtractorConfig {
            max_file_size: 0x100,
            ..ExtractorConfig::default()
        };

        assert!(matches!(
            extract_with(&path, &config),
            Err(ExtractionError::InvalidModule {
                source: Error::FileTooLarge { limit: 0x100, .. },
                ..
            })
        ));
    }

    #[test]
    fn buffered_and_mapped_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Sample.dll",
            ModuleBuilder::new("Sample").attribute(
                string_attribute("AssemblyDescriptionAttribute"),
                string_attribute_blob(Some("Description")),
            ),
        );

        let config = ExtractorConfig {
            load_into_memory: true,
            ..ExtractorConfig::default()
        };

        let buffered = extract_with(&path, &config).unwrap();
        let mapped = extract(&path).unwrap();
        assert_eq!(buffered.full_name(), mapped.full_name());
        assert_eq!(buffered.description(), Some("Description"));
        assert_eq!(mapped.description(), Some("Description"));
    }

    #[test]
    fn strict_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Sample.dll");
        let mut image = ModuleBuilder::new("Sample").build();
        // Undefined CLR header flag bit
        image[0x200 + 19] = 0x80;
        fs::write(&path, image).unwrap();

        assert!(extract(&path).is_ok());
        assert!(matches!(
            extract_with(&path, &ExtractorConfig::strict()),
            Err(ExtractionError::InvalidModule { .. })
        ));
    }

    #[test]
    fn netmodule_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(
            dir.path(),
            "Part.netmodule",
            ModuleBuilder::new("Part").without_assembly(),
        );

        assert!(matches!(
            extract(&path),
            Err(ExtractionError::InvalidModule { .. })
        ));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract(dir.path()),
            Err(ExtractionError::NotFound { .. })
        ));
    }

    #[test]
    fn extract_all_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_module(dir.path(), "First.dll", ModuleBuilder::new("First"));
        let second = write_module(dir.path(), "Second.exe", ModuleBuilder::new("Second"));
        let missing = dir.path().join("Missing.dll");

        let results = extract_all(&[first, missing, second]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name(), "First");
        assert!(matches!(results[1], Err(ExtractionError::NotFound { .. })));
        assert_eq!(results[2].as_ref().unwrap().name(), "Second");
    }
}
