//! Assembly identities: name, version, culture and public key token.
//!
//! Both the module's own assembly (`Assembly` table) and every dependency (`AssemblyRef`
//! table) are described by an [`AssemblyIdentity`]. Its [`AssemblyIdentity::display_name`]
//! produces the familiar
//! `Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089` form.
//!
//! A public key token is the last 8 bytes of the SHA-1 hash of the full public key, in reverse
//! order. `AssemblyRef` rows usually store the token directly; the `PUBLIC_KEY` flag marks rows
//! that store the full key instead.

use std::fmt::{self, Write as _};

use bitflags::bitflags;
use sha1::{Digest, Sha1};

use crate::{
    metadata::{
        streams::{Blob, Strings},
        tables::{AssemblyRaw, AssemblyRefRaw},
    },
    Result,
};

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// `AssemblyFlags` (ECMA-335 II.23.1.2)
    pub struct AssemblyFlags : u32 {
        /// The row holds the full public key rather than its token
        const PUBLIC_KEY = 0x0001;
        /// The referenced assembly may be retargeted at runtime
        const RETARGETABLE = 0x0100;
        /// Reserved
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// Reserved
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// A four-part assembly version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its four components
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Compute the 8-byte public key token of a full public key.
#[must_use]
pub fn public_key_token(public_key: &[u8]) -> [u8; 8] {
    let hash = Sha1::digest(public_key);

    let mut token = [0_u8; 8];
    for (target, source) in token.iter_mut().zip(hash[hash.len() - 8..].iter().rev()) {
        *target = *source;
    }

    token
}

/// The identity of an assembly, as used in display names and reference lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple name, e.g. `System.Runtime`
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, `None` for culture-neutral assemblies
    pub culture: Option<String>,
    /// Public key token, `None` for assemblies without a strong name
    pub public_key_token: Option<[u8; 8]>,
    /// Set for retargetable references
    pub retargetable: bool,
}

impl AssemblyIdentity {
    /// Build the identity of the module's own assembly from its `Assembly` row.
    ///
    /// # Errors
    /// Returns an error if the name, culture or public key cannot be read from the heaps.
    pub fn from_assembly(row: &AssemblyRaw, strings: &Strings, blob: Option<&Blob>) -> Result<Self> {
        let public_key = read_blob(blob, row.public_key)?;

        Ok(AssemblyIdentity {
            name: strings.get(row.name as usize)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: read_culture(strings, row.culture)?,
            public_key_token: public_key.map(public_key_token),
            retargetable: AssemblyFlags::from_bits_truncate(row.flags)
                .contains(AssemblyFlags::RETARGETABLE),
        })
    }

    /// Build a dependency identity from an `AssemblyRef` row.
    ///
    /// # Errors
    /// Returns an error if the heaps cannot be read, or the stored token is not 8 bytes long.
    pub fn from_assembly_ref(
        row: &AssemblyRefRaw,
        strings: &Strings,
        blob: Option<&Blob>,
    ) -> Result<Self> {
        let flags = AssemblyFlags::from_bits_truncate(row.flags);

        let public_key_token = match read_blob(blob, row.public_key_or_token)? {
            None => None,
            Some(public_key) if flags.contains(AssemblyFlags::PUBLIC_KEY) => {
                Some(public_key_token(public_key))
            }
            Some(token) => match <[u8; 8]>::try_from(token) {
                Ok(token) => Some(token),
                Err(_) => {
                    return Err(malformed_error!(
                        "Public key token of {} has {} bytes, expected 8",
                        row.token,
                        token.len()
                    ))
                }
            },
        };

        Ok(AssemblyIdentity {
            name: strings.get(row.name as usize)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: read_culture(strings, row.culture)?,
            public_key_token,
            retargetable: flags.contains(AssemblyFlags::RETARGETABLE),
        })
    }

    /// The public key token as lowercase hex, or `"null"`
    #[must_use]
    pub fn public_key_token_string(&self) -> String {
        match &self.public_key_token {
            Some(token) => token.iter().fold(String::with_capacity(16), |mut out, byte| {
                let _ = write!(out, "{byte:02x}");
                out
            }),
            None => "null".to_string(),
        }
    }

    /// The full display name, e.g.
    /// `mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089`
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );
        let _ = write!(result, ", PublicKeyToken={}", self.public_key_token_string());

        if self.retargetable {
            result.push_str(", Retargetable=Yes");
        }

        result
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

fn read_blob<'a>(blob: Option<&Blob<'a>>, index: u32) -> Result<Option<&'a [u8]>> {
    if index == 0 {
        return Ok(None);
    }

    let Some(blob) = blob else {
        return Err(malformed_error!(
            "Blob index {} used, but the module has no #Blob heap",
            index
        ));
    };

    let data = blob.get(index as usize)?;
    Ok(if data.is_empty() { None } else { Some(data) })
}

fn read_culture(strings: &Strings, index: u32) -> Result<Option<String>> {
    if index == 0 {
        return Ok(None);
    }

    let culture = strings.get(index as usize)?;
    Ok(if culture.is_empty() {
        None
    } else {
        Some(culture.to_string())
    })
}
