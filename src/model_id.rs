// SPDX-License-Identifier: MIT

//! Model identifiers parsed from 3DSky archive filenames

use std::fmt;
use std::path::Path;

use crate::{Result, SkyorgError};

/// Identifier embedded in a 3DSky archive filename.
///
/// Archives are named `<number>.<hex>.<ext>`, e.g. `2871534.5f2c1a9be8d4.zip`.
/// The decimal number is the catalog model number; the hex suffix
/// disambiguates re-uploads of the same model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    number: String,
    hash: String,
}

impl ModelId {
    /// Parse a model id from a file name or path.
    ///
    /// The stem (everything before the final extension) must match
    /// `<digits>.<lowercase hex>`.
    pub fn from_filename(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SkyorgError::InvalidModelId(path.display().to_string()))?;

        Self::parse(stem)
    }

    /// Parse a model id from its canonical `number.hash` form.
    pub fn parse(stem: &str) -> Result<Self> {
        let (number, hash) = stem
            .split_once('.')
            .ok_or_else(|| SkyorgError::InvalidModelId(stem.to_string()))?;

        let number_ok = !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit());
        let hash_ok = !hash.is_empty()
            && hash
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if !number_ok || !hash_ok {
            return Err(SkyorgError::InvalidModelId(stem.to_string()));
        }

        Ok(Self {
            number: number.to_string(),
            hash: hash.to_string(),
        })
    }

    /// Catalog model number (the part before the dot).
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Hex suffix (the part after the dot).
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Check whether an image file belongs to this model.
    ///
    /// Preview images shipped next to an archive share the model number as
    /// their stem prefix.
    pub fn matches_image(&self, path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| stem.starts_with(self.number.as_str()))
            .unwrap_or(false)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.number, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_archive_filename() {
        let id = ModelId::from_filename(Path::new("2871534.5f2c1a9be8d4.zip")).unwrap();
        assert_eq!(id.number(), "2871534");
        assert_eq!(id.hash(), "5f2c1a9be8d4");
        assert_eq!(id.to_string(), "2871534.5f2c1a9be8d4");
    }

    #[test]
    fn rejects_plain_names() {
        assert!(ModelId::from_filename(Path::new("kitchen_table.zip")).is_err());
        assert!(ModelId::from_filename(Path::new("model.zip")).is_err());
    }

    #[test]
    fn rejects_uppercase_hex() {
        assert!(ModelId::parse("123.ABCDEF").is_err());
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(ModelId::parse(".abcdef").is_err());
        assert!(ModelId::parse("123.").is_err());
        assert!(ModelId::parse("123").is_err());
    }

    #[test]
    fn matches_related_images() {
        let id = ModelId::parse("2871534.5f2c1a9be8d4").unwrap();
        assert!(id.matches_image(&PathBuf::from("2871534.jpeg")));
        assert!(id.matches_image(&PathBuf::from("2871534_alt.png")));
        assert!(!id.matches_image(&PathBuf::from("999.jpeg")));
    }
}
