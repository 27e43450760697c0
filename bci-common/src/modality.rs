//! Recording modalities
//!
//! Each modality is one parallel recording stream of the same session. Folder
//! names on disk are inconsistent (`Semantic`, `semantics`), so parsing is
//! case-insensitive and accepts the known aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the parallel recording streams
///
/// Variants are declared in lexicographic order of their canonical names so the
/// derived `Ord` matches the column order of every emitted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Modality {
    Acoustic,
    Articulatory,
    General,
    Semantic,
}

impl Modality {
    /// All modalities in canonical (column) order
    pub const ALL: [Modality; 4] = [
        Modality::Acoustic,
        Modality::Articulatory,
        Modality::General,
        Modality::Semantic,
    ];

    /// Canonical lower-case name, used in table cells and column names
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Acoustic => "acoustic",
            Modality::Articulatory => "articulatory",
            Modality::General => "general",
            Modality::Semantic => "semantic",
        }
    }

    /// Column name holding this modality's path in the clean index
    pub fn path_column(&self) -> String {
        format!("{}_path", self.as_str())
    }

    /// Column name holding this modality's presence flag in the alignment report
    pub fn presence_column(&self) -> String {
        format!("has_{}", self.as_str())
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acoustic" | "acoustics" => Ok(Modality::Acoustic),
            "articulatory" | "articulation" => Ok(Modality::Articulatory),
            "general" => Ok(Modality::General),
            "semantic" | "semantics" => Ok(Modality::Semantic),
            other => Err(Error::InvalidInput(format!("Unknown modality: {:?}", other))),
        }
    }
}

impl TryFrom<String> for Modality {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases_case_insensitive() {
        assert_eq!("Semantic".parse::<Modality>().unwrap(), Modality::Semantic);
        assert_eq!("semantics".parse::<Modality>().unwrap(), Modality::Semantic);
        assert_eq!(" ACOUSTIC ".parse::<Modality>().unwrap(), Modality::Acoustic);
        assert!("visual".parse::<Modality>().is_err());
    }

    #[test]
    fn test_order_matches_column_names() {
        let mut names: Vec<&str> = Modality::ALL.iter().map(|m| m.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(Modality::General.path_column(), "general_path");
        assert_eq!(Modality::Articulatory.presence_column(), "has_articulatory");
    }
}
