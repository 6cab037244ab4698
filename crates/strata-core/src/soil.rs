//! Canonical soil codes.
//!
//! Every distinct geology description gets a single-character `SoilId` in
//! order of first occurrence: the first 26 descriptions map to 'A'–'Z', the
//! next 26 to 'a'–'z'. There is no 53rd code.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Number of codes available ('A'–'Z' then 'a'–'z').
pub const SOIL_CODE_CAPACITY: usize = 52;

/// Text used for the unclassified sentinel in tables and logs.
pub const UNCLASSIFIED_LABEL: &str = "null";

/// Single-character soil code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "char", try_from = "char")]
pub struct SoilId(char);

impl SoilId {
    /// Code for the `index`-th distinct description, `None` past the capacity.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=25 => Some(Self((b'A' + index as u8) as char)),
            26..=51 => Some(Self((b'a' + (index - 26) as u8) as char)),
            _ => None,
        }
    }

    /// Position of this code in first-occurrence order.
    pub fn index(self) -> usize {
        match self.0 {
            'A'..='Z' => self.0 as usize - 'A' as usize,
            _ => self.0 as usize - 'a' as usize + 26,
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl TryFrom<char> for SoilId {
    type Error = String;

    fn try_from(c: char) -> std::result::Result<Self, Self::Error> {
        if c.is_ascii_alphabetic() {
            Ok(Self(c))
        } else {
            Err(format!("{c:?} is not a soil code (expected A-Z or a-z)"))
        }
    }
}

impl From<SoilId> for char {
    fn from(id: SoilId) -> char {
        id.0
    }
}

impl fmt::Display for SoilId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A soil code or the "null" sentinel for unlogged / unclassifiable ground.
///
/// Orders every `Soil` code before `Unclassified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SoilCode {
    Soil(SoilId),
    Unclassified,
}

impl SoilCode {
    pub fn is_unclassified(self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

impl From<SoilId> for SoilCode {
    fn from(id: SoilId) -> Self {
        Self::Soil(id)
    }
}

impl From<SoilCode> for String {
    fn from(code: SoilCode) -> String {
        code.to_string()
    }
}

impl TryFrom<String> for SoilCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s == UNCLASSIFIED_LABEL {
            return Ok(Self::Unclassified);
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => SoilId::try_from(c).map(Self::Soil),
            _ => Err(format!("{s:?} is neither a soil code nor {UNCLASSIFIED_LABEL:?}")),
        }
    }
}

impl fmt::Display for SoilCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soil(id) => write!(f, "{id}"),
            Self::Unclassified => f.write_str(UNCLASSIFIED_LABEL),
        }
    }
}

/// First-occurrence bijection between geology descriptions and soil codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoilCatalog {
    /// Descriptions indexed by `SoilId::index`.
    descriptions: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, SoilId>,
}

impl SoilCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `description`, assigning the next free one if unseen.
    pub fn assign(&mut self, description: &str) -> Result<SoilId> {
        if let Some(&id) = self.lookup.get(description) {
            return Ok(id);
        }
        let id = SoilId::from_index(self.descriptions.len()).ok_or_else(|| {
            StrataError::SoilCodeSpaceExhausted { description: description.to_string() }
        })?;
        self.descriptions.push(description.to_string());
        self.lookup.insert(description.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, description: &str) -> Option<SoilId> {
        self.lookup.get(description).copied()
    }

    pub fn description(&self, id: SoilId) -> Option<&str> {
        self.descriptions.get(id.index()).map(String::as_str)
    }

    /// Human-readable label: the description, or the sentinel text.
    pub fn label(&self, code: SoilCode) -> &str {
        match code {
            SoilCode::Soil(id) => self.description(id).unwrap_or(UNCLASSIFIED_LABEL),
            SoilCode::Unclassified => UNCLASSIFIED_LABEL,
        }
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    /// Codes and descriptions in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (SoilId, &str)> {
        self.descriptions
            .iter()
            .enumerate()
            .filter_map(|(i, d)| SoilId::from_index(i).map(|id| (id, d.as_str())))
    }

    /// Rebuild the lookup table after deserialization.
    pub fn reindex(&mut self) {
        self.lookup = self
            .iter()
            .map(|(id, d)| (d.to_string(), id))
            .collect();
    }
}
