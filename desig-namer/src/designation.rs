//! Designation values: `<base><YY><suffix>`, e.g. `XY24aaaab`

use desig_common::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

use crate::codec::{successor, suffix_order};

/// Read the two-digit year token that follows `base`
///
/// Only the two characters right after `base.len()` are inspected.
pub fn extract_year(designation: &str, base: &str) -> Result<u8> {
    let start = base.len();
    let token = designation
        .get(start..start + 2)
        .ok_or_else(|| {
            Error::Format(format!(
                "Designation '{}' too short for base '{}' plus a two-digit year",
                designation, base
            ))
        })?;

    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Format(format!(
            "Designation '{}' has no two-digit year after base '{}' (found '{}')",
            designation, base, token
        )));
    }

    token
        .parse::<u8>()
        .map_err(|e| Error::Format(format!("Bad year token '{}': {}", token, e)))
}

/// A parsed designation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Designation {
    base: String,
    year: u8,
    suffix: String,
}

impl Designation {
    /// Build from parts; `year` is taken modulo 100
    pub fn new(base: impl Into<String>, year: u8, suffix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            year: year % 100,
            suffix: suffix.into(),
        }
    }

    /// Parse a stored designation issued under `base`
    ///
    /// Rejects a different base, a missing year token, and a suffix that is
    /// empty or not lowercase letters.
    pub fn parse(raw: &str, base: &str) -> Result<Self> {
        if !raw.starts_with(base) {
            return Err(Error::Format(format!(
                "Designation '{}' does not start with base '{}'",
                raw, base
            )));
        }

        let year = extract_year(raw, base)?;
        let suffix = &raw[base.len() + 2..];

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(Error::Format(format!(
                "Designation '{}' has invalid suffix '{}'",
                raw, suffix
            )));
        }

        Ok(Self::new(base, year, suffix))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn year(&self) -> u8 {
        self.year
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Next designation in the same scope
    pub fn successor(&self) -> Self {
        Self {
            base: self.base.clone(),
            year: self.year,
            suffix: successor(&self.suffix),
        }
    }
}

impl fmt::Display for Designation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}{}", self.base, self.year, self.suffix)
    }
}

impl PartialOrd for Designation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scope first, then allocation order within the scope
impl Ord for Designation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then(self.year.cmp(&other.year))
            .then_with(|| suffix_order(&self.suffix, &other.suffix))
    }
}
