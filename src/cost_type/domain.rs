//! Core cost type domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CostTypeId};

/// A validated, non-empty cost type name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CostTypeName(String);

impl CostTypeName {
    /// Create a cost type name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCostTypeName] if `name` is empty or only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCostTypeName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a cost type name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CostTypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CostTypeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CostTypeName::new(s)
    }
}

impl Display for CostTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category of income or spending, e.g. "Rent" or "Office supplies".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CostType {
    pub id: CostTypeId,
    pub name: CostTypeName,
}

/// Request body for creating and editing cost types.
#[derive(Debug, Serialize, Deserialize)]
pub struct CostTypeData {
    pub name: String,
}
