use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const LONGEST: &str = "longest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    R1,
    R2,
}

impl Strand {
    pub const BOTH: [Strand; 2] = [Strand::R1, Strand::R2];

    pub fn as_str(self) -> &'static str {
        match self {
            Strand::R1 => "R1",
            Strand::R2 => "R2",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strand {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "R1" | "1" => Ok(Strand::R1),
            "R2" | "2" => Ok(Strand::R2),
            _ => Err(CatalogError::InvalidStrand(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessingSelector {
    Longest,
    Named(String),
}

impl PreprocessingSelector {
    pub fn glob_value(&self) -> &str {
        match self {
            PreprocessingSelector::Longest => "*",
            PreprocessingSelector::Named(name) => name,
        }
    }
}

impl fmt::Display for PreprocessingSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessingSelector::Longest => write!(f, "{LONGEST}"),
            PreprocessingSelector::Named(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for PreprocessingSelector {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(CatalogError::InvalidPlaceholder {
                name: "preprocessing".to_string(),
                value: value.to_string(),
            });
        }
        if trimmed == LONGEST {
            return Ok(PreprocessingSelector::Longest);
        }
        Ok(PreprocessingSelector::Named(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CountConvention {
    #[default]
    Corrected,
    PreOffset,
}

impl fmt::Display for CountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountConvention::Corrected => write!(f, "corrected"),
            CountConvention::PreOffset => write!(f, "pre_offset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleKey(String);

impl SampleKey {
    pub fn new(fs_name: &str, preprocessing: &str) -> Self {
        Self(format!("{fs_name}:{preprocessing}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
