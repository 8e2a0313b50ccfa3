use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How differing input extents combine into the output extent
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundingBoxMode {
    #[serde(rename(deserialize = "union"))]
    Union,
    #[default]
    #[serde(rename(deserialize = "intersection"))]
    Intersection,
}

#[derive(Debug)]
pub struct BoundingBoxModeParseError;

impl fmt::Display for BoundingBoxModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid bounding box mode, expected 'union' or 'intersection'")
    }
}

impl std::error::Error for BoundingBoxModeParseError {}

impl FromStr for BoundingBoxMode {
    type Err = BoundingBoxModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "union" => Ok(BoundingBoxMode::Union),
            "intersection" => Ok(BoundingBoxMode::Intersection),
            _ => Err(BoundingBoxModeParseError),
        }
    }
}

impl fmt::Display for BoundingBoxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundingBoxMode::Union => write!(f, "union"),
            BoundingBoxMode::Intersection => write!(f, "intersection"),
        }
    }
}
