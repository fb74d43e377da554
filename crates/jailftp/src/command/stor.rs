use super::{ParseError, required_path};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stor {
    pub path: String,
}

impl FromStr for Stor {
    type Err = ParseError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            path: required_path("STOR", path)?,
        })
    }
}
