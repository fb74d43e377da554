use super::{ParseError, required_path};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mkd {
    pub path: String,
}

impl FromStr for Mkd {
    type Err = ParseError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            path: required_path("MKD", path)?,
        })
    }
}
