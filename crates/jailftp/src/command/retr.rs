use super::{ParseError, required_path};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Retr {
    pub path: String,
}

impl FromStr for Retr {
    type Err = ParseError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            path: required_path("RETR", path)?,
        })
    }
}
