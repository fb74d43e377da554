use std::{convert::Infallible, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cwd {
    pub path: Option<String>,
}

impl FromStr for Cwd {
    type Err = Infallible;

    fn from_str(c: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            path: (!c.is_empty()).then(|| c.to_string()),
        })
    }
}
