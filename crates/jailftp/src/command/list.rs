use std::{convert::Infallible, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct List {
    pub path: Option<String>,
}

impl FromStr for List {
    type Err = Infallible;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            path: (!path.is_empty()).then(|| path.to_string()),
        })
    }
}
