use std::{convert::Infallible, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    /// `None` when USER arrived without a name; the engine answers 530.
    pub username: Option<String>,
}

impl FromStr for User {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Self {
            username: (!s.is_empty()).then(|| s.to_string()),
        })
    }
}
