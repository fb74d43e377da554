use super::ParseError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stru {
    pub structure: FileStructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStructure {
    File,
    Record,
    Page,
}

impl FromStr for Stru {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let structure = match s.trim().to_ascii_uppercase().as_str() {
            "F" => FileStructure::File,
            "R" => FileStructure::Record,
            "P" => FileStructure::Page,
            "" => return Err(ParseError::Syntax("STRU requires a parameter".to_string())),
            other => return Err(ParseError::Syntax(format!("unknown structure: {other}"))),
        };
        Ok(Self { structure })
    }
}
