use super::ParseError;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mode {
    pub mode: TransferMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMode {
    Stream,
    Block,
    Compressed,
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_ascii_uppercase().as_str() {
            "S" => TransferMode::Stream,
            "B" => TransferMode::Block,
            "C" => TransferMode::Compressed,
            "" => return Err(ParseError::Syntax("MODE requires a parameter".to_string())),
            other => return Err(ParseError::Unsupported(format!("unknown mode: {other}"))),
        };
        Ok(Self { mode })
    }
}
