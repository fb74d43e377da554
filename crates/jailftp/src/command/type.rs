use super::ParseError;
use crate::transfer::TransferType;
use std::str::FromStr;

/// `TYPE <representation> [<format>]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub representation: Representation,
    pub format: Option<FormatControl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Ascii,
    Ebcdic,
    Image,
    /// Local byte size, `L <n>`.
    Local(Option<u8>),
}

impl Representation {
    /// The transfer type this representation selects, if the server supports it.
    pub fn transfer_type(self) -> Option<TransferType> {
        match self {
            Representation::Ascii => Some(TransferType::Ascii),
            Representation::Image | Representation::Local(Some(8)) => Some(TransferType::Binary),
            Representation::Ebcdic | Representation::Local(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatControl {
    NonPrint,
    Telnet,
    CarriageControl,
}

impl FromStr for FormatControl {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "N" => Ok(FormatControl::NonPrint),
            "T" => Ok(FormatControl::Telnet),
            "C" => Ok(FormatControl::CarriageControl),
            other => Err(ParseError::Unsupported(format!(
                "unknown format control: {other}"
            ))),
        }
    }
}

impl FromStr for Type {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let Some(code) = parts.next() else {
            return Err(ParseError::Syntax("TYPE requires a parameter".to_string()));
        };

        let representation = match code.to_ascii_uppercase().as_str() {
            "A" => Representation::Ascii,
            "E" => Representation::Ebcdic,
            "I" => Representation::Image,
            "L" => {
                let size = parts
                    .next()
                    .map(|n| {
                        n.parse::<u8>()
                            .map_err(|_| ParseError::Syntax(format!("invalid byte size: {n}")))
                    })
                    .transpose()?;
                Representation::Local(size)
            }
            other => {
                return Err(ParseError::Unsupported(format!(
                    "unknown transfer type: {other}"
                )));
            }
        };

        let format = parts.next().map(str::parse).transpose()?;

        if parts.next().is_some() {
            return Err(ParseError::Syntax("too many TYPE parameters".to_string()));
        }

        Ok(Self {
            representation,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_image_select_transfer_types() {
        let t: Type = "A".parse().unwrap();
        assert_eq!(t.representation.transfer_type(), Some(TransferType::Ascii));
        assert_eq!(t.format, None);

        let t: Type = "i".parse().unwrap();
        assert_eq!(t.representation.transfer_type(), Some(TransferType::Binary));
    }

    #[test]
    fn format_control_is_optional_second_parameter() {
        let t: Type = "A N".parse().unwrap();
        assert_eq!(t.format, Some(FormatControl::NonPrint));
        let t: Type = "A T".parse().unwrap();
        assert_eq!(t.format, Some(FormatControl::Telnet));
    }

    #[test]
    fn local_takes_a_byte_size() {
        let t: Type = "L 8".parse().unwrap();
        assert_eq!(t.representation, Representation::Local(Some(8)));
        assert_eq!(t.representation.transfer_type(), Some(TransferType::Binary));

        let t: Type = "L 7".parse().unwrap();
        assert_eq!(t.representation.transfer_type(), None);
    }

    #[test]
    fn unknown_codes_are_unsupported_not_syntax() {
        assert!(matches!("X".parse::<Type>(), Err(ParseError::Unsupported(_))));
        assert!(matches!("A Q".parse::<Type>(), Err(ParseError::Unsupported(_))));
        assert!(matches!("".parse::<Type>(), Err(ParseError::Syntax(_))));
    }
}
