use super::ParseError;
use crate::code;
use std::{
    net::{Ipv4Addr, SocketAddrV4},
    str::FromStr,
};
use thiserror::Error;

/// `PORT h1,h2,h3,h4,p1,p2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Port {
    pub addr: SocketAddrV4,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortParseError {
    #[error("expected 6 comma-separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid byte value: {0:?}")]
    InvalidByte(String),
}

impl From<PortParseError> for ParseError {
    fn from(error: PortParseError) -> Self {
        ParseError::Syntax(error.to_string())
    }
}

impl FromStr for Port {
    type Err = PortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.trim().split(',').collect::<Vec<_>>();
        if fields.len() != 6 {
            return Err(PortParseError::FieldCount(fields.len()));
        }

        let mut bytes = [0u8; 6];
        for (byte, field) in bytes.iter_mut().zip(&fields) {
            let field = field.trim();
            // u8::from_str accepts a leading '+', the wire format does not
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PortParseError::InvalidByte(field.to_string()));
            }
            *byte = field
                .parse()
                .map_err(|_| PortParseError::InvalidByte(field.to_string()))?;
        }

        let [h1, h2, h3, h4, p1, p2] = bytes;
        Ok(Self {
            addr: SocketAddrV4::new(
                Ipv4Addr::new(h1, h2, h3, h4),
                code::Port::from_p1_p2(p1, p2).0,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_and_big_endian_port() {
        let port: Port = "192,168,1,20,4,1".parse().unwrap();
        assert_eq!(
            port.addr,
            SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 20), 1025)
        );
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            "127,0,0,1,4".parse::<Port>(),
            Err(PortParseError::FieldCount(5))
        );
        assert_eq!(
            "127,0,0,1,4,1,1".parse::<Port>(),
            Err(PortParseError::FieldCount(7))
        );
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range_fields() {
        assert!(matches!(
            "127,0,0,x,4,1".parse::<Port>(),
            Err(PortParseError::InvalidByte(_))
        ));
        assert!(matches!(
            "127,0,0,256,4,1".parse::<Port>(),
            Err(PortParseError::InvalidByte(_))
        ));
        assert!(matches!(
            "127,0,0,+1,4,1".parse::<Port>(),
            Err(PortParseError::InvalidByte(_))
        ));
        assert!(matches!(
            "127,0,0,-1,4,1".parse::<Port>(),
            Err(PortParseError::InvalidByte(_))
        ));
    }

    #[test]
    fn malformed_port_maps_to_syntax_error() {
        let err = ParseError::from(PortParseError::FieldCount(0));
        assert!(matches!(err, ParseError::Syntax(_)));
    }
}
