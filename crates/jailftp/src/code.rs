use std::{fmt::Display, net::Ipv4Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Port(pub u16);

impl Port {
    /// Splits the port into the two decimal bytes used by PORT and PASV, high byte first.
    pub fn p1_p2(self) -> (u8, u8) {
        let p1 = (self.0 >> 8) as u8;
        let p2 = (self.0 & 0xFF) as u8;
        (p1, p2)
    }

    pub fn from_p1_p2(p1: u8, p2: u8) -> Self {
        Port((p1 as u16) << 8 | p2 as u16)
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleReturnCode {
    OpeningDataConnection = 150,
    Ok = 200,
    ClosingControlConnection = 221,
    ClosingDataConnectionSuccessful = 226,
    UserLoggedIn = 230,
    FileActionOk = 250,
    NeedPassword = 331,
    FileActionNotTaken = 450,
    SyntaxError = 501,
    CommandNotImplemented = 502,
    BadSequence = 503,
    ParameterNotImplemented = 504,
    NotLoggedIn = 530,
    FileUnavailable = 550,
}

impl SimpleReturnCode {
    pub fn default_message(self) -> &'static str {
        match self {
            SimpleReturnCode::OpeningDataConnection => "Opening data connection.",
            SimpleReturnCode::Ok => "Command okay.",
            SimpleReturnCode::ClosingControlConnection => "Service closing control connection.",
            SimpleReturnCode::ClosingDataConnectionSuccessful => {
                "Closing data connection, transfer successful."
            }
            SimpleReturnCode::UserLoggedIn => "User logged in, proceed.",
            SimpleReturnCode::FileActionOk => "Requested file action okay, completed.",
            SimpleReturnCode::NeedPassword => "User name okay, need password.",
            SimpleReturnCode::FileActionNotTaken => "Requested file action not taken.",
            SimpleReturnCode::SyntaxError => "Syntax error in parameters or arguments.",
            SimpleReturnCode::CommandNotImplemented => "Command not implemented.",
            SimpleReturnCode::BadSequence => "Bad sequence of commands.",
            SimpleReturnCode::ParameterNotImplemented => {
                "Command not implemented for that parameter."
            }
            SimpleReturnCode::NotLoggedIn => "Not logged in.",
            SimpleReturnCode::FileUnavailable => "Requested action not taken. File unavailable.",
        }
    }
}

#[repr(u16)]
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::EnumDiscriminants)]
pub enum FtpResponse {
    Simple(SimpleReturnCode, Option<String>) = 0,
    ReadyForNewUser(String) = 220,
    EnteringPassiveMode(Ipv4Addr, Port) = 227,
    CurrentDirectory(String) = 257,
}

impl FtpResponse {
    pub fn simple(code: SimpleReturnCode) -> Self {
        FtpResponse::Simple(code, None)
    }

    pub fn simple_msg(code: SimpleReturnCode, msg: impl Into<String>) -> Self {
        FtpResponse::Simple(code, Some(msg.into()))
    }

    pub fn code(&self) -> u16 {
        match self {
            FtpResponse::Simple(code, _) => *code as u16,
            _ => FtpResponseDiscriminants::from(self) as u16,
        }
    }

    /// Whether this reply ends the control connection.
    pub fn is_closing(&self) -> bool {
        self.code() == SimpleReturnCode::ClosingControlConnection as u16
    }

    pub fn to_bytes(self) -> Vec<u8> {
        use std::io::Write;

        let mut buf = Vec::new();
        let code = self.code();

        let _ = write!(&mut buf, "{} ", code);

        match self {
            FtpResponse::ReadyForNewUser(msg) | FtpResponse::Simple(_, Some(msg)) => {
                // a reply is exactly one line
                let _ = write!(&mut buf, "{}", msg.replace(['\r', '\n'], " "));
            }

            FtpResponse::Simple(code, None) => {
                let _ = write!(&mut buf, "{}", code.default_message());
            }

            FtpResponse::EnteringPassiveMode(ip, port) => {
                let octets = ip.octets();
                let (p1, p2) = port.p1_p2();
                let _ = write!(
                    &mut buf,
                    "Entering Passive Mode ({},{},{},{},{},{})",
                    octets[0], octets[1], octets[2], octets[3], p1, p2
                );
            }

            FtpResponse::CurrentDirectory(path) => {
                // RFC 959 doubles embedded quotes
                let path = path.replace('"', "\"\"").replace(['\r', '\n'], " ");
                let _ = write!(&mut buf, "\"{}\"", path);
            }
        }

        let _ = write!(&mut buf, "\r\n");

        buf
    }
}

pub trait IntoFtpResponse {
    fn into_ftp_response(self) -> FtpResponse
    where
        Self: Sized;
}

impl<T> IntoFtpResponse for T
where
    T: Display + Into<SimpleReturnCode>,
{
    fn into_ftp_response(self) -> FtpResponse
    where
        Self: Sized,
    {
        let msg = self.to_string();
        FtpResponse::simple_msg(self.into(), msg)
    }
}
