//! Control-channel command parsing.
//!
//! A line is split into a case-insensitive verb and one raw argument (everything after the
//! first space). Each verb has its own parser type; parse failures carry the reply code
//! the engine answers with.

pub mod cwd;
pub mod dele;
pub mod impl_command;
pub mod list;
pub mod mkd;
pub mod mode;
pub mod pass;
pub mod port;
pub mod retr;
pub mod rmd;
pub mod stor;
pub mod stru;
pub mod r#type;
pub mod user;

use crate::{code::SimpleReturnCode, impl_command, unit_commands};
use std::convert::Infallible;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0}")]
    Syntax(String),
    #[error("{0}")]
    Unsupported(String),
}

impl From<Infallible> for ParseError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl From<ParseError> for SimpleReturnCode {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Unknown(_) => SimpleReturnCode::CommandNotImplemented,
            ParseError::Syntax(_) => SimpleReturnCode::SyntaxError,
            ParseError::Unsupported(_) => SimpleReturnCode::ParameterNotImplemented,
        }
    }
}

unit_commands![
    (cdup, Cdup),
    (pasv, Pasv),
    (pwd, Pwd),
    (quit, Quit),
];

impl_command! {
    User | "USER" => user,
    Pass | "PASS" => pass,
    Cwd | "CWD" => cwd,
    Cdup | "CDUP" => cdup,
    Pwd | "PWD" => pwd,
    Type | "TYPE" => r#type,
    Stru | "STRU" => stru,
    Mode | "MODE" => mode,
    Port | "PORT" => port,
    Pasv | "PASV" => pasv,
    List | "LIST" => list,
    Retr | "RETR" => retr,
    Stor | "STOR" => stor,
    Dele | "DELE" => dele,
    Mkd | "MKD" => mkd,
    Rmd | "RMD" => rmd,
    Quit | "QUIT" => quit,
}

/// Splits a line into its verb and raw argument. The argument keeps its inner spaces;
/// whitespace-only means no argument.
pub(crate) fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    let (verb, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = if arg.trim().is_empty() { "" } else { arg };
    (verb, arg)
}

/// Verbs accepted before login. QUIT is accepted in every state.
pub fn verb_allowed_before_login(verb: &str) -> bool {
    ["USER", "PASS", "QUIT"]
        .iter()
        .any(|allowed| verb.eq_ignore_ascii_case(allowed))
}

/// Argument of a verb that cannot run without a path.
fn required_path(verb: &str, arg: &str) -> Result<String, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::Syntax(format!("{verb} requires a path")));
    }
    Ok(arg.to_string())
}

impl Command {
    /// Commands accepted before the session has logged in: USER, PASS, and QUIT, which
    /// is accepted in every state so a client can always leave.
    pub fn allowed_before_login(&self) -> bool {
        verb_allowed_before_login(self.verb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!("pwd".parse::<Command>(), Ok(Command::Pwd(Pwd)));
        assert_eq!("QuIt".parse::<Command>(), Ok(Command::Quit(Quit)));
    }

    #[test]
    fn argument_keeps_inner_spaces() {
        let Ok(Command::Retr(retr)) = "RETR my file  name.txt".parse::<Command>() else {
            panic!("expected RETR");
        };
        assert_eq!(retr.path, "my file  name.txt");
    }

    #[test]
    fn whitespace_argument_is_no_argument() {
        assert_eq!(
            "LIST    ".parse::<Command>(),
            Ok(Command::List(List { path: None }))
        );
        assert_eq!("CWD".parse::<Command>(), Ok(Command::Cwd(cwd::Cwd { path: None })));
    }

    #[test]
    fn unknown_verb_maps_to_502() {
        let err = "SITE CHMOD 777 x".parse::<Command>().unwrap_err();
        assert_eq!(err, ParseError::Unknown("SITE".to_string()));
        assert_eq!(
            SimpleReturnCode::from(err),
            SimpleReturnCode::CommandNotImplemented
        );
    }

    #[test]
    fn missing_required_path_is_a_syntax_error() {
        let err = "RETR".parse::<Command>().unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
        assert_eq!(SimpleReturnCode::from(err), SimpleReturnCode::SyntaxError);
    }

    #[test]
    fn port_is_parsed_into_an_endpoint() {
        assert_eq!(
            "PORT 127,0,0,1,31,144".parse::<Command>(),
            Ok(Command::Port(port::Port {
                addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080)
            }))
        );
    }

    #[test]
    fn only_login_commands_pass_the_gate() {
        assert!("USER bob".parse::<Command>().unwrap().allowed_before_login());
        assert!("QUIT".parse::<Command>().unwrap().allowed_before_login());
        assert!(!"CWD /".parse::<Command>().unwrap().allowed_before_login());
    }

    #[test]
    fn verb_lookup_ignores_the_argument() {
        assert_eq!(Command::lookup_verb("port 1,2"), Some("PORT"));
        assert_eq!(Command::lookup_verb("  RETR"), Some("RETR"));
        assert_eq!(Command::lookup_verb("SITE HELP"), None);
        assert!("PORT 1,2".parse::<Command>().is_err());
    }

    #[test]
    fn parsed_command_reports_its_verb() {
        assert_eq!("mkd x".parse::<Command>().unwrap().verb(), "MKD");
        assert!(verb_allowed_before_login("pass"));
        assert!(!verb_allowed_before_login("STRU"));
    }
}
