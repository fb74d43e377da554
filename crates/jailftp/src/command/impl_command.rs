#[macro_export]
macro_rules! impl_command {
	(
		$(
			$name:ident | $deserialize:expr => $module:ident
		),*
		$(,)?
	) => {
		$(
			use $module::$name;
		)*

		#[derive(Debug, Clone, PartialEq, Eq, Hash, strum_macros::AsRefStr)]
		pub enum Command {
			$(
				$name($name),
			)*
		}

		impl ::std::str::FromStr for Command {
			type Err = $crate::command::ParseError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				let (command, params) = $crate::command::split_line(s);

				$(
					if command.eq_ignore_ascii_case($deserialize) {
						let data = <$name as ::std::str::FromStr>::from_str(params)
							.map_err($crate::command::ParseError::from)?;

						return Ok(Command::$name(data));
					}
				)*

				Err($crate::command::ParseError::Unknown(command.to_string()))
			}
		}

		impl Command {
			/// Canonical verb of a command line, without parsing its argument.
			pub fn lookup_verb(line: &str) -> Option<&'static str> {
				let (command, _) = $crate::command::split_line(line);

				$(
					if command.eq_ignore_ascii_case($deserialize) {
						return Some($deserialize);
					}
				)*

				None
			}

			pub fn verb(&self) -> &'static str {
				match self {
					$(
						Command::$name(_) => $deserialize,
					)*
				}
			}
		}
	};
}

#[macro_export]
macro_rules! unit_commands {
	[$(($mod:ident, $name:ident)),* $(,)?] => {
		$(
			#[allow(dead_code)]
			mod $mod {
				#[derive(Debug, Clone, PartialEq, Eq, Hash)]
				pub struct $name;

				impl ::std::str::FromStr for $name {
					type Err = ::std::convert::Infallible;

					fn from_str(_: &str) -> Result<Self, Self::Err> {
						Ok(Self)
					}
				}
			}
		)*
	};
}
