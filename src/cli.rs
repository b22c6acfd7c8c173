//! Command-line surface shared by the server and client binaries
//!
//! Both accept one optional positional argument, a TCP port.

use crate::error::CliError;

/// Port used when none is given on the command line.
pub const DEFAULT_PORT: u16 = 60_000;

/// Parse the port from the program arguments (program name excluded).
///
/// No argument selects [`DEFAULT_PORT`]. More than one argument, a
/// non-numeric value or a value outside 0-65535 is an error; callers
/// report it and exit with code 1.
pub fn parse_port<I>(mut args: I) -> Result<u16, CliError>
where
    I: Iterator<Item = String>,
{
    let Some(arg) = args.next() else {
        return Ok(DEFAULT_PORT);
    };
    if args.next().is_some() {
        return Err(CliError::TooManyArguments);
    }
    let port: u64 = arg
        .parse()
        .map_err(|_| CliError::InvalidPort(arg.clone()))?;
    u16::try_from(port).map_err(|_| CliError::PortOutOfRange(port))
}
