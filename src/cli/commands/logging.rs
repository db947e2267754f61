//! `-v` / `CLASSAUTH_LOG_LEVEL` handling.

use clap::{Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the matching `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Parse a log level given either by name or by `-v` count.
///
/// # Errors
/// Returns an error for anything other than a level name or a count from 0 to 4.
pub fn parse_log_level(value: &str) -> Result<u8, String> {
    let value = value.trim();

    if let Ok(count) = value.parse::<u8>() {
        return if usize::from(count) < LEVEL_NAMES.len() {
            Ok(count)
        } else {
            Err(format!(
                "log level count must be at most {}",
                LEVEL_NAMES.len() - 1
            ))
        };
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "invalid log level '{value}', expected one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise log verbosity: -v warn, -vv info, -vvv debug, -vvvv trace (default: error)")
            .env("CLASSAUTH_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(parse_log_level),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_map_to_counts() {
        assert_eq!(parse_log_level("error"), Ok(0));
        assert_eq!(parse_log_level("WARN"), Ok(1));
        assert_eq!(parse_log_level(" info "), Ok(2));
        assert_eq!(parse_log_level("Debug"), Ok(3));
        assert_eq!(parse_log_level("trace"), Ok(4));
    }

    #[test]
    fn counts_are_bounded() {
        assert_eq!(parse_log_level("0"), Ok(0));
        assert_eq!(parse_log_level("4"), Ok(4));
        assert!(parse_log_level("5").is_err());
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let err = parse_log_level("verbose").unwrap_err();
        assert!(err.contains("error, warn, info, debug, trace"), "{err}");
        assert!(parse_log_level("").is_err());
    }

    #[test]
    fn repeated_flag_counts_up() {
        let matches = with_args(Command::new("classauth"))
            .try_get_matches_from(vec!["classauth", "-vvv"]);
        assert_eq!(
            matches
                .ok()
                .and_then(|m| m.get_one::<u8>(ARG_VERBOSITY).copied()),
            Some(3)
        );
    }
}
