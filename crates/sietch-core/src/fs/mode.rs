use std::fmt;

/// Highest value a permission mode may take (setuid/setgid/sticky + rwx bits).
const MAX_MODE: u32 = 0o7777;

/// Error returned when a permission string is not an octal mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not an octal permission mode: {:?}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

/// Parse an octal permission string: `"0600"`, `"600"` or `"0o600"`.
pub fn parse_mode(s: &str) -> Result<u32, ParseModeError> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(ParseModeError(s.to_string()));
    }
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= MAX_MODE => Ok(mode),
        _ => Err(ParseModeError(s.to_string())),
    }
}

/// Render a mode the way templates spell it.
pub fn format_mode(mode: u32) -> String {
    format!("{mode:04o}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_common_modes() {
        assert_eq!(parse_mode("0600"), Ok(0o600));
        assert_eq!(parse_mode("644"), Ok(0o644));
        assert_eq!(parse_mode("0o755"), Ok(0o755));
        assert_eq!(parse_mode(" 0640 "), Ok(0o640));
        assert_eq!(parse_mode("4755"), Ok(0o4755));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_mode("").is_err());
        assert!(parse_mode("0o").is_err());
        assert!(parse_mode("0689").is_err());
        assert!(parse_mode("rw-r--r--").is_err());
        assert!(parse_mode("-644").is_err());
        assert!(parse_mode("17777").is_err());
    }

    #[test]
    fn test_format_mode() {
        assert_eq!(format_mode(0o600), "0600");
        assert_eq!(format_mode(0o4755), "4755");
    }

    proptest! {
        #[test]
        fn prop_formatted_modes_parse_back(mode in 0u32..=MAX_MODE) {
            prop_assert_eq!(parse_mode(&format_mode(mode)), Ok(mode));
        }

        #[test]
        fn prop_parse_never_exceeds_max(s in "\\PC{0,12}") {
            if let Ok(mode) = parse_mode(&s) {
                prop_assert!(mode <= MAX_MODE);
            }
        }
    }
}
