//! Flag-name, destination, and message formatting.
//!
//! Ported from `parsing/cli_parser.py`'s module-level `format_*` helpers.

use convert_case::{Case, Casing};
use omniconfig_core::reference::{path_to_reference, Segment};

use crate::error::{CliError, Result};

/// Convert a field's flag name into a CLI long-flag name.
///
/// Rules (unchanged from the original): must start with a letter, or a
/// single leading underscore followed by a letter (a "private" flag);
/// everything is lowercased; underscores become hyphens unless the caller
/// opted to keep them, with private flags keeping theirs by default.
pub fn format_cli_flag_name(
    flag_name: &str,
    prefix: &str,
    sep: &str,
    keep_underscores: bool,
    keep_private_underscores: bool,
) -> Result<String> {
    if flag_name.is_empty() {
        return Ok(String::new());
    }
    let mut flag_name = flag_name.trim().to_lowercase();
    if let Some(rest) = flag_name.strip_prefix('_') {
        if rest.is_empty() {
            return Err(CliError::config("", None, format!("flag name cannot be just underscore: {flag_name}")));
        }
        if !rest.chars().next().unwrap().is_alphabetic() {
            return Err(CliError::config(
                "",
                None,
                format!("after underscore, flag must start with a letter: {flag_name}"),
            ));
        }
        if !keep_underscores && !keep_private_underscores {
            flag_name = format!("_{}", rest.to_case(Case::Kebab));
        }
    } else {
        if !flag_name.chars().next().unwrap().is_alphabetic() {
            return Err(CliError::config(
                "",
                None,
                format!("flag name must start with a letter or single underscore: {flag_name}"),
            ));
        }
        if !keep_underscores {
            flag_name = flag_name.to_case(Case::Kebab);
        }
    }
    if prefix.is_empty() {
        Ok(flag_name)
    } else {
        Ok(format!("{prefix}{sep}{flag_name}"))
    }
}

/// Convert a field name into a CLI argument destination key.
pub fn format_cli_dest(dest: &str, prefix: &str) -> String {
    if dest.is_empty() {
        return String::new();
    }
    if prefix.is_empty() {
        dest.to_string()
    } else {
        format!("{prefix}_{dest}")
    }
}

pub fn format_cli_help_message(message: &str, path: &[Segment], type_name: &str) -> String {
    let mut s = format!("Field '{}' ({type_name})", path_to_reference(path));
    if !message.is_empty() {
        s.push_str(": ");
        s.push_str(message);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_underscores_to_hyphens() {
        assert_eq!(format_cli_flag_name("my_flag", "", "-", false, true).unwrap(), "my-flag");
    }

    #[test]
    fn keeps_private_underscore_by_default() {
        assert_eq!(format_cli_flag_name("_private", "", "-", false, true).unwrap(), "_private");
    }

    #[test]
    fn rejects_flag_not_starting_with_letter() {
        assert!(format_cli_flag_name("1flag", "", "-", false, true).is_err());
    }

    #[test]
    fn prefixes_nested_flag_names() {
        assert_eq!(format_cli_flag_name("field", "scope", "-", false, true).unwrap(), "scope-field");
    }
}
