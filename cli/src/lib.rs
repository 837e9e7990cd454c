pub mod error;
pub mod format;
pub mod parser;
pub mod value_parse;

pub use error::{CliError, Result};
pub use format::{format_cli_dest, format_cli_flag_name, format_cli_help_message};
pub use parser::CliParser;
pub use value_parse::{is_integer_key, parse_cli_value, parse_cli_values};
