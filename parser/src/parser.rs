//! End-to-end configuration parser: CLI flags, files, merging, and
//! resolution wired into a single entry point.
//!
//! Ported from `parser.py`'s `OmniConfigParser`.

use std::path::Path;

use clap::{Arg, ArgMatches, Command};
use indexmap::IndexMap;
use omniconfig_cli::CliParser;
use omniconfig_core::node::NodeContent;
use omniconfig_core::reference::REFERENCE_SEPARATOR;
use omniconfig_core::state::ResolutionState;
use omniconfig_core::types::{RecordId, TypeSystem};
use omniconfig_core::value::Value;
use omniconfig_file::{dumps_to_json, dumps_to_yaml, ConfigMerger, FileLoader};

use crate::error::{ParserError, Result};
use crate::namespace::OmniConfigNamespace;

/// Destination under which positional configuration file paths are
/// collected, mirroring `OmniConfigParser.FILE_SCOPE`.
pub const FILE_SCOPE: &str = "cfgs";

const DUAL_REFERENCE_SEPARATOR: &str = "::::";

/// Everything [`OmniConfigParser::parse_known_args`] produces.
pub struct ParseOutcome {
    pub namespace: OmniConfigNamespace,
    /// Matched CLI arguments, for reading back values registered via
    /// [`OmniConfigParser::add_extra_argument`].
    pub matches: ArgMatches,
    pub used_data: Value,
    pub unused_data: Value,
}

pub struct OmniConfigParser<'a> {
    type_system: &'a TypeSystem,
    cli_parser: CliParser<'a>,
    file_loader: FileLoader,
    configs: IndexMap<String, RecordId>,
    suppress_cli: bool,
}

impl<'a> OmniConfigParser<'a> {
    pub fn new(type_system: &'a TypeSystem) -> Self {
        Self::with_options(type_system, false, false, true)
    }

    pub fn with_options(
        type_system: &'a TypeSystem,
        suppress_cli: bool,
        keep_cli_flag_underscores: bool,
        keep_cli_private_flag_underscores: bool,
    ) -> Self {
        let mut cli_parser = CliParser::with_options(
            type_system,
            Command::new("omniconfig"),
            keep_cli_flag_underscores,
            keep_cli_private_flag_underscores,
        );
        cli_parser.add_plain_argument(
            Arg::new(FILE_SCOPE)
                .num_args(0..)
                .value_name("CONFIG_FILES")
                .help("Configuration files to load. Can be YAML, JSON, or recipe files."),
        );
        OmniConfigParser { type_system, cli_parser, file_loader: FileLoader::new(), configs: IndexMap::new(), suppress_cli }
    }

    /// Register a record schema under `scope`. Scope must be empty or a
    /// valid identifier, and an empty scope is mutually exclusive with
    /// every other scope.
    pub fn add_config(&mut self, record_id: RecordId, scope: &str, flag: Option<&str>, help: &str) -> Result<()> {
        if !scope.is_empty() {
            if self.configs.contains_key("") {
                return Err(ParserError::config(
                    "cannot add non-empty scope config when empty scope exists; empty scope must be the only config",
                ));
            }
            if !is_valid_identifier(scope) {
                return Err(ParserError::config(format!("scope '{scope}' is not a valid identifier")));
            }
        } else if !self.configs.is_empty() {
            return Err(ParserError::config(
                "cannot add empty scope config when non-empty scopes exist; empty scope is only allowed alone",
            ));
        }
        if self.configs.contains_key(scope) {
            return Err(ParserError::config(format!("scope '{scope}' is already registered")));
        }

        if !self.suppress_cli {
            self.cli_parser.add_config(record_id, scope, flag.or(Some(scope)), help)?;
        }
        self.configs.insert(scope.to_string(), record_id);
        Ok(())
    }

    pub fn add_extra_argument(&mut self, arg: Arg) {
        self.cli_parser.add_extra_argument(arg);
    }

    pub fn command(&self) -> &Command {
        self.cli_parser.command()
    }

    /// Parse `args` (excluding the program name) from every source: CLI
    /// flags, positional config files (with directory-default discovery),
    /// and layered merging, then drive the registered scopes through the
    /// Resolution Engine.
    pub fn parse_known_args(&self, args: &[String]) -> Result<ParseOutcome> {
        let full_args = std::iter::once("omniconfig".to_string()).chain(args.iter().cloned());
        let matches = self.cli_parser.command().clone().try_get_matches_from(full_args)?;

        let files: Vec<String> =
            matches.get_many::<String>(FILE_SCOPE).map(|it| it.cloned().collect()).unwrap_or_default();

        let mut file_configs = Vec::new();
        if !files.is_empty() {
            tracing::debug!(?files, "loading configuration files with defaults");
            for file_config in self.file_loader.load_with_defaults(&files)? {
                file_configs.push(self.wrap_for_empty_scope(file_config));
            }
        }

        let cli_data = self.cli_parser.parse_namespace(&matches)?;

        let mut sources = file_configs;
        sources.push(cli_data);
        let mut universal_data = ConfigMerger::merge(&sources)?;

        if self.configs.contains_key("") {
            universal_data = translate_empty_scope_references(&universal_data, false);
        }

        tracing::debug!("applying factories and resolving references");
        let mut state = ResolutionState::new(&universal_data, &self.configs, self.type_system)?;
        state.resolve_all()?;

        let NodeContent::Map(root_map) = &state.root.content else {
            return Err(ParserError::config("root node must resolve to a mapping"));
        };
        let universal_map = universal_data.as_map().cloned().unwrap_or_default();

        let mut namespace = OmniConfigNamespace::new();
        let mut used_data = IndexMap::new();
        let mut unused_data = IndexMap::new();

        for (scope, record_id) in &self.configs {
            match root_map.get(scope) {
                Some(node) => {
                    let scope_data = universal_map.get(scope).cloned().unwrap_or_else(|| Value::Map(IndexMap::new()));
                    let (used, unused) = node.split(&scope_data, self.type_system)?;
                    if let Some(u) = used {
                        used_data.insert(scope.clone(), u);
                    }
                    if let Some(u) = unused {
                        unused_data.insert(scope.clone(), u);
                    }
                    namespace.insert_factoried(scope, node.materialize(true))?;
                }
                None => {
                    namespace.insert_arc(scope.clone(), self.type_system.default_record(*record_id)?);
                }
            }
        }
        for (key, value) in &universal_map {
            if !self.configs.contains_key(key) {
                unused_data.insert(key.clone(), value.clone());
            }
        }

        let used_data_value = if self.configs.contains_key("") {
            used_data.shift_remove("").map(|v| translate_empty_scope_references(&v, true)).unwrap_or(Value::Map(IndexMap::new()))
        } else {
            Value::Map(used_data)
        };

        Ok(ParseOutcome { namespace, matches, used_data: used_data_value, unused_data: Value::Map(unused_data) })
    }

    /// Default values for every registered scope, "MISSING" marking
    /// required fields with no default.
    pub fn dump_defaults(&self, path: Option<&Path>) -> Result<Value> {
        let mut result = IndexMap::new();
        let mut flat: Option<Value> = None;
        for (scope, record_id) in &self.configs {
            let defaults = self.type_system.serialize_defaults(*record_id)?;
            if scope.is_empty() {
                flat = Some(defaults);
            } else {
                result.insert(scope.clone(), defaults);
            }
        }
        let result = flat.unwrap_or(Value::Map(result));

        if let Some(path) = path {
            match path.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => {
                    dumps_to_yaml(&result, Some(path))?;
                }
                Some("json") | Some("jsonl") => {
                    dumps_to_json(&result, Some(path), 2)?;
                }
                _ => return Err(ParserError::config("path must end with .yaml, .yml, .json, or .jsonl")),
            }
        }
        Ok(result)
    }

    fn wrap_for_empty_scope(&self, file_config: Value) -> Value {
        if !self.configs.contains_key("") {
            return file_config;
        }
        let already_scoped = matches!(&file_config, Value::Map(m) if m.contains_key(""));
        if already_scoped {
            return file_config;
        }
        let mut wrap = IndexMap::new();
        wrap.insert(String::new(), file_config);
        Value::Map(wrap)
    }
}

/// Translate references so a root-level (empty scope) config can still use
/// `"::field"`-style references without colliding with the empty scope's
/// own `"::"`-prefixed key in the universal tree: forward pass adds one
/// extra separator, `recover` strips it back off.
fn translate_empty_scope_references(value: &Value, recover: bool) -> Value {
    match value {
        Value::String(s) => {
            if recover {
                if let Some(stripped) = s.strip_prefix(DUAL_REFERENCE_SEPARATOR) {
                    return Value::String(format!("{REFERENCE_SEPARATOR}{stripped}"));
                }
            } else if s.starts_with(REFERENCE_SEPARATOR) && !s.starts_with(DUAL_REFERENCE_SEPARATOR) {
                return Value::String(format!("{REFERENCE_SEPARATOR}{s}"));
            }
            value.clone()
        }
        Value::Map(m) => Value::Map(m.iter().map(|(k, v)| (k.clone(), translate_empty_scope_references(v, recover))).collect()),
        Value::List(items) => Value::List(items.iter().map(|v| translate_empty_scope_references(v, recover)).collect()),
        _ => value.clone(),
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniconfig_core::types::{ConfigSchema, Default_, DeclaredType, FieldDef};
    use omniconfig_core::value::Factoried;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct AppConfig {
        port: i64,
        name: String,
    }

    impl ConfigSchema for AppConfig {
        fn record_id() -> RecordId {
            "app_config"
        }

        fn field_defs() -> Vec<FieldDef> {
            vec![
                FieldDef {
                    name: "port",
                    declared_type: DeclaredType::Int,
                    custom: None,
                    default: Default_::value(Value::Int(8080)),
                    init: true,
                    docstring: "",
                    flag_name: None,
                    suppress: false,
                },
                FieldDef {
                    name: "name",
                    declared_type: DeclaredType::String,
                    custom: None,
                    default: Default_::value(Value::String("app".to_string())),
                    init: true,
                    docstring: "",
                    flag_name: None,
                    suppress: false,
                },
            ]
        }

        fn build(values: &IndexMap<String, Factoried>) -> omniconfig_core::error::Result<Self> {
            let port = values.get("port").and_then(|f| f.as_scalar()).and_then(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            });
            let name = values.get("name").and_then(|f| f.as_scalar()).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                _ => None,
            });
            Ok(AppConfig { port: port.unwrap_or(8080), name: name.unwrap_or_else(|| "app".to_string()) })
        }

        fn to_value(&self) -> Value {
            Value::Map(IndexMap::from([
                ("port".to_string(), Value::Int(self.port)),
                ("name".to_string(), Value::String(self.name.clone())),
            ]))
        }

        fn default_instance() -> Self {
            AppConfig { port: 8080, name: "app".to_string() }
        }
    }

    fn registered_type_system() -> TypeSystem {
        let ts = TypeSystem::new();
        ts.register_schema::<AppConfig>();
        ts
    }

    #[test]
    fn parses_cli_flags_into_scoped_namespace() {
        let ts = registered_type_system();
        let mut parser = OmniConfigParser::new(&ts);
        parser.add_config("app_config", "app", None, "").unwrap();

        let args: Vec<String> = vec!["--app-port".to_string(), "9090".to_string()];
        let outcome = parser.parse_known_args(&args).unwrap();
        let app = outcome.namespace.get::<AppConfig>("app").unwrap();
        assert_eq!(app, &AppConfig { port: 9090, name: "app".to_string() });
    }

    #[test]
    fn missing_scope_materializes_default_instance() {
        let ts = registered_type_system();
        let mut parser = OmniConfigParser::new(&ts);
        parser.add_config("app_config", "app", None, "").unwrap();

        let outcome = parser.parse_known_args(&[]).unwrap();
        let app = outcome.namespace.get::<AppConfig>("app").unwrap();
        assert_eq!(app, &AppConfig { port: 8080, name: "app".to_string() });
    }

    #[test]
    fn empty_scope_mutual_exclusivity_is_enforced() {
        let ts = registered_type_system();
        let mut parser = OmniConfigParser::new(&ts);
        parser.add_config("app_config", "", None, "").unwrap();
        assert!(parser.add_config("app_config", "other", None, "").is_err());
    }

    #[test]
    fn default_record_arc_survives_untouched_arc_type() {
        let arc: Arc<dyn std::any::Any + Send + Sync> = Arc::new(AppConfig::default_instance());
        assert!(arc.downcast_ref::<AppConfig>().is_some());
    }

    #[test]
    fn file_and_cli_layers_merge_with_cli_winning() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        write!(file, "app:\n  name: from-file\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let ts = registered_type_system();
        let mut parser = OmniConfigParser::new(&ts);
        parser.add_config("app_config", "app", None, "").unwrap();

        let args: Vec<String> = vec![path, "--app-port".to_string(), "9090".to_string()];
        let outcome = parser.parse_known_args(&args).unwrap();

        let app = outcome.namespace.get::<AppConfig>("app").unwrap();
        assert_eq!(app, &AppConfig { port: 9090, name: "from-file".to_string() });
    }
}
