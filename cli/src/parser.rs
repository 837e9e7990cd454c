//! Recursive CLI flag synthesis and argv-to-universal-data conversion.
//!
//! Ported from `parsing/cli_parser.py`'s `CLIParser`, built atop `clap`'s
//! builder API (teacher's `Iota`/codegen crates favor builder-style code
//! generation over derive macros, so this follows the same preference)
//! instead of `argparse`.

use std::collections::{BTreeMap, BTreeSet};

use clap::{Arg, ArgMatches, Command};
use indexmap::IndexMap;
use omniconfig_core::reference::{is_reference_format, path_to_reference, Segment};
use omniconfig_core::types::{DeclaredType, RecordId, TypeCategory, TypeSystem};
use omniconfig_core::value::Value;

use crate::error::{CliError, Result};
use crate::format::{format_cli_dest, format_cli_flag_name, format_cli_help_message};
use crate::value_parse::{parse_cli_value, parse_cli_values};

#[derive(Clone)]
struct FieldEntry {
    flag_name: String,
    field_path: Vec<Segment>,
    buckets: BTreeMap<TypeCategory, BTreeSet<DeclaredType>>,
    multi: bool,
}

/// Builds a [`clap::Command`] from registered record schemas, then converts
/// its parsed [`ArgMatches`] back into universal [`Value`] data.
pub struct CliParser<'a> {
    command: Command,
    type_system: &'a TypeSystem,
    keep_flag_underscores: bool,
    keep_private_flag_underscores: bool,
    field_map: IndexMap<String, FieldEntry>,
    depth_map: BTreeMap<usize, Vec<String>>,
    extras: BTreeSet<String>,
    flag_name_sep: String,
    flag_prefix: String,
}

impl<'a> CliParser<'a> {
    pub fn new(type_system: &'a TypeSystem) -> Self {
        Self::with_options(type_system, Command::new("omniconfig"), false, true)
    }

    pub fn with_options(
        type_system: &'a TypeSystem,
        command: Command,
        keep_flag_underscores: bool,
        keep_private_flag_underscores: bool,
    ) -> Self {
        CliParser {
            command,
            type_system,
            keep_flag_underscores,
            keep_private_flag_underscores,
            field_map: IndexMap::new(),
            depth_map: BTreeMap::new(),
            extras: BTreeSet::new(),
            flag_name_sep: "-".to_string(),
            flag_prefix: "--".to_string(),
        }
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn into_command(self) -> Command {
        self.command
    }

    /// Register a caller-defined argument outside any schema; its matched
    /// value is carried through `parse_namespace` untouched, same as
    /// `OmniConfigParser::add_extra_argument`'s Python counterpart.
    pub fn add_extra_argument(&mut self, arg: Arg) {
        let id = arg.get_id().to_string();
        self.add_plain_argument(arg);
        self.extras.insert(id);
    }

    /// Register an argument that is neither a schema field nor a tracked
    /// extra (e.g. the facade's own positional config-files argument).
    pub fn add_plain_argument(&mut self, arg: Arg) {
        self.command = std::mem::take(&mut self.command).arg(arg);
    }

    pub fn extras(&self) -> &BTreeSet<String> {
        &self.extras
    }

    /// Register a record schema under `scope`, recursively synthesizing a
    /// flag for every field reachable from it.
    pub fn add_config(&mut self, record_id: RecordId, scope: &str, flag_name: Option<&str>, help: &str) -> Result<()> {
        let mut flag_name = flag_name.unwrap_or(scope).to_string();
        if !flag_name.is_empty() {
            let cli_dest = scope.to_string();
            let formatted = format_cli_flag_name(&flag_name, "", &self.flag_name_sep, self.keep_flag_underscores, self.keep_private_flag_underscores)?;
            let help_msg = format!("Scope {scope} ({record_id})");
            let help_text = if help.is_empty() { help_msg } else { format!("{help} ({help_msg})") };
            self.command = std::mem::take(&mut self.command).arg(
                Arg::new(cli_dest.clone())
                    .long(format!("{}{}", self.flag_prefix, formatted))
                    .num_args(0..)
                    .help(help_text),
            );
            if self.field_map.contains_key(&cli_dest) {
                return Err(CliError::config(scope, None, format!("scope destination '{cli_dest}' is already registered")));
            }
            self.field_map.insert(
                cli_dest.clone(),
                FieldEntry {
                    flag_name: formatted.clone(),
                    field_path: vec![Segment::Key(scope.to_string())],
                    buckets: BTreeMap::from([(TypeCategory::Record, BTreeSet::from([DeclaredType::Record(record_id)]))]),
                    multi: true,
                },
            );
            self.depth_map.entry(0).or_default().push(cli_dest);
            flag_name = formatted;
        }
        self.add_fields_to_parser(record_id, scope, &flag_name, &[Segment::Key(scope.to_string())])
    }

    fn add_fields_to_parser(&mut self, record_id: RecordId, dest_prefix: &str, flag_name_prefix: &str, path: &[Segment]) -> Result<()> {
        let fields = self.type_system.scan(record_id)?;
        for field in fields.values() {
            if !field.init || field.suppress {
                continue;
            }
            let mut field_path = path.to_vec();
            field_path.push(Segment::Key(field.name.to_string()));
            let field_flag_name = field.flag_name.unwrap_or(field.name);
            let flag_name = format_cli_flag_name(
                field_flag_name,
                flag_name_prefix,
                &self.flag_name_sep,
                self.keep_flag_underscores,
                self.keep_private_flag_underscores,
            )?;
            let cli_dest = format_cli_dest(field.name, dest_prefix);
            if self.field_map.contains_key(&cli_dest) {
                return Err(CliError::config(
                    path_to_reference(&field_path),
                    Some(&flag_name),
                    format!("destination '{cli_dest}' is already registered"),
                ));
            }
            let cli_help = format_cli_help_message(&field.docstring, &field_path, &type_display(&field.type_info.declared));

            let multi_dataclass = field.buckets.get(&TypeCategory::Record).is_some_and(|s| s.len() > 1);
            if field.buckets.contains_key(&TypeCategory::Container) || multi_dataclass {
                if field_flag_name.is_empty() {
                    return Err(CliError::config(
                        path_to_reference(&field_path),
                        None,
                        format!("container field '{}' must have a non-empty flag name", field.name),
                    ));
                }
                self.command = std::mem::take(&mut self.command).arg(
                    Arg::new(cli_dest.clone())
                        .long(format!("{}{}", self.flag_prefix, flag_name))
                        .num_args(0..)
                        .help(cli_help),
                );
                self.field_map.insert(
                    cli_dest.clone(),
                    FieldEntry { flag_name, field_path: field_path.clone(), buckets: field.buckets.clone(), multi: true },
                );
                self.depth_map.entry(field_path.len()).or_default().push(cli_dest);
            } else if let Some(records) = field.buckets.get(&TypeCategory::Record) {
                if !field_flag_name.is_empty() {
                    self.command = std::mem::take(&mut self.command).arg(
                        Arg::new(cli_dest.clone())
                            .long(format!("{}{}", self.flag_prefix, flag_name))
                            .num_args(0..)
                            .help(cli_help),
                    );
                    self.field_map.insert(
                        cli_dest.clone(),
                        FieldEntry { flag_name: flag_name.clone(), field_path: field_path.clone(), buckets: field.buckets.clone(), multi: true },
                    );
                    self.depth_map.entry(field_path.len()).or_default().push(cli_dest.clone());
                }
                let nested_id = match records.iter().next() {
                    Some(DeclaredType::Record(id)) => *id,
                    _ => unreachable!("record bucket always holds DeclaredType::Record"),
                };
                self.add_fields_to_parser(nested_id, &cli_dest, &flag_name, &field_path)?;
            } else {
                self.command = std::mem::take(&mut self.command).arg(
                    Arg::new(cli_dest.clone())
                        .long(format!("{}{}", self.flag_prefix, flag_name))
                        .num_args(1)
                        .help(cli_help),
                );
                self.field_map.insert(
                    cli_dest.clone(),
                    FieldEntry { flag_name, field_path: field_path.clone(), buckets: field.buckets.clone(), multi: false },
                );
                self.depth_map.entry(field_path.len()).or_default().push(cli_dest);
            }
        }
        Ok(())
    }

    /// Convert parsed `matches` into universal data, ordered by field depth
    /// so shallower scopes are materialized before their nested fields.
    pub fn parse_namespace(&self, matches: &ArgMatches) -> Result<Value> {
        let mut result = Value::Map(IndexMap::new());
        for dests in self.depth_map.values() {
            for dest in dests {
                let entry = &self.field_map[dest];
                if !matches.contains_id(dest.as_str()) {
                    continue;
                }
                let field_flag = format!("{}{}", self.flag_prefix, entry.flag_name);
                let path_ref = path_to_reference(&entry.field_path);
                let value = if entry.multi {
                    let values: Vec<String> =
                        matches.get_many::<String>(dest).map(|it| it.cloned().collect()).unwrap_or_default();
                    let allow_list = entry.buckets.get(&TypeCategory::Container).is_some_and(|set| {
                        set.iter().any(|t| matches!(t, DeclaredType::List(_) | DeclaredType::Set(_) | DeclaredType::Tuple(_)))
                    });
                    let mut parsed = parse_cli_values(&values, allow_list, Some(&field_flag), &path_ref)?;
                    if let Value::List(items) = &parsed {
                        if items.len() == 1 && entry.buckets.contains_key(&TypeCategory::Primitive) {
                            parsed = items[0].clone();
                        }
                    }
                    parsed
                } else {
                    let raw = matches.get_one::<String>(dest).cloned().unwrap_or_default();
                    parse_cli_value(&raw)
                };
                insert_nested(&mut result, &entry.field_path, value, &field_flag)?;
            }
        }
        Ok(result)
    }
}

fn insert_nested(root: &mut Value, field_path: &[Segment], value: Value, flag: &str) -> Result<()> {
    let (last, parents) = field_path.split_last().expect("field_path is never empty");
    let mut current = root;
    for seg in parents {
        let key = seg.to_string();
        let map = current
            .as_map_mut()
            .ok_or_else(|| CliError::parse(path_to_reference(field_path), Some(flag), format!("expected a mapping at '{key}'")))?;
        if let Some(Value::String(s)) = map.get(&key) {
            if !is_reference_format(s) {
                return Err(CliError::parse(path_to_reference(field_path), Some(flag), format!("invalid reference string {s}")));
            }
            let mut replacement = IndexMap::new();
            replacement.insert("_reference_".to_string(), Value::String(s.clone()));
            map.insert(key.clone(), Value::Map(replacement));
        } else if !map.contains_key(&key) {
            map.insert(key.clone(), Value::Map(IndexMap::new()));
        }
        current = map.get_mut(&key).unwrap();
    }
    let map = current
        .as_map_mut()
        .ok_or_else(|| CliError::parse(path_to_reference(field_path), Some(flag), "expected a mapping at the field's parent"))?;
    map.insert(last.to_string(), value);
    Ok(())
}

fn type_display(ty: &DeclaredType) -> String {
    match ty {
        DeclaredType::Null => "null".to_string(),
        DeclaredType::Bool => "bool".to_string(),
        DeclaredType::Int => "int".to_string(),
        DeclaredType::Float => "float".to_string(),
        DeclaredType::String => "str".to_string(),
        DeclaredType::Enum(def) => def.name.to_string(),
        DeclaredType::Record(id) => id.to_string(),
        DeclaredType::List(elem) => format!("list[{}]", type_display(elem)),
        DeclaredType::Set(elem) => format!("set[{}]", type_display(elem)),
        DeclaredType::Tuple(args) => format!("tuple[{}]", args.iter().map(type_display).collect::<Vec<_>>().join(", ")),
        DeclaredType::Map(value_ty) => format!("dict[str, {}]", type_display(value_ty)),
        DeclaredType::Union(args) => args.iter().map(type_display).collect::<Vec<_>>().join(" | "),
        DeclaredType::Custom(name) => name.to_string(),
        DeclaredType::Any => "any".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniconfig_core::types::{ConfigSchema, FieldDef};
    use pretty_assertions::assert_eq;

    struct Leaf {
        count: i64,
    }

    impl ConfigSchema for Leaf {
        fn record_id() -> RecordId {
            "leaf"
        }

        fn field_defs() -> Vec<FieldDef> {
            vec![FieldDef {
                name: "count",
                declared_type: DeclaredType::Int,
                custom: None,
                default: omniconfig_core::types::Default_::none(),
                init: true,
                docstring: "",
                flag_name: None,
                suppress: false,
            }]
        }

        fn build(values: &IndexMap<String, omniconfig_core::value::Factoried>) -> omniconfig_core::error::Result<Self> {
            let count = values.get("count").and_then(|f| f.as_scalar()).and_then(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            });
            Ok(Leaf { count: count.unwrap_or(0) })
        }

        fn to_value(&self) -> Value {
            Value::Map(IndexMap::from([("count".to_string(), Value::Int(self.count))]))
        }

        fn default_instance() -> Self {
            Leaf { count: 0 }
        }
    }

    fn registered_type_system() -> TypeSystem {
        let ts = TypeSystem::new();
        ts.register_schema::<Leaf>();
        ts
    }

    #[test]
    fn synthesizes_flag_for_primitive_field() {
        let ts = registered_type_system();
        let mut parser = CliParser::new(&ts);
        parser.add_config("leaf", "leaf", None, "").unwrap();
        assert!(parser.command().get_arguments().any(|a| a.get_long() == Some("leaf-count")));
    }

    #[test]
    fn parses_matches_into_nested_update() {
        let ts = registered_type_system();
        let mut parser = CliParser::new(&ts);
        parser.add_config("leaf", "leaf", None, "").unwrap();
        let matches = parser.command().clone().try_get_matches_from(vec!["omniconfig", "--leaf-count", "7"]).unwrap();
        let value = parser.parse_namespace(&matches).unwrap();
        let leaf = value.as_map().unwrap().get("leaf").unwrap().as_map().unwrap();
        assert_eq!(leaf.get("count"), Some(&Value::Int(7)));
    }
}
