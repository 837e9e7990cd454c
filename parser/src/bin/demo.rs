//! Minimal end-to-end demonstration binary: registers one scope, parses
//! `argv`, and prints the resolved configuration plus any unused data.
//!
//! Unlike a typical `clap::Parser`-derive binary, this one's own flags
//! (`--verbose`) are registered through [`OmniConfigParser::add_extra_argument`]
//! rather than a second derive struct, since both would otherwise fight
//! over the same `argv`.

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction};
use indexmap::IndexMap;
use omniconfig_core::types::{ConfigSchema, Default_, DeclaredType, FieldDef, RecordId, TypeSystem};
use omniconfig_core::value::{Factoried, Value};
use omniconfig::OmniConfigParser;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct ServerConfig {
    host: String,
    port: i64,
}

impl ConfigSchema for ServerConfig {
    fn record_id() -> RecordId {
        "demo::server_config"
    }

    fn field_defs() -> Vec<FieldDef> {
        vec![
            FieldDef {
                name: "host",
                declared_type: DeclaredType::String,
                custom: None,
                default: Default_::value(Value::String("0.0.0.0".to_string())),
                init: true,
                docstring: "bind address",
                flag_name: None,
                suppress: false,
            },
            FieldDef {
                name: "port",
                declared_type: DeclaredType::Int,
                custom: None,
                default: Default_::value(Value::Int(8080)),
                init: true,
                docstring: "bind port",
                flag_name: None,
                suppress: false,
            },
        ]
    }

    fn build(values: &IndexMap<String, Factoried>) -> omniconfig_core::error::Result<Self> {
        let host = values.get("host").and_then(|f| f.as_scalar()).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        });
        let port = values.get("port").and_then(|f| f.as_scalar()).and_then(|v| match v {
            Value::Int(i) => Some(*i),
            _ => None,
        });
        Ok(ServerConfig { host: host.unwrap_or_else(|| "0.0.0.0".to_string()), port: port.unwrap_or(8080) })
    }

    fn to_value(&self) -> Value {
        Value::Map(IndexMap::from([
            ("host".to_string(), Value::String(self.host.clone())),
            ("port".to_string(), Value::Int(self.port)),
        ]))
    }

    fn default_instance() -> Self {
        ServerConfig { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let type_system = TypeSystem::new();
    type_system.register_schema::<ServerConfig>();

    let mut parser = OmniConfigParser::new(&type_system);
    parser.add_config(ServerConfig::record_id(), "server", None, "server bind settings")?;
    parser.add_extra_argument(
        Arg::new("verbose").long("verbose").action(ArgAction::SetTrue).help("enable verbose demo output"),
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = parser.parse_known_args(&args)?;

    let server: &ServerConfig = outcome
        .namespace
        .get("server")
        .ok_or_else(|| anyhow!("server scope did not resolve to a ServerConfig"))?;
    let verbose = outcome.matches.get_flag("verbose");

    if verbose {
        tracing::info!(?server, unused = ?outcome.unused_data, "resolved configuration");
    }
    println!("server listening on {}:{}", server.host, server.port);
    Ok(())
}
