//! Hyper-Schema CLI
//!
//! Command-line interface for querying an index built from a root document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hyperschema::{
    load_document, load_document_auto, schema_id, Resolvers, SchemaIndex, ValidateError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hyperschema")]
#[command(about = "Index, resolve and link JSON Hyper-Schema documents")]
#[command(version)]
struct Cli {
    /// Root document: file path or URL whose `definitions` are indexed
    #[arg(long, global = true, default_value = "root.json")]
    root: String,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the keys of every indexed schema
    Keys,

    /// Resolve a JSON Pointer path (e.g. #/definitions/widget/properties/id)
    Find {
        path: String,
    },

    /// Expand $ref properties of a schema
    Denormalize {
        /// Key or $id of the schema
        schema: String,
    },

    /// Validate an instance file against a schema
    Validate {
        /// Key or $id of the schema
        schema: String,

        /// Instance file to validate
        instance: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Print the links of a schema
    Links {
        /// Key or $id of the schema
        schema: String,
    },

    /// Resolve the URL of a link against an instance
    Url {
        /// Key or $id of the schema
        schema: String,

        /// Relation of the link (e.g. self)
        rel: String,

        /// Instance file supplying template variables
        instance: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = open_index(&cli.root).and_then(|index| match cli.command {
        Commands::Keys => run_keys(&index),
        Commands::Find { path } => run_find(&index, &path, cli.pretty),
        Commands::Denormalize { schema } => run_denormalize(&index, &schema, cli.pretty),
        Commands::Validate {
            schema,
            instance,
            json,
        } => run_validate(&index, &schema, &instance, json),
        Commands::Links { schema } => run_links(&index, &schema, cli.pretty),
        Commands::Url {
            schema,
            rel,
            instance,
        } => run_url(&index, &schema, &rel, &instance),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Index the root document, keying each definition by its `$id`, else its `$ref`.
fn open_index(root: &str) -> Result<SchemaIndex, u8> {
    let document = load_document_auto(root).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let resolvers = Resolvers::default().key(|definition| {
        schema_id(definition)
            .or_else(|| definition.get("$ref").and_then(Value::as_str))
            .map(String::from)
    });

    let mut index = SchemaIndex::new().with_root(document);
    index.index(&resolvers).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(index)
}

fn print_json(value: &Value, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_keys(index: &SchemaIndex) -> Result<(), u8> {
    for key in index.keys().filter(|key| !index.is_meta(key)) {
        println!("{}", key);
    }
    Ok(())
}

fn run_find(index: &SchemaIndex, path: &str, pretty: bool) -> Result<(), u8> {
    match index.find(path) {
        Some(found) => print_json(found, pretty),
        None => {
            eprintln!("Error: nothing found at {}", path);
            Err(2)
        }
    }
}

fn run_denormalize(index: &SchemaIndex, schema: &str, pretty: bool) -> Result<(), u8> {
    let denormalized = index.denormalize(schema).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;
    print_json(&denormalized, pretty)
}

fn run_validate(
    index: &SchemaIndex,
    schema: &str,
    instance_path: &Path,
    json_output: bool,
) -> Result<(), u8> {
    let instance = load_document(instance_path).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let facade = index.schema(schema).ok_or_else(|| {
        report_error(json_output, &format!("no schema indexed under {}", schema));
        2u8
    })?;

    match facade.validate(&instance) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_links(index: &SchemaIndex, schema: &str, pretty: bool) -> Result<(), u8> {
    let facade = index.schema(schema).ok_or_else(|| {
        eprintln!("Error: no schema indexed under {}", schema);
        2u8
    })?;
    let links = facade.links().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let descriptors: Vec<Value> = links
        .iter()
        .filter_map(|link| serde_json::to_value(link.descriptor()).ok())
        .collect();
    print_json(&Value::Array(descriptors), pretty)
}

fn run_url(index: &SchemaIndex, schema: &str, rel: &str, instance_path: &Path) -> Result<(), u8> {
    let instance = load_document(instance_path).map_err(|e| {
        eprintln!("Error loading instance: {}", e);
        e.exit_code() as u8
    })?;

    let facade = index.schema(schema).ok_or_else(|| {
        eprintln!("Error: no schema indexed under {}", schema);
        2u8
    })?;

    let url = facade.create(instance).url(rel).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    println!("{}", url);
    Ok(())
}
