//! IB-015: CLI subcommands — check, graph, doc-link, types.

use crate::core::binder::{bind_program, BindError, BindOptions};
use crate::core::diagnostics::{Severity, SourceRange};
use crate::core::model::BoundProgram;
use crate::core::resolver;
use crate::core::schema::{load_package_file, module_name, token_module, Registry};
use crate::core::syntax::parse_program_file;
use crate::core::token::decompose_token;
use crate::languages::{token_type_name, Language};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bind a program and report diagnostics
    Check {
        /// Path to the program document
        #[arg(short, long, default_value = "program.yaml")]
        program: PathBuf,

        /// Package schema files (repeatable)
        #[arg(short, long)]
        schema: Vec<PathBuf>,

        /// Fail when any resource type cannot be resolved
        #[arg(long)]
        strict: bool,

        /// Bind blocks on a thread pool
        #[arg(long)]
        parallel: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the dependency order of a program's declarations
    Graph {
        /// Path to the program document
        #[arg(short, long, default_value = "program.yaml")]
        program: PathBuf,

        /// Package schema files (repeatable)
        #[arg(short, long)]
        schema: Vec<PathBuf>,

        /// Print each declaration's direct dependencies too
        #[arg(long)]
        edges: bool,
    },

    /// Print the documentation link for a type token
    DocLink {
        /// Type token (`package:module:Type` or `package:Type`)
        token: String,

        /// Target language
        #[arg(short, long, value_enum, default_value = "nodejs")]
        language: Language,

        /// Link the input or output shape instead of the type itself
        #[arg(long, value_enum)]
        io: Option<Direction>,

        /// Treat the token as a function (args/result links)
        #[arg(long)]
        function: bool,
    },

    /// Render every resource's properties as language types
    Types {
        /// Package schema files (repeatable)
        #[arg(short, long, required = true)]
        schema: Vec<PathBuf>,

        /// Target language
        #[arg(short, long, value_enum, default_value = "nodejs")]
        language: Language,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Input,
    Output,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Check {
            program,
            schema,
            strict,
            parallel,
            format,
        } => {
            let options = BindOptions {
                strict,
                parallel,
                ..BindOptions::default()
            };
            cmd_check(&program, &schema, &options, format)
        }
        Commands::Graph {
            program,
            schema,
            edges,
        } => cmd_graph(&program, &schema, edges),
        Commands::DocLink {
            token,
            language,
            io,
            function,
        } => {
            let link = doc_link(&token, language, io, function)?;
            println!("{}", link);
            Ok(())
        }
        Commands::Types { schema, language } => cmd_types(&schema, language),
    }
}

fn load_registry(schemas: &[PathBuf]) -> Result<Registry, String> {
    let mut registry = Registry::new();
    for path in schemas {
        let package = load_package_file(path)?;
        debug!(package = %package.name, path = %path.display(), "loaded package schema");
        registry.add_package(package);
    }
    Ok(registry)
}

fn load_and_bind(program: &Path, schemas: &[PathBuf], options: &BindOptions) -> Result<BoundProgram, String> {
    let registry = load_registry(schemas)?;
    let syntax = parse_program_file(program)?;
    bind_program(&syntax, &registry, options).map_err(|e| {
        let BindError::Unresolved { program: bound, .. } = &e;
        for d in &bound.diagnostics {
            eprintln!("  ERROR: {}", d);
        }
        e.to_string()
    })
}

fn cmd_check(program: &Path, schemas: &[PathBuf], options: &BindOptions, format: OutputFormat) -> Result<(), String> {
    let bound = load_and_bind(program, schemas, options)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&bound.diagnostics)
                .map_err(|e| format!("JSON error: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for d in &bound.diagnostics {
                eprintln!("{}:{}", program.display(), d);
            }
        }
    }

    let errors = bound
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        return Err(format!("{} error(s)", errors));
    }
    if format == OutputFormat::Text {
        println!(
            "OK: {} ({} resources, {} config variables)",
            program.display(),
            bound.resources().count(),
            bound.config_variables().count()
        );
    }
    Ok(())
}

fn cmd_graph(program: &Path, schemas: &[PathBuf], edges: bool) -> Result<(), String> {
    let bound = load_and_bind(program, schemas, &BindOptions::default())?;
    let order = resolver::dependency_order(&bound)?;
    for (i, name) in order.iter().enumerate() {
        if edges {
            let deps = bound.dependencies(name);
            if deps.is_empty() {
                println!("{}. {}", i + 1, name);
            } else {
                println!("{}. {} <- {}", i + 1, name, deps.join(", "));
            }
        } else {
            println!("{}. {}", i + 1, name);
        }
    }
    Ok(())
}

/// The doc link for `token` in `language`.
pub fn doc_link(token: &str, language: Language, io: Option<Direction>, function: bool) -> Result<String, String> {
    let (parts, diags) = decompose_token(token, SourceRange::default());
    if let Some(d) = diags.iter().next() {
        return Err(d.message.clone());
    }
    let helper = language.helper();
    let module = module_name(&parts.module);
    let link = match (io, function) {
        (None, _) => helper.resource_type_doc_link(&parts.package, module, &parts.type_name),
        (Some(dir), false) => {
            helper.resource_io_doc_link(&parts.package, module, &parts.type_name, dir == Direction::Input)
        }
        (Some(dir), true) => {
            helper.function_io_doc_link(&parts.package, module, &parts.type_name, dir == Direction::Input)
        }
    };
    Ok(link)
}

fn cmd_types(schemas: &[PathBuf], language: Language) -> Result<(), String> {
    let registry = load_registry(schemas)?;
    let helper = language.helper();

    for package in registry.packages() {
        let contexts = helper.generate_module_contexts(package);
        for (token, desc) in &package.resources {
            let module = token_module(token).unwrap_or_default();
            println!("{} ({})", token, helper.resource_type_doc_link(&package.name, module, token_type_name(token)));
            for (label, ty, input) in [("inputs", &desc.input_type, true), ("outputs", &desc.output_type, false)] {
                let Some(obj) = ty.as_object() else {
                    continue;
                };
                println!("  {}:", label);
                for (name, prop) in &obj.properties {
                    let rendered = helper
                        .language_type_string(&contexts, module, prop, input, false)
                        .map_err(|e| e.to_string())?;
                    println!("    {}: {}", helper.property_name(name), rendered);
                }
            }
            println!(
                "  lookup: {}",
                helper.resource_lookup_result_name(token_type_name(token))
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::tests::AWS_SCHEMA;

    const PROGRAM: &str = r#"
blocks:
  - kind: config
    labels: [prefix, string]
  - kind: resource
    labels: [site, "aws:s3/bucket:Bucket"]
    attributes:
      bucket: "${prefix}-site"
  - kind: resource
    labels: [index, "aws:s3/bucketObject:BucketObject"]
    attributes:
      bucket: "${site.bucket}"
"#;

    fn write_fixture(program: &str) -> (tempfile::TempDir, PathBuf, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let program_path = dir.path().join("program.yaml");
        let schema_path = dir.path().join("aws.yaml");
        std::fs::write(&program_path, program).unwrap();
        std::fs::write(&schema_path, AWS_SCHEMA).unwrap();
        (dir, program_path, vec![schema_path])
    }

    #[test]
    fn test_ib015_check_valid() {
        let (_dir, program, schemas) = write_fixture(PROGRAM);
        cmd_check(&program, &schemas, &BindOptions::default(), OutputFormat::Text).unwrap();
        cmd_check(&program, &schemas, &BindOptions::default(), OutputFormat::Json).unwrap();
    }

    #[test]
    fn test_ib015_check_reports_errors() {
        let (_dir, program, schemas) =
            write_fixture("blocks:\n  - kind: resource\n    labels: [b, \"aws:s3/bucket:Bucket\"]\n    attributes:\n      nope: 1\n");
        let err = cmd_check(&program, &schemas, &BindOptions::default(), OutputFormat::Text).unwrap_err();
        assert_eq!(err, "1 error(s)");
    }

    #[test]
    fn test_ib015_check_reports_bad_interpolation() {
        let (_dir, program, schemas) = write_fixture(
            "blocks:\n  - kind: resource\n    labels: [b, \"aws:s3/bucket:Bucket\"]\n    attributes:\n      bucket: \"${oops\"\n",
        );
        let err = cmd_check(&program, &schemas, &BindOptions::default(), OutputFormat::Json).unwrap_err();
        assert_eq!(err, "1 error(s)");
    }

    #[test]
    fn test_ib015_check_warnings_pass() {
        let (_dir, program, schemas) = write_fixture(
            "blocks:\n  - kind: resource\n    labels: [b, \"aws:s3/bucket:Bucket\"]\n    options:\n      ignoreChanges: [tags, tags]\n",
        );
        cmd_check(&program, &schemas, &BindOptions::default(), OutputFormat::Text).unwrap();
    }

    #[test]
    fn test_ib015_check_strict() {
        let (_dir, program, schemas) = write_fixture("blocks:\n  - kind: resource\n    labels: [b, \"aws:s3/bucket:Nope\"]\n");
        let strict = BindOptions {
            strict: true,
            ..BindOptions::default()
        };
        let err = cmd_check(&program, &schemas, &strict, OutputFormat::Text).unwrap_err();
        assert!(err.contains("aws:s3/bucket:Nope"));
    }

    #[test]
    fn test_ib015_check_missing_files() {
        let (dir, program, _) = write_fixture(PROGRAM);
        let missing = vec![dir.path().join("nope.yaml")];
        assert!(cmd_check(&program, &missing, &BindOptions::default(), OutputFormat::Text)
            .unwrap_err()
            .contains("failed to read"));
        assert!(cmd_check(&dir.path().join("gone.yaml"), &[], &BindOptions::default(), OutputFormat::Text).is_err());
    }

    #[test]
    fn test_ib015_graph() {
        let (_dir, program, schemas) = write_fixture(PROGRAM);
        cmd_graph(&program, &schemas, true).unwrap();
    }

    #[test]
    fn test_ib015_doc_link() {
        assert_eq!(
            doc_link("aws:s3/bucket:Bucket", Language::Nodejs, None, false).unwrap(),
            "/docs/reference/pkg/nodejs/pulumi/aws/s3/#Bucket"
        );
        assert_eq!(
            doc_link("aws:Instance", Language::Go, Some(Direction::Input), false).unwrap(),
            "https://pkg.go.dev/github.com/pulumi/pulumi-aws/sdk/go/aws/?tab=doc#InstanceArgs"
        );
        assert!(doc_link("nonsense", Language::Python, None, false).is_err());
    }

    #[test]
    fn test_ib015_types() {
        let (_dir, _, schemas) = write_fixture(PROGRAM);
        for language in Language::ALL {
            cmd_types(&schemas, language).unwrap();
        }
    }
}
