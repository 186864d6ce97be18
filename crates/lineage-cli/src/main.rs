//! Lineage CLI
//!
//! Command-line interface for contract family assembly.
//!
//! ## Usage
//!
//! ```bash
//! # Assemble every family in a record document
//! lineage families --input agreements.json
//!
//! # JSON output with a custom runtime configuration
//! lineage families --input agreements.json --config lineage.yaml --format json
//!
//! # Annotated node list for one family
//! lineage family MSA-99119 --input agreements.json
//!
//! # Diagnostics only
//! lineage check --input agreements.json
//!
//! # Effective configuration
//! lineage config show --config lineage.yaml
//! ```
//!
//! ## Exit Codes
//!
//! - 0: Assembled cleanly
//! - 1: Assembled with warnings
//! - 2: One or more families failed
//! - 3: Error

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lineage_core::{
    ContractFamily, ContractRecord, Diagnostic, FamilyAssembler, FamilyNode, Inheritance,
};
use lineage_runtime::{FamilyOrchestrator, RuntimeConfig, RuntimeResult};

/// Lineage: contract family assembly
#[derive(Parser)]
#[command(name = "lineage")]
#[command(version)]
#[command(about = "Assemble contract records into families with derived metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble and print every family
    Families {
        /// Path to the record document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to a runtime configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Show diagnostics and governance inheritance
        #[arg(long)]
        explain: bool,
    },

    /// Print the annotated node list of one family
    Family {
        /// Family id (root contract number, or record id)
        id: String,

        /// Path to the record document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to a runtime configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print diagnostics without family details
    Check {
        /// Path to the record document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to a runtime configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Runtime configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as YAML
    Show {
        /// Path to a runtime configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Families {
            input,
            config,
            format,
            explain,
        } => families_command(input, config, format, explain),

        Commands::Family {
            id,
            input,
            config,
            format,
        } => family_command(id, input, config, format),

        Commands::Check { input, config } => check_command(input, config),

        Commands::Config { action } => match action {
            ConfigAction::Show { config } => show_config(config),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(RuntimeConfig::default()),
    }
}

/// Run the orchestrator to completion on a fresh runtime.
fn assemble(input: &Path, config: RuntimeConfig) -> Result<RuntimeResult> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let orchestrator = FamilyOrchestrator::new(config);
    runtime
        .block_on(orchestrator.assemble_file(input))
        .with_context(|| format!("Failed to assemble families from {:?}", input))
}

fn outcome_code(result: &RuntimeResult) -> ExitCode {
    if result.has_failures() {
        ExitCode::from(2)
    } else if result.warning_count() > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}

fn families_command(
    input: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    explain: bool,
) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref())?;
    let assembler = FamilyAssembler::new(config.assembly_options());
    let result = assemble(&input, config)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for family in &result.families {
                print_family(family, &assembler, explain);
                println!();
            }
            for failure in &result.failures {
                println!("FAILED {} (root {}): {}", failure.family_id, failure.root_id, failure.reason);
            }
            if explain {
                print_diagnostics(&result.diagnostics);
            }
            println!(
                "{} families, {} warnings, {} failures",
                result.families.len(),
                result.warning_count(),
                result.failures.len()
            );
        }
    }

    Ok(outcome_code(&result))
}

fn family_command(
    id: String,
    input: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref())?;
    let assembler = FamilyAssembler::new(config.assembly_options());
    let result = assemble(&input, config)?;

    let family = result
        .families
        .iter()
        .find(|family| family.id == id)
        .ok_or_else(|| anyhow!("Unknown family: {}", id))?;
    let nodes = assembler.annotate(family);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&nodes)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}  {}", family.id, family.hierarchy_label());
            for feature in family.key_features() {
                println!("  - {}", feature);
            }
            println!();
            for node in &nodes {
                print_node(node);
            }
        }
    }

    Ok(outcome_code(&result))
}

fn check_command(input: PathBuf, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref())?;
    let result = assemble(&input, config)?;

    let warnings: Vec<&Diagnostic> = result.diagnostics.iter().filter(|d| d.is_warning()).collect();
    if warnings.is_empty() && result.failures.is_empty() {
        println!("OK: {} families, no warnings", result.families.len());
    } else {
        for diagnostic in warnings {
            println!("WARNING [{}] {}", diagnostic.kind(), diagnostic);
        }
        for failure in &result.failures {
            println!("FAILED {}: {}", failure.family_id, failure.reason);
        }
    }

    Ok(outcome_code(&result))
}

fn show_config(config_path: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config_path.as_deref())?;
    let yaml = config.to_yaml().context("Failed to render config")?;
    print!("{}", yaml);
    Ok(ExitCode::from(0))
}

fn print_family(family: &ContractFamily, assembler: &FamilyAssembler, explain: bool) {
    let metrics = &family.family_metrics;
    let governance = &family.governance_framework;

    println!("{}  {}", family.id, family.master_agreement.title);
    println!("{}", family.summary());
    println!();
    println!("Hierarchy: {}", family.hierarchy_label());
    println!(
        "Contracts: {}  Active SOWs: {}  Change orders: {}",
        metrics.total_contracts, metrics.active_sow_count, metrics.total_change_orders
    );
    println!(
        "Value: {}  Risk: {:?}",
        lineage_core::record::format_currency(metrics.total_family_value, "USD"),
        metrics.avg_risk_level
    );
    println!(
        "Span: {} .. {}",
        or_dash(metrics.family_span.start),
        or_dash(metrics.family_span.end)
    );
    println!(
        "Governing law: {}  Jurisdiction: {}  Payment: {}",
        governance.governing_law, governance.jurisdiction, governance.default_payment_terms
    );
    if !governance.compliance_flags.is_empty() {
        println!("Compliance: {}", governance.compliance_flags.join(", "));
    }
    println!(
        "Relationship: {}  Industry: {}",
        family.business_context.relationship_type.label(),
        family.business_context.industry_category
    );
    println!();

    if explain {
        for node in assembler.annotate(family) {
            print_node(&node);
        }
    } else {
        print_tree(&family.master_agreement);
    }
}

fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_tree(root: &ContractRecord) {
    let mut stack = vec![(root, 0usize)];
    while let Some((record, depth)) = stack.pop() {
        println!(
            "{}[{:?}] {} ({})",
            "  ".repeat(depth + 1),
            record.contract_type,
            record.title,
            record.family_key()
        );
        stack.extend(record.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

fn print_node(node: &FamilyNode) {
    let indent = "  ".repeat(node.depth + 1);
    println!(
        "{}[{:?}] {} ({})",
        indent,
        node.contract_type,
        node.title,
        node.contract_number.as_deref().unwrap_or(&node.record_id)
    );

    let terms = &node.inherited_terms;
    let marks: Vec<String> = terms
        .fields()
        .iter()
        .map(|(name, field)| format!("{}={}", name, inheritance_label(field.inheritance)))
        .collect();
    println!("{}  {}", indent, marks.join(" "));
}

fn inheritance_label(inheritance: Inheritance) -> &'static str {
    match inheritance {
        Inheritance::Establishes => "establishes",
        Inheritance::Inherited => "inherited",
        Inheritance::Overridden => "overridden",
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    let warnings: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_warning()).collect();
    if warnings.is_empty() {
        return;
    }
    println!("--- Diagnostics ---");
    println!();
    for diagnostic in warnings {
        println!("WARNING [{}] {}", diagnostic.kind(), diagnostic);
    }
    println!();
}
