//! Circuit document CLI.
//!
//! Provides the `patchbay` binary with subcommands for working with circuit
//! documents stored as JSON. `check` validates a document set and reports a
//! summary, `flatten` expands component instances into a self-contained
//! circuit, and `run` simulates a circuit and reports the result.
//!
//! Uses the same `patchbay_sim::flatten()` and `Simulation` pipeline as the
//! library crates expose, so a circuit that checks and runs here behaves
//! identically when the same documents are loaded programmatically.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use patchbay_core::{Circuit, ComponentLibrary, Layout, TypeRegistry, Workbench};
use patchbay_sim::{flatten, Netlist, RunOutcome, SimConfig, Simulation};

/// Circuit document tools.
#[derive(Parser)]
#[command(name = "patchbay", about = "Circuit document tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a circuit document set and print a summary.
    Check {
        /// Path to the circuit JSON document.
        #[arg(short, long)]
        circuit: PathBuf,

        /// Path to the edge type configuration JSON (standard set if omitted).
        #[arg(short, long)]
        types: Option<PathBuf>,

        /// Path to the component library JSON (empty if omitted).
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Path to the layout JSON (parsed and counted, never interpreted).
        #[arg(long)]
        layout: Option<PathBuf>,
    },

    /// Expand component instances into a flat circuit.
    Flatten {
        /// Path to the circuit JSON document.
        #[arg(short, long)]
        circuit: PathBuf,

        /// Path to the component library JSON (empty if omitted).
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Write the flat circuit here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flatten a circuit, then simulate it and report the result.
    Run {
        /// Path to the circuit JSON document.
        #[arg(short, long)]
        circuit: PathBuf,

        /// Path to the component library JSON (empty if omitted).
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Activation budget before the run is cut off.
        #[arg(long)]
        max_steps: Option<u64>,

        /// Print the full run report as JSON instead of log lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Warnings go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            circuit,
            types,
            library,
            layout,
        } => {
            let exit_code = run_check(
                &circuit,
                types.as_deref(),
                library.as_deref(),
                layout.as_deref(),
            );
            process::exit(exit_code);
        }
        Commands::Flatten {
            circuit,
            library,
            output,
        } => {
            let exit_code = run_flatten(&circuit, library.as_deref(), output.as_deref());
            process::exit(exit_code);
        }
        Commands::Run {
            circuit,
            library,
            max_steps,
            json,
        } => {
            let exit_code = run_simulate(&circuit, library.as_deref(), max_steps, json);
            process::exit(exit_code);
        }
    }
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = documents are consistent, 1 = validation
/// findings, 2 = I/O or parse failure.
fn run_check(
    circuit_path: &Path,
    types_path: Option<&Path>,
    library_path: Option<&Path>,
    layout_path: Option<&Path>,
) -> i32 {
    let circuit = match load_circuit(circuit_path) {
        Ok(circuit) => circuit,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let types = match load_types(types_path) {
        Ok(types) => types,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let library = match load_library(library_path) {
        Ok(library) => library,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let layout = match load_layout(layout_path) {
        Ok(layout) => layout,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };

    // Consistency check and link index rebuild in one step.
    let bench = match Workbench::from_circuit(circuit, types) {
        Ok(bench) => bench,
        Err(err) => {
            eprintln!("Error: {}", err);
            return 1;
        }
    };

    let cycles = library.reference_cycles();
    let has_cycles = !cycles.is_empty();
    if has_cycles {
        eprintln!("Found {} component reference cycle(s):", cycles.len());
        for cycle in &cycles {
            eprintln!("  - {}", cycle.join(" -> "));
        }
    }

    let summary = serde_json::json!({
        "vertices": bench.circuit().vertex_count(),
        "edges": bench.circuit().edge_count(),
        "links": bench.links().len(),
        "components": library.components.len(),
        "layoutEntries": layout.0.len(),
        "referenceCycles": cycles,
    });
    let json = serde_json::to_string_pretty(&summary).unwrap_or_else(|e| {
        format!("{{\"error\": \"failed to serialize summary: {}\"}}", e)
    });
    println!("{}", json);

    if has_cycles {
        1
    } else {
        0
    }
}

/// Execute the flatten subcommand.
///
/// Returns exit code: 0 = success, 1 = validation findings,
/// 2 = I/O or parse failure.
fn run_flatten(circuit_path: &Path, library_path: Option<&Path>, output: Option<&Path>) -> i32 {
    let circuit = match load_circuit(circuit_path) {
        Ok(circuit) => circuit,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let library = match load_library(library_path) {
        Ok(library) => library,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };

    if let Err(err) = circuit.verify_consistency() {
        eprintln!("Error: {}", err);
        return 1;
    }
    warn_reference_cycles(&library);

    let flat = flatten(&circuit, &library);

    let json = serde_json::to_string_pretty(&flat).unwrap_or_else(|e| {
        format!("{{\"error\": \"failed to serialize circuit: {}\"}}", e)
    });
    match output {
        Some(path) => {
            if let Err(err) = fs::write(path, json + "\n") {
                eprintln!("Error: failed to write '{}': {}", path.display(), err);
                return 2;
            }
        }
        None => println!("{}", json),
    }
    0
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = run completed cleanly, 1 = validation or
/// elaboration findings, or a run cut off at the step budget,
/// 2 = I/O or parse failure.
fn run_simulate(
    circuit_path: &Path,
    library_path: Option<&Path>,
    max_steps: Option<u64>,
    json_output: bool,
) -> i32 {
    let circuit = match load_circuit(circuit_path) {
        Ok(circuit) => circuit,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let library = match load_library(library_path) {
        Ok(library) => library,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };

    if let Err(err) = circuit.verify_consistency() {
        eprintln!("Error: {}", err);
        return 1;
    }
    warn_reference_cycles(&library);

    let flat = flatten(&circuit, &library);
    // Elaboration warns about anything it cannot resolve; keep the count
    // for the exit code and simulate the parts that did resolve.
    let netlist = Netlist::from_circuit(&flat);
    let findings = netlist.diagnostics.len();

    let mut config = SimConfig::default();
    if let Some(max) = max_steps {
        config.max_steps = max;
    }

    let report = Simulation::new(&netlist, config).run();

    if json_output {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            format!("{{\"error\": \"failed to serialize report: {}\"}}", e)
        });
        println!("{}", json);
    } else {
        for line in &report.log {
            println!("{}", line);
        }
    }

    match report.outcome {
        RunOutcome::Completed => {
            eprintln!(
                "Run completed after {} step(s) at t={}",
                report.steps, report.finished_at
            );
        }
        RunOutcome::Incomplete => {
            eprintln!(
                "Run stopped at the step budget after {} step(s) at t={}",
                report.steps, report.finished_at
            );
        }
    }
    if findings > 0 {
        eprintln!("{} elaboration finding(s); see warnings above", findings);
    }

    if findings > 0 || report.outcome == RunOutcome::Incomplete {
        1
    } else {
        0
    }
}

/// Emit a warning per component reference cycle. Expansion truncates at
/// the recursion guard, so a cyclic library still flattens and runs.
fn warn_reference_cycles(library: &ComponentLibrary) {
    for cycle in library.reference_cycles() {
        tracing::warn!("component reference cycle: {}", cycle.join(" -> "));
    }
}

/// Load the circuit document.
fn load_circuit(path: &Path) -> Result<Circuit, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read circuit '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse circuit '{}': {}", path.display(), e))
}

/// Load the edge type configuration, or the standard set when omitted.
fn load_types(path: Option<&Path>) -> Result<TypeRegistry, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read types '{}': {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("failed to parse types '{}': {}", path.display(), e))
        }
        None => Ok(TypeRegistry::standard()),
    }
}

/// Load the component library, or an empty one when omitted.
fn load_library(path: Option<&Path>) -> Result<ComponentLibrary, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read library '{}': {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("failed to parse library '{}': {}", path.display(), e))
        }
        None => Ok(ComponentLibrary::new()),
    }
}

/// Load the layout document, or an empty one when omitted.
fn load_layout(path: Option<&Path>) -> Result<Layout, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read layout '{}': {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("failed to parse layout '{}': {}", path.display(), e))
        }
        None => Ok(Layout::default()),
    }
}
