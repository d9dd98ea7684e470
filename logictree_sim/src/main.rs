//! Logic-Tree Realization CLI
//!
//! Runs the built-in scenarios (CI mode with `--seeds`), or builds the
//! catalogue of a source-model / GSIM document pair.

use clap::Parser;
use logictree_core::{ComposedLogicTree, RealizationCatalogue, SamplerConfig};
use logictree_env::JobParams;
use logictree_sim::scenarios::ScenarioId;
use logictree_sim::{load_job, load_tree, CatalogueExport, HarnessError, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Logic-tree realization harness
#[derive(Parser, Debug)]
#[command(name = "logictree-sim")]
#[command(about = "Build and check logic-tree realization catalogues", long_about = None)]
struct Args {
    /// Master seed of sampled scenarios
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of logic-tree samples for sampled scenarios
    #[arg(short = 'n', long, default_value = "1000")]
    samples: u32,

    /// Sampler shards (0 = one per rayon thread)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Scenario to run (four_gmpe, multi_region, source_mfd, empty_tree, sampled_mfd, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Source-model logic tree document (JSON); switches to document mode
    #[arg(long, requires = "gsim")]
    source_model: Option<String>,

    /// GSIM logic tree document (JSON)
    #[arg(long, requires = "source_model")]
    gsim: Option<String>,

    /// Job parameters (JSON object or key = value lines)
    #[arg(long)]
    job: Option<String>,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the catalogue to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let outcome = match (&args.source_model, &args.gsim) {
        (Some(sm), Some(gsim)) => run_documents(&args, sm, gsim),
        _ => run_scenarios(&args),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Builds the catalogue of a document pair.
fn run_documents(args: &Args, sm_path: &str, gsim_path: &str) -> Result<bool, HarnessError> {
    let sm = load_tree(sm_path)?;
    let gsim = load_tree(gsim_path)?;
    let job = match &args.job {
        Some(path) => load_job(path)?,
        None => JobParams::default(),
    };

    info!(
        "Composing '{}' x '{}' ({})",
        sm.id(),
        gsim.id(),
        job.mode()
    );

    let catalogue = ComposedLogicTree::new(&sm, &gsim)
        .with_sampler_config(SamplerConfig::with_workers(args.workers))
        .build_for_job(&job)?;
    let export = CatalogueExport::from_catalogue(&catalogue);

    if let Some(path) = &args.export {
        export.write_to_file(path)?;
        info!("Exported {} realizations to {}", export.realizations.len(), path);
    }

    if args.json {
        print_json(&export)?;
    } else {
        print_catalogue(&catalogue);
    }

    Ok(true)
}

fn print_catalogue(catalogue: &RealizationCatalogue) {
    info!(
        "{} realizations ({}), total weight {:.6}",
        catalogue.len(),
        catalogue.mode(),
        catalogue.total_weight()
    );
    for rlz in catalogue.iter() {
        info!("  #{:<4} w={:.6}  {}", rlz.index(), rlz.weight(), rlz.label());
    }
    for warning in catalogue.warnings() {
        info!("  warning: {}", warning);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), HarnessError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| HarnessError::Encode {
        path: "stdout".to_string(),
        source,
    })?;
    println!("{}", json);
    Ok(())
}

/// Runs the built-in scenarios for `--seeds` consecutive seeds.
fn run_scenarios(args: &Args) -> Result<bool, HarnessError> {
    if !args.json {
        info!("Logic-Tree Realization Harness v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse::<ScenarioId>().map_err(HarnessError::usage)?]
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            return Err(HarnessError::usage("--export only supports a single scenario, not 'all'"));
        }

        let runner = ScenarioRunner::new(args.seed)
            .with_samples(args.samples)
            .with_workers(args.workers);
        let catalogue = runner.catalogue(scenarios[0])?;
        CatalogueExport::from_catalogue(&catalogue)
            .with_scenario(scenarios[0].name(), args.seed)
            .write_to_file(export_path)?;
        info!("Exported {} realizations of {} to {}", catalogue.len(), scenarios[0], export_path);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = args.seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed)
            .with_samples(args.samples)
            .with_workers(args.workers);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED - {} realizations", scenario.name(), seed, result.metrics.realizations);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;

    if args.json {
        print_json(&serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        }))?;
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(failed_count == 0)
}
