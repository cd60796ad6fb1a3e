use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use nb_core::{
    GogMetrics, KernelMetrics, TCTransformEngine, TCTransformResult, compute_ppm_coherence,
    prime_encode, prime_importance, resonance_frequency,
};
use nb_runtime::{CycleReport, RuntimeConfig, SeedFile, build_gog, build_kernel, run_kernel};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "nanobrain", version, about = "NanoBrain cognitive kernel CLI")]
struct Cli {
    /// Configuration file (falls back to $NANOBRAIN_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a kernel with the fundamental primes and a small concept graph, then run it
    Demo {
        #[arg(long, default_value_t = 10)]
        cycles: usize,
    },

    /// Populate a kernel from a JSON seed file and run it
    Run {
        /// Seed file path
        seed: PathBuf,

        #[arg(long, default_value_t = 10)]
        cycles: usize,

        /// Number of top-attention atoms to report
        #[arg(long, default_value_t = 5)]
        focus: usize,
    },

    /// Phase prime metrics for a set of primes
    Ppm {
        #[arg(required = true)]
        primes: Vec<u32>,
    },

    /// Prime encoding of a real value
    Encode {
        #[arg(allow_negative_numbers = true)]
        value: f64,

        #[arg(long, default_value_t = 5)]
        primes: usize,
    },

    /// Time crystal transform of a signal
    Transform {
        /// Signal samples
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Generate this many uniform samples in [-1, 1) instead
        #[arg(long)]
        random: Option<usize>,

        /// Seed for --random
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Grow a chain of gardens and report the folded metrics
    Garden {
        #[arg(long, default_value_t = 2)]
        depth: usize,

        #[arg(long, default_value_t = 5)]
        cycles: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config =
        RuntimeConfig::resolve(cli.config.as_deref()).context("failed to load configuration")?;

    match &cli.command {
        Commands::Demo { cycles } => cmd_demo(&cli, &config, *cycles),
        Commands::Run { seed, cycles, focus } => cmd_run(&cli, &config, seed, *cycles, *focus),
        Commands::Ppm { primes } => cmd_ppm(&cli, primes),
        Commands::Encode { value, primes } => cmd_encode(&cli, *value, *primes),
        Commands::Transform {
            values,
            random,
            seed,
        } => cmd_transform(&cli, &config, values, *random, *seed),
        Commands::Garden { depth, cycles } => cmd_garden(&cli, &config, *depth, *cycles),
        Commands::Config => cmd_config(&config),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_metrics(m: &KernelMetrics) {
    println!("atoms:      {}", m.total_atoms);
    println!("links:      {}", m.total_links);
    println!("cycles:     {}", m.cycles);
    println!("qc:         {:.4}", m.quantum_coherence);
    println!("emergence:  {:.4}", m.consciousness_emergence);
    println!("ppm:        {:.4}", m.ppm_coherence);
    println!("entropy:    {:.4}", m.attention_entropy);
    println!("coherent:   {}", m.coherent);
}

fn print_report(cli: &Cli, report: &CycleReport) -> Result<()> {
    if cli.json {
        return print_json(report);
    }
    print_metrics(&report.metrics);
    println!(
        "attention:  total={:.2}, utilization={:.2}",
        report.attention.total_attention, report.attention.resource_utilization
    );
    for atom in &report.focus {
        println!("  {:<10} {:<16} {:<24} sti={:.2}", atom.id, atom.atom_type, atom.name, atom.sti);
    }
    Ok(())
}

fn cmd_demo(cli: &Cli, config: &RuntimeConfig, cycles: usize) -> Result<()> {
    let kernel = build_kernel(&config.unified)?;
    kernel.seed_fundamentals()?;

    let cat = kernel.create_atom("ConceptNode", "Cat", 0.9, 0.8)?;
    let animal = kernel.create_atom("ConceptNode", "Animal", 0.95, 0.9)?;
    let mammal = kernel.create_atom("ConceptNode", "Mammal", 0.9, 0.85)?;
    let purrs = kernel.create_atom("PredicateNode", "purrs", 0.8, 0.7)?;
    kernel.create_link("InheritanceLink", &[cat, mammal], 0.95, 0.9)?;
    kernel.create_link("InheritanceLink", &[mammal, animal], 0.98, 0.95)?;
    kernel.create_link("EvaluationLink", &[purrs, cat], 0.85, 0.8)?;
    kernel.stimulate(cat, 500.0)?;

    let report = run_kernel(&kernel, cycles, 5)?;
    print_report(cli, &report)
}

fn cmd_run(
    cli: &Cli,
    config: &RuntimeConfig,
    seed: &Path,
    cycles: usize,
    focus: usize,
) -> Result<()> {
    let seed = SeedFile::load(seed)
        .with_context(|| format!("failed to load seed {}", seed.display()))?;
    let kernel = build_kernel(&config.unified)?;
    seed.apply(&kernel).context("failed to apply seed")?;
    let report = run_kernel(&kernel, cycles, focus)?;
    print_report(cli, &report)
}

#[derive(Serialize)]
struct PpmOutput<'a> {
    primes: &'a [u32],
    coherence: f64,
    importance: f64,
    resonance_hz: f64,
}

fn cmd_ppm(cli: &Cli, primes: &[u32]) -> Result<()> {
    if primes.contains(&0) {
        bail!("primes must be positive");
    }
    let out = PpmOutput {
        primes,
        coherence: compute_ppm_coherence(primes),
        importance: prime_importance(primes),
        resonance_hz: resonance_frequency(primes),
    };
    if cli.json {
        return print_json(&out);
    }
    println!("coherence:  {:.6}", out.coherence);
    println!("importance: {:.6}", out.importance);
    println!("resonance:  {:.2}Hz", out.resonance_hz);
    Ok(())
}

fn cmd_encode(cli: &Cli, value: f64, primes: usize) -> Result<()> {
    let encoded = prime_encode(value, primes)?;
    if cli.json {
        return print_json(&encoded);
    }
    let rendered: Vec<String> = encoded.iter().map(u32::to_string).collect();
    println!("{}", rendered.join(" "));
    Ok(())
}

fn cmd_transform(
    cli: &Cli,
    config: &RuntimeConfig,
    values: &[f64],
    random: Option<usize>,
    seed: u64,
) -> Result<()> {
    let signal: Vec<f64> = match random {
        Some(n) => {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
        }
        None => values.to_vec(),
    };
    let engine = TCTransformEngine::new(config.transform.clone())?;
    let result = engine.transform(&signal).context("transform failed")?;
    if cli.json {
        return print_json(&result);
    }
    print_transform(&result);
    Ok(())
}

fn print_transform(result: &TCTransformResult) {
    let dominant: Vec<String> = result.dominant_primes.iter().map(u32::to_string).collect();
    println!("samples:    {}", result.signal_length);
    println!("energy:     {:.4}", result.signal_energy);
    println!("dominant:   {}", dominant.join(" "));
    println!("coherence:  {:.6}", result.overall_coherence);
    for (prime, activation) in &result.prime_spectrum {
        let phase = result.phase_values.get(prime).copied().unwrap_or(0.0);
        println!("  {prime:>3}  {activation:.4}  phase={phase:+.3}");
    }
}

fn cmd_garden(cli: &Cli, config: &RuntimeConfig, depth: usize, cycles: usize) -> Result<()> {
    let gog = build_gog(&config.gog)?;
    let mut parent = gog.root()?;
    for level in 1..=depth {
        let id = gog
            .create_child_garden(parent, &format!("level-{level}"))
            .with_context(|| format!("failed to plant garden at depth {level}"))?;
        let kernel = gog.kernel(id)?;
        let seed = kernel.create_atom("ConceptNode", &format!("seed-{level}"), 0.9, 0.8)?;
        let sprout = kernel.create_atom("ConceptNode", &format!("sprout-{level}"), 0.7, 0.6)?;
        kernel.create_link("SimilarityLink", &[seed, sprout], 0.8, 0.7)?;
        let signal: Vec<f64> = (0..16).map(|i| ((i * level) as f64 * 0.1).sin()).collect();
        gog.add_petal(id, &signal)?;
        parent = id;
    }
    let metrics = gog.run_cycles(cycles)?;
    print_gog(cli, &metrics)
}

fn print_gog(cli: &Cli, m: &GogMetrics) -> Result<()> {
    if cli.json {
        return print_json(m);
    }
    println!("gardens:    {}", m.total_gardens);
    println!("petals:     {}", m.total_petals);
    println!("max_depth:  {}", m.max_depth_reached);
    println!("coherent:   {}", m.coherent_gardens);
    println!("average:    {:.4}", m.average_coherence);
    println!("resonant:   {}", m.resonant_pairs);
    Ok(())
}

fn cmd_config(config: &RuntimeConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
