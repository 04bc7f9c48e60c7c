//! listforge-gen: CLI for building domain/CIDR list artifacts and the
//! rule-set JSON document.

use clap::{Parser, Subcommand};
use listforge::dataset::FileCategoryProvider;
use listforge::fetch::HttpFetcher;
use listforge::store::{paths, ArtifactStore, FsStore};
use listforge::{build_ruleset, Config, Engine, SubnetEngine};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "listforge-gen")]
#[command(version)]
#[command(about = "Build curated domain/CIDR list artifacts and rule-set JSON", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Artifact output directory
    #[arg(short, long, default_value = "lists")]
    output_dir: PathBuf,

    /// Local checkout of the categorized domain dataset (data directory)
    #[arg(long, default_value = "tmp/domain-list-community/data")]
    dataset_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate domain lists for all services and groups
    Domains,

    /// Download and collapse the CIDR feeds
    Subnets,

    /// Emit the combined rule-set JSON from existing artifacts
    Ruleset {
        /// Output JSON file
        #[arg(short = 'j', long, default_value = "rules.json")]
        output: PathBuf,
    },

    /// Run domains, subnets and ruleset in sequence
    All {
        /// Output JSON file
        #[arg(short = 'j', long, default_value = "rules.json")]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // config problems are fatal before any artifact is touched
    let config = Config::load(&cli.config)?;
    let fetcher = HttpFetcher::new(config.user_agent.as_deref())?;
    let categories = FileCategoryProvider::new(&cli.dataset_dir);
    let store = FsStore::new(&cli.output_dir);

    match cli.command {
        Commands::Domains => {
            run_domains(&config, &fetcher, &categories, &store).await?;
        }
        Commands::Subnets => {
            run_subnets(&config, &fetcher, &store).await?;
        }
        Commands::Ruleset { output } => {
            run_ruleset(&store, &output)?;
        }
        Commands::All { output } => {
            run_domains(&config, &fetcher, &categories, &store).await?;
            run_subnets(&config, &fetcher, &store).await?;
            run_ruleset(&store, &output)?;
        }
    }

    Ok(())
}

async fn run_domains(
    config: &Config,
    fetcher: &HttpFetcher,
    categories: &FileCategoryProvider,
    store: &FsStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(config, fetcher, categories, store);
    let report = engine.run().await?;
    println!(
        "Aggregated {} domains from {} services and {} groups",
        report.total_domains, report.services, report.groups
    );
    Ok(())
}

async fn run_subnets(
    config: &Config,
    fetcher: &HttpFetcher,
    store: &FsStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = SubnetEngine::new(config, fetcher, store);
    engine.run().await?;
    println!("Subnet artifacts written");
    Ok(())
}

fn run_ruleset(store: &FsStore, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let domains = store.read_lines(paths::DOMAINS)?;
    let cidrs = store.read_lines(paths::SUMMARY_ALL)?;
    let document = build_ruleset(&domains, &cidrs);
    fs::write(output, document.to_json()?)?;
    println!(
        "Wrote {:?} ({} domain suffixes, {} CIDR blocks)",
        output,
        document.rules[0].domain_suffix.len(),
        document.rules[0].ip_cidr.len()
    );
    Ok(())
}
