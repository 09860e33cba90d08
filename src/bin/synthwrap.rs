//! synthwrap CLI
//!
//! Command-line interface for running wrapper scenarios and previewing
//! conversions against an in-memory deployment.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::{style, Term};

use synthwrap::cli::{Deployment, DeploymentConfig, Scenario, Side, CONFIG_ENV, OWNER_ENV};
use synthwrap::utils::address::AssetKey;
use synthwrap::utils::math::FixedPoint;

/// synthwrap - collateral-backed synth wrapper
#[derive(Parser)]
#[command(name = "synthwrap")]
#[command(author = "synthwrap Team")]
#[command(version = synthwrap::VERSION)]
#[command(about = "Mint and burn synths against collateral and distribute fees", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the deployment config
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file against a fresh deployment
    Run {
        /// Scenario JSON file
        scenario: PathBuf,
    },

    /// Preview a mint or burn against a fresh deployment
    Quote {
        /// Asset key, e.g. sETH
        #[arg(short, long)]
        asset: String,

        /// mint or burn
        #[arg(short, long, default_value = "mint")]
        side: String,

        /// Requested amount
        #[arg(short = 'n', long)]
        amount: String,

        /// Collateral already held by the wrapper
        #[arg(short, long, default_value = "0")]
        reserves: String,
    },

    /// Write the default deployment config
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "synthwrap.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run { scenario } => cmd_run(cli, scenario, term),
        Commands::Quote {
            asset,
            side,
            amount,
            reserves,
        } => cmd_quote(cli, asset, side, amount, reserves, term),
        Commands::InitConfig { output, force } => cmd_init_config(output, *force, term),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<DeploymentConfig> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = DeploymentConfig::load(path)?;
            if let Ok(owner) = std::env::var(OWNER_ENV) {
                config.owner = owner.parse()?;
            }
            config
        }
        None => DeploymentConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_run(cli: &Cli, path: &PathBuf, term: &Term) -> anyhow::Result<()> {
    let mut scenario = Scenario::load(path)?;
    if scenario.deployment.is_none() {
        scenario.deployment = Some(load_config(cli)?);
    }

    let _ = term.write_line(&format!(
        "{} Running {} steps from {}",
        style("→").cyan(),
        scenario.steps.len(),
        path.display()
    ));

    let report = scenario.run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for step in &report.steps {
        if step.ok {
            let _ = term.write_line(&format!(
                "  {} #{} {}",
                style("✓").green(),
                step.index,
                step.action
            ));
        } else {
            let _ = term.write_line(&format!(
                "  {} #{} {} [{}] {}",
                style("✗").red(),
                step.index,
                step.action,
                step.error_code.unwrap_or_default(),
                step.error.as_deref().unwrap_or_default()
            ));
        }
    }

    for wrapper in &report.wrappers {
        let _ = term.write_line(&format!(
            "\n{} {} at {}",
            style("ℹ").blue(),
            style(&wrapper.state.asset_key).yellow(),
            wrapper.address.short()
        ));
        let _ = term.write_line(&format!("  Synth debt:    {}", wrapper.state.synth_debt));
        let _ = term.write_line(&format!("  Stable issued: {}", wrapper.state.stable_debt_issued));
        let _ = term.write_line(&format!("  Fee escrow:    {}", wrapper.state.fee_escrow));
        let _ = term.write_line(&format!("  Reserves:      {}", wrapper.reserves));
        let _ = term.write_line(&format!("  Capacity:      {}", wrapper.capacity));
    }

    let _ = term.write_line(&format!(
        "\n{} Fees paid: {} ({} failed steps)",
        style("✓").green(),
        style(report.fees_paid).green(),
        report.failures()
    ));

    Ok(())
}

fn cmd_quote(
    cli: &Cli,
    asset: &str,
    side: &str,
    amount: &str,
    reserves: &str,
    term: &Term,
) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let deployment = Deployment::from_config(&config)?;

    let key: AssetKey = asset.parse()?;
    let side: Side = side.parse()?;
    let amount: FixedPoint = amount.parse()?;
    let reserves: FixedPoint = reserves.parse()?;

    if !reserves.is_zero() {
        deployment
            .ledgers(&key)?
            .collateral
            .mint(&deployment.factory().instance_address(&key), reserves)?;
    }

    let quote = deployment.quote(&key, side, amount)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
        return Ok(());
    }

    let _ = term.write_line(&format!(
        "{} {:?} {} {}",
        style("→").cyan(),
        quote.side,
        quote.requested,
        style(&key).yellow()
    ));
    let _ = term.write_line(&format!("  Processed: {}", quote.amount_processed));
    let _ = term.write_line(&format!("  Principal: {}", style(quote.principal).green()));
    let _ = term.write_line(&format!("  Fee:       {}", quote.fee));
    if quote.amount_processed < quote.requested {
        let _ = term.write_line(&format!(
            "{} Request exceeds what the wrapper can process",
            style("⚠").yellow()
        ));
    }

    Ok(())
}

fn cmd_init_config(output: &PathBuf, force: bool, term: &Term) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Config already exists: {}. Use --force to overwrite.",
            output.display()
        );
    }

    let config = DeploymentConfig::default();
    config.save(output)?;

    let _ = term.write_line(&format!(
        "{} Config written to: {}",
        style("✓").green(),
        output.display()
    ));
    let _ = term.write_line(&format!("  Owner:    {}", config.owner));
    let _ = term.write_line(&format!("  Fee sink: {}", config.fee_sink));

    Ok(())
}
