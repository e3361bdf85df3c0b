// Licensed under the Apache-2.0 license

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use compliance_isa::IsaProfile;
use compliance_runner::{
    run_target, BackendKind, Role, RunOutcome, RunRequest, RunnerConfig, SystemRunner, TestList,
};
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log commands and configuration as they are used
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a test list on the configured targets
    Run {
        /// Runner configuration (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Root of the architecture test suite
        #[arg(long)]
        suite: PathBuf,

        /// Suite env directory holding the test macros
        #[arg(long)]
        env: PathBuf,

        /// Directory the harness created the per-test work directories in
        #[arg(long)]
        work_dir: PathBuf,

        /// YAML test list produced by the harness
        #[arg(long)]
        test_list: PathBuf,

        #[arg(long, value_enum, default_value_t = Target::All)]
        target: Target,

        /// Coverage group files; enables coverage on the reference
        #[arg(long)]
        cgf: Vec<PathBuf>,

        /// ISA spec, overriding `ispec` of every section
        #[arg(long)]
        isa: Option<PathBuf>,

        /// Platform spec, overriding `pspec` of every section
        #[arg(long)]
        platform: Option<PathBuf>,
    },

    /// Print the identifier and ABI of an ISA spec
    Isa { spec: PathBuf },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Target {
    Dut,
    Reference,
    All,
}

impl Target {
    fn roles(self) -> &'static [Role] {
        match self {
            Target::Dut => &[Role::Dut],
            Target::Reference => &[Role::Reference],
            Target::All => &[Role::Dut, Role::Reference],
        }
    }
}

fn run(
    config: &Path,
    target: Target,
    request: RunRequest,
    test_list: &Path,
) -> anyhow::Result<()> {
    let config = RunnerConfig::load(config)?;
    let tests = TestList::load(test_list)?;
    info!("Loaded {} tests from {}", tests.len(), test_list.display());

    for &role in target.roles() {
        let Some(section) = config.section_for(role) else {
            if target == Target::All {
                warn!("No {role} section configured, skipping");
                continue;
            }
            bail!("no {role} configured in [runner]");
        };
        let table = config.section(section);
        let model = table
            .and_then(|t| t.get("model"))
            .and_then(|v| v.as_str())
            .unwrap_or(section);
        let kind = BackendKind::from_model(model)
            .ok_or_else(|| anyhow!("[{section}]: unknown model {model}"))?;

        // coverage is measured on the reference only
        let mut request = request.clone();
        if role == Role::Dut {
            request.coverage.clear();
        }

        info!("Running {role} on {section} ({})", kind.model());
        let outcome = run_target(kind, section, role, table, &request, &tests, &SystemRunner)
            .with_context(|| format!("{role} target [{section}]"))?;
        match outcome {
            RunOutcome::CompiledOnly { compiled } => {
                info!("{section}: compiled {compiled} tests, target runs disabled");
                return Ok(());
            }
            RunOutcome::Completed(summary) => {
                for id in summary.missing_signatures.iter() {
                    warn!("{section}: {id} produced no signature");
                }
                info!(
                    "{section}: {} of {} tests produced a signature",
                    summary.executed - summary.missing_signatures.len(),
                    summary.executed
                );
            }
        }
    }
    Ok(())
}

fn isa(spec: &Path) -> anyhow::Result<()> {
    let profile = IsaProfile::load(spec)?;
    println!(
        "{} {} -mabi={}",
        profile.identifier(),
        profile.isa_string(),
        profile.xlen().abi()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).env().init().unwrap();

    let result = match cli.command {
        Commands::Run {
            config,
            suite,
            env,
            work_dir,
            test_list,
            target,
            cgf,
            isa,
            platform,
        } => run(
            &config,
            target,
            RunRequest {
                suite_dir: suite,
                work_dir,
                arch_env_dir: env,
                isa_spec: isa,
                platform_spec: platform,
                coverage: cgf,
            },
            &test_list,
        ),
        Commands::Isa { spec } => isa(&spec),
    };
    result.unwrap_or_else(|e| {
        error!("{e:#}");
        std::process::exit(1);
    });
}
