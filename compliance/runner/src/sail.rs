// Licensed under the Apache-2.0 license

use crate::adapter::{RunOutcome, RunSummary, TargetSetup};
use crate::backend::{Backend, BackendKind, Executable};
use crate::command::{CommandLine, Redirect};
use crate::config::{BackendConfig, SchedulerKind};
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use crate::schedule::{Job, JobBatch, MakeScheduler, PoolScheduler, Scheduler};
use crate::test_list::{TestEntry, TestList};
use compliance_isa::Xlen;
use log::{debug, info, warn};
use std::path::PathBuf;

const ELF: &str = "ref.elf";
const DISASSEMBLY: &str = "ref.disass";
const COVERAGE_REPORT: &str = "coverage.rpt";

/// PMP with 16 regions at 4 byte granularity.
const PMP_FLAGS: [&str; 2] = ["--pmp-count=16", "--pmp-grain=0"];
const EXTENSION_FLAGS: [&str; 3] = ["--enable-zcb", "--enable-bitmanip", "--enable-zfinx"];

/// The Sail C model, used as the reference.
#[derive(Debug, Default)]
pub struct SailCSim;

impl SailCSim {
    pub fn simulator(xlen: Xlen) -> String {
        format!("riscv_sim_rv{}d", xlen.bits())
    }

    fn objdump(config: &BackendConfig) -> String {
        config
            .objdump
            .clone()
            .unwrap_or_else(|| "riscv-none-elf-objdump".into())
    }

    fn makefile(config: &BackendConfig, setup: &TargetSetup) -> PathBuf {
        setup
            .dirs
            .work_dir
            .join(format!("Makefile.{}", config.name))
    }

    fn scheduler(config: &BackendConfig, setup: &TargetSetup) -> Box<dyn Scheduler> {
        match config.scheduler {
            SchedulerKind::Make => Box::new(MakeScheduler::new(
                config.make.as_str(),
                config.jobs,
                Self::makefile(config, setup),
            )),
            SchedulerKind::Pool => Box::new(PoolScheduler::new(config.jobs)),
        }
    }

    /// Builds the job for one test: compile, disassemble and, when targets
    /// run, simulate and optionally measure coverage.
    pub fn test_job(
        config: &BackendConfig,
        setup: &TargetSetup,
        id: &str,
        entry: &TestEntry,
        coverage: Option<&[PathBuf]>,
    ) -> Job {
        let xlen = setup.profile.xlen();
        let test_name = entry.test_name();
        let log = format!("{test_name}.log");

        let mut job = Job::new(id, &entry.work_dir)
            .step(
                setup
                    .compile
                    .instantiate(&entry.march(), &entry.test_path, ELF, &entry.macros),
            )
            .step(
                CommandLine::new(Self::objdump(config))
                    .args(["-D", ELF])
                    .redirect(Redirect::Stdout(DISASSEMBLY.into())),
            );
        if !config.target_run {
            return job;
        }

        job = job.step(
            CommandLine::new(config.executable(&Self::simulator(xlen)))
                .args(PMP_FLAGS)
                .args(EXTENSION_FLAGS)
                .arg(format!(
                    "--test-signature={}",
                    setup.signature_path(&entry.work_dir).display()
                ))
                .arg(ELF)
                .redirect(Redirect::All(log.clone().into())),
        );

        if let Some(cgf) = coverage {
            let mut isac = CommandLine::new(config.isac.as_str())
                .args(["--verbose", "info", "coverage", "-d", "-t"])
                .arg(log)
                .args(["--parser-name", "c_sail", "-o", COVERAGE_REPORT])
                .args(["--sig-label", "begin_signature", "end_signature"])
                .args(["--test-label", "rvtest_code_begin", "rvtest_code_end"])
                .args(["-e", ELF]);
            for file in cgf {
                isac = isac.arg("-c").path_arg(file);
            }
            isac = isac.arg(format!("-x{}", xlen.bits()));
            for label in entry.coverage_labels.iter() {
                isac = isac.args(["-l", label.as_str()]);
            }
            job = job.step(isac);
        }
        job
    }
}

impl Backend for SailCSim {
    fn kind(&self) -> BackendKind {
        BackendKind::SailCSim
    }

    fn default_compiler(&self, _xlen: Xlen) -> String {
        "riscv-none-elf-gcc".into()
    }

    fn required_executables(&self, config: &BackendConfig, xlen: Xlen) -> Vec<Executable> {
        let mut required = vec![
            Executable::new(
                "compiler",
                config
                    .compiler
                    .clone()
                    .unwrap_or_else(|| self.default_compiler(xlen)),
            ),
            Executable::new("objdump", Self::objdump(config)),
        ];
        if config.target_run {
            required.push(Executable::new(
                "simulator",
                config.executable(&Self::simulator(xlen)),
            ));
        }
        if config.scheduler == SchedulerKind::Make {
            required.push(Executable::new("make", config.make.as_str()));
        }
        required
    }

    fn run_tests(
        &mut self,
        config: &BackendConfig,
        setup: &TargetSetup,
        tests: &TestList,
        coverage: Option<&[PathBuf]>,
        runner: &dyn CommandRunner,
    ) -> Result<RunOutcome, AdapterError> {
        let mut batch = JobBatch::new();
        for (id, entry) in tests.iter() {
            debug!("Scheduling test: {id}");
            batch.push(Self::test_job(config, setup, id, entry, coverage));
        }
        Self::scheduler(config, setup).execute(&batch, runner)?;

        if !config.target_run {
            info!("{}: compiled {} tests, target runs disabled", config.name, batch.len());
            return Ok(RunOutcome::CompiledOnly {
                compiled: batch.len(),
            });
        }

        let mut summary = RunSummary {
            executed: batch.len(),
            ..Default::default()
        };
        for (id, entry) in tests.iter() {
            let signature = setup.signature_path(&entry.work_dir);
            if !signature.is_file() {
                warn!("{id}: no signature at {}", signature.display());
                summary.missing_signatures.push(id.to_string());
            }
        }
        Ok(RunOutcome::Completed(summary))
    }
}
