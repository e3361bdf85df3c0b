// Licensed under the Apache-2.0 license

use crate::adapter::{RunOutcome, RunSummary, TargetSetup};
use crate::backend::{Backend, BackendKind, Executable};
use crate::command::CommandLine;
use crate::config::BackendConfig;
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use crate::test_list::{TestEntry, TestList};
use compliance_isa::Xlen;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

const ELF: &str = "main.elf";
const MEMORY_IMAGE: &str = "main.hex";
const SETUP_SCRIPT: &str = "ghdl_setup.sh";
const RUN_SCRIPT: &str = "ghdl_run.sh";
/// Written by the testbench whatever the target is called.
const SIM_SIGNATURE: &str = "DUT-neorv32.signature";

/// Processor extensions enabled through GHDL generics for one test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RtlFeatures {
    pub m: bool,
    pub c: bool,
    pub b: bool,
}

impl RtlFeatures {
    /// Derives the extensions from the test's march string.
    ///
    /// Privilege tests are built with compressed instructions whatever their
    /// march says, so a test whose id or path mentions `privilege` always
    /// gets the C extension.
    pub fn detect(march: &str, test_id: &str, test_path: &Path) -> Self {
        let privilege =
            test_id.contains("privilege") || test_path.to_string_lossy().contains("privilege");
        Self {
            m: march.contains("rv32im"),
            c: march.contains("rv32ic") || privilege,
            b: ["rv32izba", "rv32izbb", "rv32izbc", "rv32izbs"]
                .iter()
                .any(|ext| march.contains(ext)),
        }
    }

    /// Arguments for `ghdl_run.sh`.
    pub fn generics(&self, mem_size: u64) -> Vec<String> {
        let mut generics = vec![format!("-gMEM_SIZE={mem_size}")];
        if self.m {
            generics.push("-gRISCV_M=true".into());
        }
        if self.c {
            generics.push("-gRISCV_C=true".into());
        }
        if self.b {
            generics.push("-gRISCV_B=true".into());
        }
        generics
    }
}

/// The simulation directory every test passes through. Tests share it, so it
/// is only ever used by one test at a time.
#[derive(Debug)]
pub struct SimStage {
    dir: PathBuf,
}

impl SimStage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The scripts expect to be started from the directory holding `sim/`.
    fn script_cwd(&self) -> &Path {
        match self.dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn script(&self, name: &str) -> CommandLine {
        CommandLine::new("sh").path_arg(&self.dir.join(name))
    }

    /// Clears what the previous test left behind and stages `elf`.
    fn load_elf(&mut self, elf: &Path) -> std::io::Result<u64> {
        for stale in [SIM_SIGNATURE, ELF, MEMORY_IMAGE] {
            remove_if_present(&self.dir.join(stale))?;
        }
        std::fs::copy(elf, self.dir.join(ELF))
    }

    fn memory_image_len(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(self.dir.join(MEMORY_IMAGE))?.len())
    }

    fn collect_signature(&self, dest: &Path) -> std::io::Result<u64> {
        std::fs::copy(self.dir.join(SIM_SIGNATURE), dest)
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// neorv32 processor simulated with GHDL.
#[derive(Debug, Default)]
pub struct Neorv32;

impl Neorv32 {
    fn stage(config: &BackendConfig) -> SimStage {
        let dir = config
            .sim_dir
            .clone()
            .or_else(|| std::path::absolute("sim").ok())
            .unwrap_or_else(|| PathBuf::from("sim"));
        SimStage::new(dir)
    }

    /// Runs the simulation of one compiled test and leaves its signature in
    /// the test directory. Returns false when a step left nothing to
    /// continue with.
    fn simulate(
        config: &BackendConfig,
        setup: &TargetSetup,
        stage: &mut SimStage,
        id: &str,
        entry: &TestEntry,
        runner: &dyn CommandRunner,
    ) -> Result<bool, AdapterError> {
        if let Err(e) = stage.load_elf(&entry.work_dir.join(ELF)) {
            error!("{id}: could not stage {ELF}: {e}");
            return Ok(false);
        }

        let hex = CommandLine::new(config.make.as_str())
            .arg("-C")
            .path_arg(stage.dir())
            .args(["clean", MEMORY_IMAGE]);
        runner
            .run(&hex, None)
            .map_err(AdapterError::io(format!("{id}: {}", config.make)))?;
        let mem_size = match stage.memory_image_len() {
            Ok(len) => len,
            Err(e) => {
                error!("{id}: no memory image: {e}");
                return Ok(false);
            }
        };

        let features = RtlFeatures::detect(&entry.march(), id, &entry.test_path);
        let sim = stage.script(RUN_SCRIPT).args(features.generics(mem_size));
        runner
            .run(&sim, Some(stage.script_cwd()))
            .map_err(AdapterError::io(format!("{id}: {RUN_SCRIPT}")))?;

        if let Err(e) = stage.collect_signature(&setup.signature_path(&entry.work_dir)) {
            warn!("{id}: no {SIM_SIGNATURE} after simulation: {e}");
            return Ok(false);
        }
        Ok(true)
    }
}

impl Backend for Neorv32 {
    fn kind(&self) -> BackendKind {
        BackendKind::Neorv32
    }

    fn default_compiler(&self, xlen: Xlen) -> String {
        format!("riscv{}-unknown-elf-gcc", xlen.bits())
    }

    fn debug_info(&self) -> bool {
        true
    }

    fn required_executables(&self, config: &BackendConfig, xlen: Xlen) -> Vec<Executable> {
        vec![
            Executable::new(
                "compiler",
                config
                    .compiler
                    .clone()
                    .unwrap_or_else(|| self.default_compiler(xlen)),
            ),
            Executable::new("make", config.make.as_str()),
            Executable::new("shell", "sh"),
        ]
    }

    fn prepare(
        &mut self,
        config: &BackendConfig,
        runner: &dyn CommandRunner,
    ) -> Result<(), AdapterError> {
        let stage = Self::stage(config);
        info!("Preparing GHDL simulation in {}", stage.dir().display());
        runner
            .run(&stage.script(SETUP_SCRIPT), Some(stage.script_cwd()))
            .map_err(AdapterError::io(SETUP_SCRIPT))?;
        Ok(())
    }

    fn run_tests(
        &mut self,
        config: &BackendConfig,
        setup: &TargetSetup,
        tests: &TestList,
        _coverage: Option<&[PathBuf]>,
        runner: &dyn CommandRunner,
    ) -> Result<RunOutcome, AdapterError> {
        let mut stage = Self::stage(config);
        let mut compiled = 0;
        let mut summary = RunSummary::default();

        for (id, entry) in tests.iter() {
            debug!("Running Test: {id} on {}", config.name);
            let compile =
                setup
                    .compile
                    .instantiate(&entry.march(), &entry.test_path, ELF, &entry.macros);
            debug!("Compiling test: {}", entry.test_path.display());
            runner
                .run(&compile, Some(&entry.work_dir))
                .map_err(AdapterError::io(format!("{id}: {}", compile.program())))?;
            compiled += 1;

            if !config.target_run {
                continue;
            }
            summary.executed += 1;
            if !Self::simulate(config, setup, &mut stage, id, entry, runner)? {
                summary.missing_signatures.push(id.to_string());
            }
        }

        if !config.target_run {
            return Ok(RunOutcome::CompiledOnly { compiled });
        }
        Ok(RunOutcome::Completed(summary))
    }
}
