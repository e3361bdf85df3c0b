// Licensed under the Apache-2.0 license

use crate::backend::{validate, Backend};
use crate::command::CompileTemplate;
use crate::config::{BackendConfig, Role};
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use crate::lifecycle::{self, Events, Lifecycle, StateMachine, States};
use crate::test_list::TestList;
use compliance_isa::{relocation_mask, IsaProfile, SET_REL_TVAL_MSK};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Directories handed to `initialise`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDirs {
    pub suite_dir: PathBuf,
    pub work_dir: PathBuf,
    pub arch_env_dir: PathBuf,
}

/// Everything a test run needs, fixed once `build` has seen the ISA spec.
#[derive(Clone, Debug)]
pub struct TargetSetup {
    pub dirs: TargetDirs,
    pub profile: IsaProfile,
    pub compile: CompileTemplate,
    signature_name: String,
}

impl TargetSetup {
    pub fn finalize<B: Backend + ?Sized>(
        backend: &B,
        config: &BackendConfig,
        dirs: TargetDirs,
        profile: IsaProfile,
    ) -> Self {
        let xlen = profile.xlen();
        let compiler = config
            .compiler
            .clone()
            .unwrap_or_else(|| backend.default_compiler(xlen));
        let compile = CompileTemplate::new(
            compiler,
            xlen,
            backend.debug_info(),
            &config.env_dir(),
            &dirs.arch_env_dir,
        );
        Self {
            dirs,
            profile,
            compile,
            signature_name: format!("{}.signature", config.name),
        }
    }

    /// File name the harness expects, e.g. `DUT-neorv32.signature`.
    pub fn signature_name(&self) -> &str {
        &self.signature_name
    }

    pub fn signature_path(&self, test_dir: &Path) -> PathBuf {
        test_dir.join(&self.signature_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    /// Tests that left no signature behind.
    pub missing_signatures: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Target runs are disabled: every test was compiled and nothing ran.
    CompiledOnly { compiled: usize },
}

/// Drives one backend through `initialise`, `build` and `run_tests`.
pub struct TargetAdapter<B: Backend> {
    backend: B,
    config: BackendConfig,
    lifecycle: StateMachine<Lifecycle>,
    dirs: Option<TargetDirs>,
    setup: Option<TargetSetup>,
}

impl<B: Backend> TargetAdapter<B> {
    pub fn new(backend: B, config: BackendConfig) -> Self {
        Self {
            backend,
            config,
            lifecycle: lifecycle::new(),
            dirs: None,
            setup: None,
        }
    }

    /// Reads the backend's section of the configuration file.
    pub fn construct(
        backend: B,
        section: &str,
        role: Role,
        table: Option<&toml::Table>,
    ) -> Result<Self, AdapterError> {
        let config = BackendConfig::construct(section, role, table)?;
        debug!(
            "{} plugin initialised using section [{section}]",
            backend.kind().model()
        );
        Ok(Self::new(backend, config))
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn state(&self) -> &States {
        self.lifecycle.state()
    }

    pub fn setup(&self) -> Option<&TargetSetup> {
        self.setup.as_ref()
    }

    fn advance(&mut self, event: Events, op: &'static str) -> Result<(), AdapterError> {
        let state = format!("{:?}", self.lifecycle.state());
        self.lifecycle
            .process_event(event)
            .map(|_| ())
            .map_err(|_| AdapterError::Lifecycle { op, state })
    }

    pub fn initialise(
        &mut self,
        suite_dir: &Path,
        work_dir: &Path,
        arch_env_dir: &Path,
        runner: &dyn CommandRunner,
    ) -> Result<(), AdapterError> {
        self.advance(Events::Initialise, "initialise")?;
        self.dirs = Some(TargetDirs {
            suite_dir: suite_dir.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            arch_env_dir: arch_env_dir.to_path_buf(),
        });
        self.backend.prepare(&self.config, runner)
    }

    /// Loads the ISA spec and finalizes the setup.
    pub fn build(
        &mut self,
        isa_yaml: &Path,
        platform_yaml: Option<&Path>,
    ) -> Result<&TargetSetup, AdapterError> {
        let profile = IsaProfile::load(isa_yaml)?;
        if let Some(platform_yaml) = platform_yaml {
            debug!("Platform spec: {}", platform_yaml.display());
        }
        self.build_with_profile(profile)
    }

    pub fn build_with_profile(
        &mut self,
        profile: IsaProfile,
    ) -> Result<&TargetSetup, AdapterError> {
        if !matches!(self.lifecycle.state(), States::Initialised) {
            return Err(AdapterError::Lifecycle {
                op: "build",
                state: format!("{:?}", self.lifecycle.state()),
            });
        }
        let dirs = self.dirs.clone().ok_or_else(|| AdapterError::Lifecycle {
            op: "build",
            state: "not initialised".into(),
        })?;
        info!(
            "{}: building for {} ({})",
            self.config.name,
            profile.identifier(),
            profile.isa_string()
        );
        info!(
            "<plugin-{}> overriding default {SET_REL_TVAL_MSK} macro (removing BREAKPOINT exception)",
            self.config.section
        );
        debug!("{SET_REL_TVAL_MSK}={}", relocation_mask());

        validate(
            &self
                .backend
                .required_executables(&self.config, profile.xlen()),
        )?;
        self.advance(Events::Build, "build")?;
        let setup = TargetSetup::finalize(&self.backend, &self.config, dirs, profile);
        Ok(&*self.setup.insert(setup))
    }

    pub fn run_tests(
        &mut self,
        tests: &TestList,
        coverage: Option<&[PathBuf]>,
        runner: &dyn CommandRunner,
    ) -> Result<RunOutcome, AdapterError> {
        self.advance(Events::RunTests, "run_tests")?;
        let setup = self.setup.as_ref().ok_or_else(|| AdapterError::Lifecycle {
            op: "run_tests",
            state: "not built".into(),
        })?;
        info!("{}: running {} tests", self.config.name, tests.len());
        let outcome = self
            .backend
            .run_tests(&self.config, setup, tests, coverage, runner)?;
        match outcome {
            RunOutcome::CompiledOnly { .. } => {
                self.advance(Events::SkipTargetRun, "run_tests")?
            }
            RunOutcome::Completed(_) => self.advance(Events::Finish, "run_tests")?,
        }
        Ok(outcome)
    }
}
