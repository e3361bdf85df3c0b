// Licensed under the Apache-2.0 license

use crate::adapter::{RunOutcome, TargetAdapter};
use crate::backend::{Backend, BackendKind};
use crate::config::{ConfigError, Role};
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use crate::neorv32::Neorv32;
use crate::sail::SailCSim;
use crate::test_list::TestList;
use log::info;
use std::path::PathBuf;

/// Inputs of one harness run, shared by every target.
#[derive(Clone, Debug, Default)]
pub struct RunRequest {
    pub suite_dir: PathBuf,
    pub work_dir: PathBuf,
    pub arch_env_dir: PathBuf,
    /// Overrides the ISA spec named by the backend section.
    pub isa_spec: Option<PathBuf>,
    pub platform_spec: Option<PathBuf>,
    /// Coverage files; empty disables coverage.
    pub coverage: Vec<PathBuf>,
}

/// Constructs the adapter for `section` and walks it through a whole run.
pub fn run_target(
    kind: BackendKind,
    section: &str,
    role: Role,
    table: Option<&toml::Table>,
    request: &RunRequest,
    tests: &TestList,
    runner: &dyn CommandRunner,
) -> Result<RunOutcome, AdapterError> {
    match kind {
        BackendKind::Neorv32 => run(Neorv32, section, role, table, request, tests, runner),
        BackendKind::SailCSim => run(SailCSim, section, role, table, request, tests, runner),
    }
}

fn run<B: Backend>(
    backend: B,
    section: &str,
    role: Role,
    table: Option<&toml::Table>,
    request: &RunRequest,
    tests: &TestList,
    runner: &dyn CommandRunner,
) -> Result<RunOutcome, AdapterError> {
    let mut adapter = TargetAdapter::construct(backend, section, role, table)?;
    adapter.initialise(
        &request.suite_dir,
        &request.work_dir,
        &request.arch_env_dir,
        runner,
    )?;

    let config = adapter.config();
    let isa_spec = request
        .isa_spec
        .clone()
        .or_else(|| config.isa_spec.clone())
        .ok_or_else(|| ConfigError::Invalid {
            section: section.to_string(),
            key: "ispec",
            reason: "no ISA spec given".into(),
        })?;
    let platform_spec = request
        .platform_spec
        .clone()
        .or_else(|| config.platform_spec.clone());
    adapter.build(&isa_spec, platform_spec.as_deref())?;

    let coverage = (!request.coverage.is_empty()).then_some(request.coverage.as_slice());
    let outcome = adapter.run_tests(tests, coverage, runner)?;
    info!("{}: {:?}", adapter.config().name, adapter.state());
    Ok(outcome)
}
