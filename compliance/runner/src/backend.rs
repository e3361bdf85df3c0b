// Licensed under the Apache-2.0 license

use crate::adapter::{RunOutcome, TargetSetup};
use crate::config::BackendConfig;
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use crate::test_list::TestList;
use compliance_isa::Xlen;
use log::{debug, error};
use std::path::{Path, PathBuf};

/// An executable a backend cannot work without.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executable {
    pub role: &'static str,
    pub name: String,
}

impl Executable {
    pub fn new(role: &'static str, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
        }
    }
}

/// An execution target the adapter can drive.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Compiler used when the configuration does not name one.
    fn default_compiler(&self, xlen: Xlen) -> String;

    /// Whether tests are compiled with `-g`.
    fn debug_info(&self) -> bool {
        false
    }

    /// Everything `build` has to find before any test is compiled.
    fn required_executables(&self, config: &BackendConfig, xlen: Xlen) -> Vec<Executable>;

    /// One-time preparation run by `initialise`.
    fn prepare(
        &mut self,
        _config: &BackendConfig,
        _runner: &dyn CommandRunner,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    fn run_tests(
        &mut self,
        config: &BackendConfig,
        setup: &TargetSetup,
        tests: &TestList,
        coverage: Option<&[PathBuf]>,
        runner: &dyn CommandRunner,
    ) -> Result<RunOutcome, AdapterError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// neorv32 RTL simulated with GHDL.
    Neorv32,
    /// Sail C reference simulator.
    SailCSim,
}

impl BackendKind {
    pub fn from_model(model: &str) -> Option<Self> {
        match model {
            "neorv32" => Some(BackendKind::Neorv32),
            "sail_cSim" | "sail_c_simulator" => Some(BackendKind::SailCSim),
            _ => None,
        }
    }

    pub fn model(self) -> &'static str {
        match self {
            BackendKind::Neorv32 => "neorv32",
            BackendKind::SailCSim => "sail_cSim",
        }
    }
}

/// Checks that every required executable can be found, in order, stopping
/// at the first one that cannot.
pub fn validate(required: &[Executable]) -> Result<(), AdapterError> {
    for exe in required {
        match resolve_executable(&exe.name) {
            Some(path) => debug!("{} {} found at {}", exe.role, exe.name, path.display()),
            None => {
                error!(
                    "{}: executable not found. Please check environment setup.",
                    exe.name
                );
                return Err(AdapterError::MissingExecutable {
                    role: exe.role,
                    name: exe.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Finds `name` the way a shell would: names with a directory component are
/// checked as given, bare names are searched for in `$PATH`.
pub fn resolve_executable(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 {
        return is_executable(path).then(|| path.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
