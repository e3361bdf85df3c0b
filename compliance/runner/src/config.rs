// Licensed under the Apache-2.0 license

use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config section [{0}] is missing. Please enter input file paths in configuration.")]
    Missing(String),
    #[error("[{section}] {key}: {reason}")]
    Invalid {
        section: String,
        key: &'static str,
        reason: String,
    },
    #[error("could not resolve path {}: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which side of the comparison a backend plays. The role prefixes the
/// signature file name the harness looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Dut,
    Reference,
}

impl Role {
    pub fn prefix(self) -> &'static str {
        match self {
            Role::Dut => "DUT",
            Role::Reference => "Reference",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Generated makefile executed by `make -j<jobs>`.
    #[default]
    Make,
    /// In-process worker pool of `jobs` threads.
    Pool,
}

#[derive(Debug, Default, Deserialize)]
struct RunnerSection {
    dut: Option<String>,
    reference: Option<String>,
}

/// Top level configuration file: a `[runner]` table naming the backend
/// sections, plus one table per backend.
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    runner: RunnerSection,
    #[serde(flatten)]
    sections: BTreeMap<String, Value>,
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Section name of the backend playing `role`, if configured.
    pub fn section_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Dut => self.runner.dut.as_deref(),
            Role::Reference => self.runner.reference.as_deref(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Table> {
        self.sections.get(name).and_then(Value::as_table)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawBackend {
    #[serde(rename = "PATH")]
    path: Option<PathBuf>,
    model: Option<String>,
    jobs: Option<Value>,
    pluginpath: Option<PathBuf>,
    ispec: Option<PathBuf>,
    pspec: Option<PathBuf>,
    target_run: Option<Value>,
    make: Option<String>,
    compiler: Option<String>,
    objdump: Option<String>,
    isac: Option<String>,
    name: Option<String>,
    scheduler: Option<SchedulerKind>,
    sim_dir: Option<PathBuf>,
}

/// Settings of one backend, resolved once at construction and read-only
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Configuration section this was read from.
    pub section: String,
    /// Backend model; defaults to the section name.
    pub model: String,
    pub role: Role,
    /// Stem of the signature file, `<role>-<section>` unless overridden.
    pub name: String,
    /// Directory holding the simulator executables; `None` searches `$PATH`.
    pub exe_dir: Option<PathBuf>,
    pub jobs: usize,
    pub plugin_path: PathBuf,
    pub isa_spec: Option<PathBuf>,
    pub platform_spec: Option<PathBuf>,
    pub target_run: bool,
    pub make: String,
    pub compiler: Option<String>,
    pub objdump: Option<String>,
    pub isac: String,
    pub scheduler: SchedulerKind,
    pub sim_dir: Option<PathBuf>,
}

impl BackendConfig {
    pub fn construct(section: &str, role: Role, table: Option<&Table>) -> Result<Self, ConfigError> {
        let Some(table) = table else {
            return Err(ConfigError::Missing(section.to_string()));
        };
        for (key, value) in table.iter() {
            debug!("[{section}] {key} : {value}");
        }
        let raw: RawBackend = Value::Table(table.clone()).try_into()?;

        let invalid = |key: &'static str, reason: String| ConfigError::Invalid {
            section: section.to_string(),
            key,
            reason,
        };

        let jobs = match raw.jobs {
            None => 1,
            Some(value) => parse_jobs(&value).map_err(|reason| invalid("jobs", reason))?,
        };
        let plugin_path = raw
            .pluginpath
            .ok_or_else(|| invalid("pluginpath", "required".into()))?;

        Ok(Self {
            section: section.to_string(),
            model: raw.model.unwrap_or_else(|| section.to_string()),
            role,
            name: raw
                .name
                .unwrap_or_else(|| format!("{}-{}", role.prefix(), section)),
            exe_dir: raw.path,
            jobs,
            plugin_path: absolute(&plugin_path)?,
            isa_spec: raw.ispec.as_deref().map(absolute).transpose()?,
            platform_spec: raw.pspec.as_deref().map(absolute).transpose()?,
            target_run: raw.target_run.as_ref().map_or(true, target_run_enabled),
            make: raw.make.unwrap_or_else(|| "make".into()),
            compiler: raw.compiler,
            objdump: raw.objdump,
            isac: raw.isac.unwrap_or_else(|| "riscv_isac".into()),
            scheduler: raw.scheduler.unwrap_or_default(),
            sim_dir: raw.sim_dir.as_deref().map(absolute).transpose()?,
        })
    }

    /// Path of a simulator executable, placed under `PATH` when configured.
    pub fn executable(&self, name: &str) -> String {
        match &self.exe_dir {
            Some(dir) => dir.join(name).display().to_string(),
            None => name.to_string(),
        }
    }

    /// `<plugin>/env`, holding the linker script and model headers.
    pub fn env_dir(&self) -> PathBuf {
        self.plugin_path.join("env")
    }
}

fn parse_jobs(value: &Value) -> Result<usize, String> {
    let jobs = match value {
        Value::Integer(n) => usize::try_from(*n).map_err(|e| e.to_string())?,
        Value::String(s) => s.trim().parse::<usize>().map_err(|e| e.to_string())?,
        other => return Err(format!("expected a number, found {other}")),
    };
    if jobs == 0 {
        return Err("must be at least 1".into());
    }
    Ok(jobs)
}

/// Targets run unless explicitly disabled with `"0"` (or `0` / `false`).
fn target_run_enabled(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim() != "0",
        Value::Integer(n) => *n != 0,
        Value::Boolean(b) => *b,
        _ => true,
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Path {
        path: path.to_path_buf(),
        source,
    })
}
