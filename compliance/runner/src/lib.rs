// Licensed under the Apache-2.0 license

//! Compliance test targets for the RISC-V architecture test flow.
//!
//! A [`TargetAdapter`] takes a harness-produced [`TestList`], compiles every
//! test for the hart described by the ISA spec and runs it on one backend,
//! leaving `<name>.signature` in each test's work directory:
//!
//! * [`Neorv32`] runs the GHDL simulation of the neorv32 RTL, one test at a time;
//! * [`SailCSim`] batches the Sail C reference simulator through a [`Scheduler`].

mod adapter;
mod backend;
mod command;
mod config;
mod error;
mod exec;
pub mod lifecycle;
mod neorv32;
mod sail;
mod schedule;
mod session;
mod test_list;

pub use adapter::{RunOutcome, RunSummary, TargetAdapter, TargetDirs, TargetSetup};
pub use backend::{resolve_executable, validate, Backend, BackendKind, Executable};
pub use command::{CommandLine, CompileTemplate, Redirect};
pub use config::{BackendConfig, ConfigError, Role, RunnerConfig, SchedulerKind};
pub use error::AdapterError;
pub use exec::{CommandRunner, SystemRunner};
pub use neorv32::{Neorv32, RtlFeatures, SimStage};
pub use sail::SailCSim;
pub use schedule::{Job, JobBatch, MakeScheduler, PoolScheduler, Scheduler};
pub use session::{run_target, RunRequest};
pub use test_list::{TestEntry, TestList, TestListError};
