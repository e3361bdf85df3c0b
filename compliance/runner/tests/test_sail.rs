// Licensed under the Apache-2.0 license
#![cfg(unix)]

#[cfg(test)]
mod common;

use common::{Fixture, MockRunner};
use compliance_runner::lifecycle::States;
use compliance_runner::{
    run_target, AdapterError, BackendKind, CommandLine, ConfigError, Role, RunOutcome,
    RunRequest, SailCSim, TargetAdapter, TestList,
};
use std::path::Path;

/// Writes the signature wherever the simulator is told to.
fn sail_runner() -> MockRunner {
    MockRunner::with_hook(|cmd: &CommandLine, _cwd: Option<&Path>| {
        if !cmd.program().ends_with("riscv_sim_rv32d") {
            return;
        }
        for arg in cmd.get_args() {
            if let Some(path) = arg.strip_prefix("--test-signature=") {
                std::fs::write(path, "00000000\n").unwrap();
            }
        }
    })
}

fn tests(fixture: &Fixture) -> TestList {
    let mut tests = TestList::new();
    fixture.add_test(&mut tests, "add-01", "rv32i_m/I", "RV32I");
    fixture.add_test(&mut tests, "sub-01", "rv32i_m/I", "RV32I");
    fixture.add_test(&mut tests, "cadd-01", "rv32i_m/C", "RV32IC");
    tests
}

fn built(fixture: &Fixture, extra: &str, runner: &MockRunner) -> TargetAdapter<SailCSim> {
    let table = fixture.table(extra);
    let mut adapter =
        TargetAdapter::construct(SailCSim, "sail_cSim", Role::Reference, Some(&table)).unwrap();
    adapter
        .initialise(&fixture.suite, &fixture.work, &fixture.env, runner)
        .unwrap();
    adapter.build(&fixture.isa_yaml, None).unwrap();
    adapter
}

#[test]
fn test_make_scheduler() {
    let fixture = Fixture::new();
    let tests = tests(&fixture);
    let runner = MockRunner::new();
    let mut adapter = built(&fixture, "jobs = 2", &runner);
    assert!(runner.calls().is_empty());

    let outcome = adapter.run_tests(&tests, None, &runner).unwrap();

    let makefile = fixture.work.join("Makefile.Reference-sail_cSim");
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, fixture.bin_tool("make"));
    assert_eq!(
        calls[0].args,
        ["-j2", "-f", makefile.display().to_string().as_str(), "all"]
    );

    let contents = std::fs::read_to_string(&makefile).unwrap();
    assert!(contents.starts_with("all: TARGET0 TARGET1 TARGET2\n"));
    let recipe = contents
        .lines()
        .find(|line| line.starts_with(&format!("\t@cd {}", fixture.work.join("cadd-01").display())))
        .unwrap();
    assert!(recipe.contains(" -march=rv32ic -mabi=ilp32 "));
    assert!(recipe.contains(&format!("; {} -D ref.elf > ref.disass;", fixture.bin_tool("objdump"))));
    assert!(recipe.contains(&format!(
        "; {} --pmp-count=16 --pmp-grain=0 --enable-zcb --enable-bitmanip --enable-zfinx \
         --test-signature={} ref.elf > cadd-01.log 2>&1",
        fixture.bin_tool("riscv_sim_rv32d"),
        fixture
            .work
            .join("cadd-01/Reference-sail_cSim.signature")
            .display()
    )));
    assert!(!recipe.contains(" -g "));

    // make was never really run, so nothing left a signature
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.executed, 3);
    assert_eq!(summary.missing_signatures, ["add-01", "sub-01", "cadd-01"]);
    assert!(matches!(adapter.state(), States::Done));
}

#[test]
fn test_pool_scheduler_with_coverage() {
    let fixture = Fixture::new();
    let tests = tests(&fixture);
    let runner = sail_runner();
    let mut adapter = built(&fixture, "jobs = 3\nscheduler = \"pool\"", &runner);
    let cgf = [fixture.suite.join("dataset.cgf")];

    let outcome = adapter.run_tests(&tests, Some(cgf.as_slice()), &runner).unwrap();

    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert!(summary.missing_signatures.is_empty());
    assert!(!fixture.work.join("Makefile.Reference-sail_cSim").exists());

    let calls = runner.calls();
    assert_eq!(calls.len(), 4 * 3);
    for (id, entry) in tests.iter() {
        let steps: Vec<_> = calls
            .iter()
            .filter(|c| c.cwd.as_deref() == Some(entry.work_dir.as_path()))
            .collect();
        assert_eq!(steps.len(), 4, "{id}");
        assert_eq!(steps[0].program, fixture.bin_tool("gcc"));
        assert_eq!(steps[1].program, fixture.bin_tool("objdump"));
        assert_eq!(steps[2].program, fixture.bin_tool("riscv_sim_rv32d"));
        assert_eq!(steps[3].program, "riscv_isac");
        assert!(steps[3].line.contains(&format!(
            "-t {id}.log --parser-name c_sail -o coverage.rpt"
        )));
        assert!(steps[3]
            .line
            .ends_with(&format!("-x32 -l {}", entry.coverage_labels[0])));
        assert!(entry.work_dir.join("Reference-sail_cSim.signature").is_file());
    }
}

#[test]
fn test_compile_only() {
    let fixture = Fixture::new();
    let tests = tests(&fixture);
    let runner = sail_runner();
    let mut adapter = built(&fixture, "scheduler = \"pool\"\ntarget_run = 0", &runner);

    let outcome = adapter.run_tests(&tests, None, &runner).unwrap();
    assert_eq!(outcome, RunOutcome::CompiledOnly { compiled: 3 });
    assert!(matches!(adapter.state(), States::AbortedNoRun));

    let calls = runner.calls();
    assert_eq!(calls.len(), 2 * 3);
    assert!(calls.iter().all(|c| !c.program.contains("riscv_sim")));
}

#[test]
fn test_missing_simulator() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.bin.join("riscv_sim_rv32d")).unwrap();
    let table = fixture.table("");
    let mut adapter =
        TargetAdapter::construct(SailCSim, "sail_cSim", Role::Reference, Some(&table)).unwrap();
    let runner = MockRunner::new();
    adapter
        .initialise(&fixture.suite, &fixture.work, &fixture.env, &runner)
        .unwrap();

    match adapter.build(&fixture.isa_yaml, None).unwrap_err() {
        AdapterError::MissingExecutable { role, name } => {
            assert_eq!(role, "simulator");
            assert_eq!(name, fixture.bin_tool("riscv_sim_rv32d"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_run_target() {
    let fixture = Fixture::new();
    let tests = tests(&fixture);
    let runner = sail_runner();
    let table = fixture.table("scheduler = \"pool\"");
    let request = RunRequest {
        suite_dir: fixture.suite.clone(),
        work_dir: fixture.work.clone(),
        arch_env_dir: fixture.env.clone(),
        ..Default::default()
    };

    let outcome = run_target(
        BackendKind::SailCSim,
        "sail_cSim",
        Role::Reference,
        Some(&table),
        &request,
        &tests,
        &runner,
    )
    .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(ref s) if s.missing_signatures.is_empty()));
}

#[test]
fn test_run_target_needs_isa_spec() {
    let fixture = Fixture::new();
    let mut table = fixture.table("");
    table.remove("ispec");
    let request = RunRequest {
        suite_dir: fixture.suite.clone(),
        work_dir: fixture.work.clone(),
        arch_env_dir: fixture.env.clone(),
        ..Default::default()
    };

    let err = run_target(
        BackendKind::SailCSim,
        "sail_cSim",
        Role::Reference,
        Some(&table),
        &request,
        &TestList::new(),
        &MockRunner::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AdapterError::Config(ConfigError::Invalid { key: "ispec", .. })
    ));

    // given on the command line instead
    let request = RunRequest {
        isa_spec: Some(fixture.isa_yaml.clone()),
        ..request
    };
    let outcome = run_target(
        BackendKind::SailCSim,
        "sail_cSim",
        Role::Reference,
        Some(&table),
        &request,
        &TestList::new(),
        &MockRunner::new(),
    )
    .unwrap();
    assert_eq!(outcome, RunOutcome::Completed(Default::default()));
}

#[test]
fn test_missing_section() {
    let err = run_target(
        BackendKind::Neorv32,
        "neorv32",
        Role::Dut,
        None,
        &RunRequest::default(),
        &TestList::new(),
        &MockRunner::new(),
    )
    .unwrap_err();
    assert!(matches!(err, AdapterError::Config(ConfigError::Missing(_))));
}
