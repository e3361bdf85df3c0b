// Licensed under the Apache-2.0 license
#![allow(dead_code)]

use compliance_runner::{CommandLine, CommandRunner, TestEntry, TestList};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const ISA_YAML: &str = "\
hart_ids: [0]
hart0:
  ISA: RV32IMCZicsr_Zifencei
  supported_xlen: [32]
";

#[derive(Clone, Debug)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub line: String,
}

impl Call {
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

pub type Hook = Box<dyn Fn(&CommandLine, Option<&Path>) + Send + Sync>;

/// Records every command instead of running it. The hook stands in for the
/// side effects of the real tools.
pub struct MockRunner {
    calls: Mutex<Vec<Call>>,
    hook: Option<Hook>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(vec![]),
            hook: None,
        }
    }

    pub fn with_hook(hook: impl Fn(&CommandLine, Option<&Path>) + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(vec![]),
            hook: Some(Box::new(hook)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &CommandLine, cwd: Option<&Path>) -> std::io::Result<bool> {
        if let Some(hook) = &self.hook {
            hook(cmd, cwd);
        }
        self.calls.lock().unwrap().push(Call {
            program: cmd.program().to_string(),
            args: cmd.get_args().to_vec(),
            cwd: cwd.map(Path::to_path_buf),
            line: cmd.to_shell(),
        });
        Ok(true)
    }
}

/// A scratch tree with a plugin, a suite, a work directory, a simulation
/// directory and fake tools.
pub struct Fixture {
    pub root: TempDir,
    pub plugin: PathBuf,
    pub suite: PathBuf,
    pub env: PathBuf,
    pub work: PathBuf,
    pub sim: PathBuf,
    pub bin: PathBuf,
    pub isa_yaml: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();

        let root = tempfile::tempdir().unwrap();
        let dir = |name: &str| {
            let path = root.path().join(name);
            std::fs::create_dir_all(&path).unwrap();
            path
        };
        let plugin = dir("plugin");
        std::fs::create_dir_all(plugin.join("env")).unwrap();
        std::fs::write(plugin.join("env/link.ld"), "").unwrap();
        let suite = dir("suite");
        let env = dir("suite/env");
        let work = dir("work");
        let sim = dir("rtl/sim");
        let bin = dir("bin");
        let isa_yaml = plugin.join("isa.yaml");
        std::fs::write(&isa_yaml, ISA_YAML).unwrap();

        let fixture = Self {
            root,
            plugin,
            suite,
            env,
            work,
            sim,
            bin,
            isa_yaml,
        };
        for tool in ["gcc", "objdump", "make", "riscv_sim_rv32d"] {
            fixture.tool(tool);
        }
        fixture
    }

    /// Creates an executable that does nothing.
    pub fn tool(&self, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.bin.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Adds a test with its source and work directory, the way the harness
    /// lays them out.
    pub fn add_test(&self, tests: &mut TestList, id: &str, group: &str, isa: &str) {
        let src = self.suite.join(group).join("src");
        std::fs::create_dir_all(&src).unwrap();
        let test_path = src.join(format!("{id}.S"));
        std::fs::write(&test_path, "").unwrap();
        let work_dir = self.work.join(id);
        std::fs::create_dir_all(&work_dir).unwrap();
        tests.push(
            id,
            TestEntry {
                test_path,
                work_dir,
                macros: vec!["TEST_CASE_1=True".into(), "XLEN=32".into()],
                isa: isa.into(),
                coverage_labels: vec![id.split('-').next().unwrap().into()],
            },
        );
    }

    /// Backend section pointing every tool at the fakes in `bin/`.
    pub fn table(&self, extra: &str) -> toml::Table {
        let bin = self.bin.display();
        let config = format!(
            "pluginpath = \"{}\"\n\
             ispec = \"{}\"\n\
             PATH = \"{bin}\"\n\
             compiler = \"{bin}/gcc\"\n\
             objdump = \"{bin}/objdump\"\n\
             make = \"{bin}/make\"\n\
             sim_dir = \"{}\"\n\
             {extra}\n",
            self.plugin.display(),
            self.isa_yaml.display(),
            self.sim.display(),
        );
        toml::from_str(&config).unwrap()
    }

    pub fn bin_tool(&self, name: &str) -> String {
        self.bin.join(name).display().to_string()
    }
}
