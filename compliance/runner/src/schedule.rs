// Licensed under the Apache-2.0 license

use crate::command::{shell_quote, CommandLine};
use crate::error::AdapterError;
use crate::exec::CommandRunner;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;

/// The commands of one test, run in order from its work directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub work_dir: PathBuf,
    pub steps: Vec<CommandLine>,
}

impl Job {
    pub fn new(id: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            work_dir: work_dir.into(),
            steps: vec![],
        }
    }

    pub fn step(mut self, cmd: CommandLine) -> Self {
        self.steps.push(cmd);
        self
    }

    /// A failing step does not stop the job; later steps still run, the way
    /// `;` chains them in a recipe.
    fn run(&self, runner: &dyn CommandRunner) -> Result<(), AdapterError> {
        for step in self.steps.iter() {
            let ok = runner
                .run(step, Some(&self.work_dir))
                .map_err(AdapterError::io(format!("{}: {}", self.id, step.program())))?;
            if !ok {
                warn!("{}: {} failed", self.id, step.program());
            }
        }
        Ok(())
    }

    /// `@cd <dir>; step; step`
    fn recipe(&self) -> String {
        let mut recipe = format!("@cd {}", shell_quote(&self.work_dir.display().to_string()));
        for step in self.steps.iter() {
            recipe.push_str("; ");
            recipe.push_str(&step.to_shell());
        }
        recipe
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobBatch {
    jobs: Vec<Job>,
}

impl JobBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Runs a batch of independent jobs, returning once all of them finished.
pub trait Scheduler {
    fn execute(&self, batch: &JobBatch, runner: &dyn CommandRunner) -> Result<(), AdapterError>;
}

/// Writes the batch into a makefile with one target per job and lets
/// `make -j<jobs>` run it.
#[derive(Clone, Debug)]
pub struct MakeScheduler {
    pub make: String,
    pub jobs: usize,
    pub makefile: PathBuf,
}

impl MakeScheduler {
    pub fn new(make: impl Into<String>, jobs: usize, makefile: impl Into<PathBuf>) -> Self {
        Self {
            make: make.into(),
            jobs,
            makefile: makefile.into(),
        }
    }

    pub fn render(batch: &JobBatch) -> String {
        let targets: Vec<String> = (0..batch.len()).map(|n| format!("TARGET{n}")).collect();
        let mut makefile = format!("all: {}\n", targets.join(" "));
        for (target, job) in targets.iter().zip(batch.jobs()) {
            makefile.push_str(&format!(
                "\n{target}:\n\t{}\n",
                job.recipe().replace('$', "$$")
            ));
        }
        makefile
    }

    fn command(&self) -> CommandLine {
        CommandLine::new(self.make.as_str())
            .arg(format!("-j{}", self.jobs))
            .arg("-f")
            .path_arg(&self.makefile)
            .arg("all")
    }

    fn cwd(&self) -> Option<&Path> {
        self.makefile
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}

impl Scheduler for MakeScheduler {
    fn execute(&self, batch: &JobBatch, runner: &dyn CommandRunner) -> Result<(), AdapterError> {
        std::fs::write(&self.makefile, Self::render(batch)).map_err(AdapterError::io(format!(
            "writing {}",
            self.makefile.display()
        )))?;
        info!(
            "Running {} jobs from {} with {} parallel",
            batch.len(),
            self.makefile.display(),
            self.jobs
        );
        let cmd = self.command();
        runner
            .run(&cmd, self.cwd())
            .map_err(AdapterError::io(cmd.program().to_string()))?;
        Ok(())
    }
}

/// Runs the batch on a fixed number of threads pulling jobs off a channel.
#[derive(Clone, Copy, Debug)]
pub struct PoolScheduler {
    pub workers: usize,
}

impl PoolScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

fn worker(
    n: usize,
    queue: &Mutex<Receiver<&Job>>,
    runner: &dyn CommandRunner,
) -> Result<(), AdapterError> {
    loop {
        let next = match queue.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => return Err(AdapterError::WorkerPanicked),
        };
        let Ok(job) = next else {
            debug!("worker {n}: queue drained");
            return Ok(());
        };
        debug!("worker {n}: {}", job.id);
        job.run(runner)?;
    }
}

impl Scheduler for PoolScheduler {
    fn execute(&self, batch: &JobBatch, runner: &dyn CommandRunner) -> Result<(), AdapterError> {
        let (tx, rx) = mpsc::channel::<&Job>();
        for job in batch.jobs() {
            if tx.send(job).is_err() {
                break;
            }
        }
        drop(tx);

        let queue = Mutex::new(rx);
        let workers = self.workers.min(batch.len()).max(1);
        info!("Running {} jobs on {workers} threads", batch.len());

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|n| {
                    let queue = &queue;
                    s.spawn(move || worker(n, queue, runner))
                })
                .collect();

            let mut result = Ok(());
            for handle in handles {
                let joined = match handle.join() {
                    Ok(res) => res,
                    Err(_) => Err(AdapterError::WorkerPanicked),
                };
                if let Err(e) = joined {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            result
        })
    }
}
