// Licensed under the Apache-2.0 license

use crate::command::{CommandLine, Redirect};
use log::{debug, warn};
use std::fs::File;
use std::path::Path;
use std::process::Command;

/// Runs commands on behalf of the adapters.
///
/// Implementations report whether the command exited successfully. A
/// non-zero exit is not an error here: the harness judges a test by its
/// signature. Failing to start the program at all is.
pub trait CommandRunner: Sync {
    fn run(&self, cmd: &CommandLine, cwd: Option<&Path>) -> std::io::Result<bool>;
}

/// Spawns real child processes and waits for them.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine, cwd: Option<&Path>) -> std::io::Result<bool> {
        match cwd {
            Some(dir) => debug!("Executing in {}: {cmd}", dir.display()),
            None => debug!("Executing: {cmd}"),
        }
        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        match cmd.get_redirect() {
            Some(Redirect::Stdout(path)) => {
                command.stdout(File::create(resolve(cwd, path))?);
            }
            Some(Redirect::All(path)) => {
                let file = File::create(resolve(cwd, path))?;
                command.stdout(file.try_clone()?).stderr(file);
            }
            None => {}
        }

        let status = command.status()?;
        if !status.success() {
            warn!("{} exited with {status}", cmd.program());
        }
        Ok(status.success())
    }
}

fn resolve(cwd: Option<&Path>, path: &Path) -> std::path::PathBuf {
    match cwd {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
