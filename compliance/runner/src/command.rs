// Licensed under the Apache-2.0 license

use compliance_isa::{relocation_define, Xlen};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// Output redirection of a command, relative to its working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redirect {
    /// `> file`
    Stdout(PathBuf),
    /// `> file 2>&1`
    All(PathBuf),
}

/// A program invocation as an ordered list of arguments. It can be spawned
/// directly or rendered into a shell line for a makefile recipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    redirect: Option<Redirect>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            redirect: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Renders the command for `sh`, quoting arguments where needed.
    pub fn to_shell(&self) -> String {
        let mut line = shell_quote(&self.program).into_owned();
        for arg in self.args.iter() {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        match &self.redirect {
            Some(Redirect::Stdout(path)) => {
                line.push_str(" > ");
                line.push_str(&shell_quote(&path.display().to_string()));
            }
            Some(Redirect::All(path)) => {
                line.push_str(" > ");
                line.push_str(&shell_quote(&path.display().to_string()));
                line.push_str(" 2>&1");
            }
            None => {}
        }
        line
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

pub(crate) fn shell_quote(s: &str) -> Cow<'_, str> {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

/// Compiler invocation shared by every test of a target. Only the march,
/// macros, source and output vary per test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileTemplate {
    compiler: String,
    abi: &'static str,
    fixed: Vec<String>,
}

impl CompileTemplate {
    pub fn new(
        compiler: impl Into<String>,
        xlen: Xlen,
        debug_info: bool,
        plugin_env: &Path,
        arch_env: &Path,
    ) -> Self {
        let mut fixed: Vec<String> = [
            "-static",
            "-mcmodel=medany",
            "-fvisibility=hidden",
            "-nostdlib",
            "-nostartfiles",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        if debug_info {
            fixed.push("-g".into());
        }
        fixed.push("-T".into());
        fixed.push(plugin_env.join("link.ld").display().to_string());
        fixed.push("-I".into());
        fixed.push(format!("{}/", plugin_env.display()));
        fixed.push("-I".into());
        fixed.push(arch_env.display().to_string());
        fixed.push(relocation_define());
        Self {
            compiler: compiler.into(),
            abi: xlen.abi(),
            fixed,
        }
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn instantiate(
        &self,
        march: &str,
        source: &Path,
        output: &str,
        macros: &[String],
    ) -> CommandLine {
        CommandLine::new(self.compiler.as_str())
            .arg(format!("-march={march}"))
            .arg(format!("-mabi={}", self.abi))
            .args(self.fixed.iter().cloned())
            .args(macros.iter().map(|m| format!("-D{m}")))
            .path_arg(source)
            .args(["-o", output])
    }
}
