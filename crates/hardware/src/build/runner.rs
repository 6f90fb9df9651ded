//! External program execution.
//!
//! Every external tool (toolchain, conversion script, programmer) is started
//! through the [`ToolRunner`] trait so the controller can be exercised without
//! the tools installed.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use crate::common::{Result, SocError};

/// A program, its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program name, resolved on `PATH`.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    /// Starts an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How an external program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ToolStatus {
    /// Exited with code 0.
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Starts external programs and waits for them.
pub trait ToolRunner {
    /// Runs `invocation` to completion.
    ///
    /// # Errors
    ///
    /// [`SocError::ExternalToolFailure`] if the program cannot be found or started.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolStatus>;
}

/// Runs `invocation` and turns a non-zero exit into [`SocError::ExternalToolFailure`].
pub fn run_checked(runner: &dyn ToolRunner, invocation: &ToolInvocation) -> Result<()> {
    info!(command = %invocation, "running");
    let status = runner.run(invocation)?;
    if status.success() {
        return Ok(());
    }
    Err(SocError::ExternalToolFailure {
        tool: invocation.program.clone(),
        detail: match status.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        },
    })
}

/// Runs programs on the host, resolved through `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolStatus> {
        let program =
            which::which(&invocation.program).map_err(|e| SocError::ExternalToolFailure {
                tool: invocation.program.clone(),
                detail: format!("not found on PATH: {e}"),
            })?;
        debug!(path = %program.display(), "resolved tool");

        let mut command = Command::new(&program);
        let _ = command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            let _ = command.current_dir(dir);
        }
        let status = command
            .status()
            .map_err(|e| SocError::ExternalToolFailure {
                tool: invocation.program.clone(),
                detail: format!("failed to start: {e}"),
            })?;
        Ok(ToolStatus {
            code: status.code(),
        })
    }
}
