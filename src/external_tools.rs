use crate::cli::ToolPaths;
use crate::errors::{AppError, Result};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

pub const DEFAULT_BAMSURGEON_ADDSNV: &str = "/opt/bamsurgeon/bin/addsnv.py";

/// Which external step a process belongs to. Shown in failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BwaIndex,
    Simulate,
    Align,
    Convert,
    Sort,
    Index,
    Neat,
    VarSim,
    BamSurgeon,
    Install,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BwaIndex => "reference index (bwa index)",
            Self::Simulate => "read simulation (wgsim)",
            Self::Align => "alignment (bwa mem)",
            Self::Convert => "SAM to BAM conversion (samtools view)",
            Self::Sort => "coordinate sort (samtools sort)",
            Self::Index => "BAM index (samtools index)",
            Self::Neat => "variant injection (NEAT)",
            Self::VarSim => "variant simulation (VarSim)",
            Self::BamSurgeon => "variant injection (BamSurgeon)",
            Self::Install => "tool install",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTools {
    pub wgsim: String,
    pub bwa: String,
    pub samtools: String,
    pub neat: String,
    pub varsim: String,
    pub python: String,
    pub bamsurgeon_addsnv: String,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            wgsim: "wgsim".to_string(),
            bwa: "bwa".to_string(),
            samtools: "samtools".to_string(),
            neat: "neat-genreads.py".to_string(),
            varsim: "varsim".to_string(),
            python: "python3".to_string(),
            bamsurgeon_addsnv: DEFAULT_BAMSURGEON_ADDSNV.to_string(),
        }
    }
}

/// A program plus its argument list, built before anything is spawned so the
/// exact command line can be logged and inspected in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(&mut self, value: impl Into<String>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    pub fn flag_value(&mut self, flag: &str, value: impl ToString) -> &mut Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ExternalTools {
    pub fn from_args(paths: &ToolPaths) -> Self {
        Self {
            wgsim: paths.wgsim.clone(),
            bwa: paths.bwa.clone(),
            samtools: paths.samtools.clone(),
            neat: paths.neat.clone(),
            varsim: paths.varsim.clone(),
            python: paths.python.clone(),
            bamsurgeon_addsnv: paths.bamsurgeon_addsnv.clone(),
        }
    }

    /// Runs `invocation` to completion. When `stdout_path` is given the
    /// child's stdout is written there, otherwise it is captured and dropped.
    pub fn run(
        &self,
        stage: Stage,
        invocation: &ToolInvocation,
        stdout_path: Option<&Path>,
    ) -> Result<()> {
        let command_line = invocation.command_line();
        debug!(stage = %stage, command = %command_line, "running external command");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(path) = stdout_path {
            command.stdout(Stdio::from(File::create(path)?));
        } else {
            command.stdout(Stdio::piped());
        }

        let output = command.output().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AppError::CommandNotFound {
                    command: invocation.program.clone(),
                }
            } else {
                AppError::Io(err)
            }
        })?;

        if !output.status.success() {
            return Err(AppError::StageFailed {
                stage,
                command: command_line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        Ok(())
    }

    pub fn exists_command(&self, cmd: &str) -> bool {
        if cmd.contains(std::path::MAIN_SEPARATOR) {
            return is_executable(Path::new(cmd));
        }
        std::env::var_os("PATH").is_some_and(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(cmd))
                .any(|full| is_executable(&full))
        })
    }

    pub fn warn_missing(&self, commands: &[&str]) {
        for command in commands {
            if !self.exists_command(command) {
                warn!(tool = %command, "tool not found on PATH; its stage will fail");
            }
        }
    }

    /// Attempts `<installer> install <tool>` for every tool not on PATH.
    /// Installer failures are logged and the loop moves on; the call only
    /// fails if some tool is still missing at the end.
    pub fn install_tools(&self, names: &[String], installer: &str) -> Result<()> {
        if names.is_empty() {
            info!("no tools specified; example usage: bamboozler install-tools neat varsim");
            return Ok(());
        }

        let mut unavailable = Vec::new();
        for tool in names {
            if self.exists_command(tool) {
                info!(tool = %tool, "tool already installed");
                continue;
            }

            warn!(tool = %tool, installer = %installer, "tool not found; attempting install");
            let invocation = ToolInvocation::new(installer, ["install", tool.as_str()]);
            if let Err(err) = self.run(Stage::Install, &invocation, None) {
                error!(tool = %tool, error = %err, "install attempt failed");
            }

            if self.exists_command(tool) {
                info!(tool = %tool, "tool installed");
            } else {
                error!(tool = %tool, "tool still not found after install attempt");
                unavailable.push(tool.clone());
            }
        }

        if unavailable.is_empty() {
            Ok(())
        } else {
            Err(AppError::ToolsUnavailable { tools: unavailable })
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
