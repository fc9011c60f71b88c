//! Process-backed transformer and optimizer
//!
//! The code is piped through an external command: written to its stdin,
//! read back from its stdout. The process runs on its own thread, so several
//! commands can be in flight at once. Anything that goes wrong is turned into
//! a diagnostic, so a broken tool degrades to "code left unchanged".

use std::{
    io::{ErrorKind, Write},
    process::{Command, Stdio},
};

use async_trait::async_trait;
use log::debug;

use crate::{
    blocking::run_blocking,
    config::SourceTarget,
    diagnostics::Diagnostic,
    host::{DownlevelTransformer, OptimizeOutput, Optimizer, TransformOutput},
};

/// Environment variable carrying the target language level to the command
pub const TARGET_ENV: &str = "LAZYPACK_TARGET";

#[derive(Debug, Clone)]
pub struct CommandFilter {
    header: &'static str,
    command: Vec<String>,
}

impl CommandFilter {
    /// `command` is the program followed by its arguments
    pub fn new(header: &'static str, command: Vec<String>) -> Self {
        Self { header, command }
    }

    /// Pipe `code` through the command on a dedicated thread
    pub async fn run(&self, code: &str, target: SourceTarget) -> Result<String, Diagnostic> {
        let filter = self.clone();
        let code = code.to_owned();
        run_blocking(move || filter.run_sync(&code, target))
            .await
            .map_err(|_| Diagnostic::error(self.header, "command runner panicked"))?
    }

    fn run_sync(&self, code: &str, target: SourceTarget) -> Result<String, Diagnostic> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(Diagnostic::error(self.header, "empty command"));
        };
        debug!("Running {} command: {}", self.header, self.command.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .env(TARGET_ENV, target.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Diagnostic::error(self.header, format!("failed to spawn '{program}': {e}"))
            })?;

        // Feed stdin from a scoped thread so a child that streams its output
        // cannot block on a full stdout pipe while we are still writing.
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(code.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        match written {
            Ok(Ok(())) => {}
            // The child is free to exit without reading its input
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(Diagnostic::error(self.header, format!("failed to write stdin: {e}")));
            }
            Err(_) => return Err(Diagnostic::error(self.header, "stdin writer panicked")),
        }

        let output = output.map_err(|e| {
            Diagnostic::error(self.header, format!("failed to wait for '{program}': {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Diagnostic::error(
                self.header,
                format!("'{program}' exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        String::from_utf8(output.stdout).map_err(|e| {
            Diagnostic::error(self.header, format!("'{program}' wrote invalid UTF-8: {e}"))
        })
    }
}

#[async_trait]
impl DownlevelTransformer for CommandFilter {
    async fn transform(&self, code: &str, target: SourceTarget) -> TransformOutput {
        match self.run(code, target).await {
            Ok(code) => TransformOutput {
                code,
                diagnostics: Vec::new(),
            },
            Err(diagnostic) => TransformOutput {
                code: code.to_owned(),
                diagnostics: vec![diagnostic],
            },
        }
    }
}

#[async_trait]
impl Optimizer for CommandFilter {
    async fn optimize(&self, code: &str, target: SourceTarget) -> OptimizeOutput {
        match self.run(code, target).await {
            Ok(output) => OptimizeOutput {
                output: Some(output),
                diagnostics: Vec::new(),
            },
            Err(diagnostic) => OptimizeOutput {
                output: None,
                diagnostics: vec![diagnostic],
            },
        }
    }
}

/// Stand-in used when no command is configured for a stage
///
/// Reports a warning and never changes the code.
#[derive(Debug, Clone, Copy)]
pub struct Unavailable {
    header: &'static str,
}

impl Unavailable {
    pub fn new(header: &'static str) -> Self {
        Self { header }
    }

    fn diagnostic(self, target: SourceTarget) -> Diagnostic {
        Diagnostic::warning(
            self.header,
            format!("no command configured for target {}, code left unchanged", target.as_str()),
        )
    }
}

#[async_trait]
impl DownlevelTransformer for Unavailable {
    async fn transform(&self, code: &str, target: SourceTarget) -> TransformOutput {
        TransformOutput {
            code: code.to_owned(),
            diagnostics: vec![self.diagnostic(target)],
        }
    }
}

#[async_trait]
impl Optimizer for Unavailable {
    async fn optimize(&self, _code: &str, target: SourceTarget) -> OptimizeOutput {
        OptimizeOutput {
            output: None,
            diagnostics: vec![self.diagnostic(target)],
        }
    }
}
