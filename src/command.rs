// src/command.rs
// Runs the external OpenSSH tools (ssh-keygen, ssh-copy-id, ssh, scp).

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tracing::{debug, info, warn};

use crate::errors::{SetupError, SetupResult};

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Inherit the terminal so the child can prompt (passwords, host keys, shells).
    pub interactive: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            interactive: false,
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

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Exit status and captured output. Interactive commands leave the output empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> SetupResult<CommandOutput>;

    /// Like `run`, but a non-zero exit becomes `SetupError::CommandFailed`.
    async fn run_checked(&self, spec: &CommandSpec) -> SetupResult<CommandOutput> {
        let output = self.run(spec).await?;
        if output.success() {
            Ok(output)
        } else {
            if !output.stderr.trim().is_empty() {
                warn!("`{}` stderr: {}", spec.program, output.stderr.trim_end());
            }
            Err(SetupError::CommandFailed {
                program: spec.program.clone(),
                code: output.code,
            })
        }
    }
}

/// Spawns real processes. Children are killed if the awaiting future is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> SetupResult<CommandOutput> {
        info!("Running: {}", spec);
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args).kill_on_drop(true);

        let spawn_err = |source| SetupError::CommandSpawn {
            program: spec.program.clone(),
            source,
        };

        let output = if spec.interactive {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(spawn_err)?;
            CommandOutput {
                code: status.code(),
                ..Default::default()
            }
        } else {
            let out = cmd.stdin(Stdio::null()).output().await.map_err(spawn_err)?;
            CommandOutput {
                code: out.status.code(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }
        };

        debug!("`{}` exited with {:?}", spec.program, output.code);
        Ok(output)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records every command and fakes the file effects of `ssh-keygen` and `scp`.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        failures: HashMap<String, i32>,
        hang_on: Option<String>,
        effects_on_failure: bool,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_on(mut self, program: &str, code: i32) -> Self {
            self.failures.insert(program.to_string(), code);
            self
        }

        /// Failing programs still write their outputs first, like an aborted transfer.
        pub fn leave_partial_output(mut self) -> Self {
            self.effects_on_failure = true;
            self
        }

        /// The named program writes its outputs, then never finishes, like a child
        /// cut off by Ctrl+C halfway through.
        pub fn hang_on(mut self, program: &str) -> Self {
            self.hang_on = Some(program.to_string());
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.program).collect()
        }

        fn fake_effects(spec: &CommandSpec) {
            match spec.program.as_str() {
                "ssh-keygen" => {
                    if let Some(pos) = spec.args.iter().position(|a| a == "-f") {
                        let key = &spec.args[pos + 1];
                        std::fs::write(key, "PRIVATE\n").unwrap();
                        std::fs::write(format!("{}.pub", key), "ssh-rsa AAAA test\n")
                            .unwrap();
                    }
                }
                "scp" => {
                    let (src, dest) = (&spec.args[2], &spec.args[3]);
                    std::fs::write(Path::new(dest), format!("copied from {}\n", src))
                        .unwrap();
                }
                _ => {}
            }
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> SetupResult<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());
            if self.hang_on.as_deref() == Some(spec.program.as_str()) {
                Self::fake_effects(spec);
                return std::future::pending().await;
            }
            if let Some(code) = self.failures.get(&spec.program) {
                if self.effects_on_failure {
                    Self::fake_effects(spec);
                }
                return Ok(CommandOutput {
                    code: Some(*code),
                    ..Default::default()
                });
            }
            Self::fake_effects(spec);
            Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            })
        }
    }
}
