//! Test process launching
//!
//! [`CommandLauncher`] turns a [`RunRequest`] into a build-tool command line,
//! spawns it, and watches it from a dedicated thread. The exit callback runs
//! on that thread exactly once, whatever the outcome.

use std::process::Command;
use std::thread::JoinHandle;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{RunRequest, RunScope};
use crate::session::TestPattern;

/// Environment variable JVM options are exported in by default. Forked test
/// JVMs pick it up as well.
pub const DEFAULT_OPTIONS_ENV: &str = "JAVA_TOOL_OPTIONS";

/// JVM options for test processes: assertions on, and the JDK packages
/// reflection-heavy test frameworks reach into opened.
pub const DEFAULT_JVM_OPTIONS: &[&str] = &[
    "-ea",
    "--add-opens java.base/java.io=ALL-UNNAMED",
    "--add-opens java.base/java.lang=ALL-UNNAMED",
    "--add-opens java.base/java.lang.annotation=ALL-UNNAMED",
    "--add-opens java.base/java.lang.constant=ALL-UNNAMED",
    "--add-opens java.base/java.lang.invoke=ALL-UNNAMED",
    "--add-opens java.base/java.lang.module=ALL-UNNAMED",
    "--add-opens java.base/java.lang.ref=ALL-UNNAMED",
    "--add-opens java.base/java.lang.reflect=ALL-UNNAMED",
    "--add-opens java.base/java.lang.runtime=ALL-UNNAMED",
    "--add-opens java.base/java.math=ALL-UNNAMED",
    "--add-opens java.base/java.net=ALL-UNNAMED",
    "--add-opens java.base/java.net.spi=ALL-UNNAMED",
    "--add-opens java.base/java.nio=ALL-UNNAMED",
    "--add-opens java.base/java.nio.channels=ALL-UNNAMED",
    "--add-opens java.base/java.nio.channels.spi=ALL-UNNAMED",
    "--add-opens java.base/java.nio.charset=ALL-UNNAMED",
    "--add-opens java.base/java.nio.charset.spi=ALL-UNNAMED",
    "--add-opens java.base/java.nio.file=ALL-UNNAMED",
    "--add-opens java.base/java.nio.file.attribute=ALL-UNNAMED",
    "--add-opens java.base/java.nio.file.spi=ALL-UNNAMED",
    "--add-opens java.base/java.security=ALL-UNNAMED",
    "--add-opens java.base/java.security.cert=ALL-UNNAMED",
    "--add-opens java.base/java.security.interfaces=ALL-UNNAMED",
    "--add-opens java.base/java.security.spec=ALL-UNNAMED",
    "--add-opens java.base/java.text=ALL-UNNAMED",
    "--add-opens java.base/java.text.spi=ALL-UNNAMED",
    "--add-opens java.base/java.time=ALL-UNNAMED",
    "--add-opens java.base/java.time.chrono=ALL-UNNAMED",
    "--add-opens java.base/java.time.format=ALL-UNNAMED",
    "--add-opens java.base/java.time.temporal=ALL-UNNAMED",
    "--add-opens java.base/java.time.zone=ALL-UNNAMED",
    "--add-opens java.base/java.util=ALL-UNNAMED",
    "--add-opens java.base/java.util.concurrent=ALL-UNNAMED",
    "--add-opens java.base/java.util.concurrent.atomic=ALL-UNNAMED",
    "--add-opens java.base/java.util.concurrent.locks=ALL-UNNAMED",
    "--add-opens java.base/java.util.function=ALL-UNNAMED",
    "--add-opens java.base/java.util.jar=ALL-UNNAMED",
    "--add-opens java.base/java.util.random=ALL-UNNAMED",
    "--add-opens java.base/java.util.regex=ALL-UNNAMED",
    "--add-opens java.base/java.util.spi=ALL-UNNAMED",
    "--add-opens java.base/java.util.stream=ALL-UNNAMED",
    "--add-opens java.base/java.util.zip=ALL-UNNAMED",
    "--add-opens java.base/javax.crypto=ALL-UNNAMED",
    "--add-opens java.base/javax.crypto.interfaces=ALL-UNNAMED",
    "--add-opens java.base/javax.crypto.spec=ALL-UNNAMED",
    "--add-opens java.base/javax.net=ALL-UNNAMED",
    "--add-opens java.base/javax.net.ssl=ALL-UNNAMED",
    "--add-opens java.base/javax.security.auth=ALL-UNNAMED",
    "--add-opens java.base/javax.security.auth.callback=ALL-UNNAMED",
    "--add-opens java.base/javax.security.auth.login=ALL-UNNAMED",
    "--add-opens java.base/javax.security.auth.spi=ALL-UNNAMED",
    "--add-opens java.base/javax.security.auth.x500=ALL-UNNAMED",
    "--add-opens java.base/javax.security.cert=ALL-UNNAMED",
    "--add-opens java.xml/com.sun.org.apache.xerces.internal.parsers=ALL-UNNAMED",
    "--add-opens java.xml/com.sun.org.apache.xerces.internal.util=ALL-UNNAMED",
    "--add-opens java.base/jdk.internal.ref=ALL-UNNAMED",
    "--add-opens java.base/sun.net.www=ALL-UNNAMED",
    "--add-opens java.base/sun.nio.ch=ALL-UNNAMED",
    "--add-opens java.base/sun.net.www.protocol.https=ALL-UNNAMED",
    "--add-opens java.base/sun.util.calendar=ALL-UNNAMED",
    "--add-opens java.desktop/java.beans=ALL-UNNAMED",
    "--add-opens java.scripting/javax.script=ALL-UNNAMED",
    "--add-opens java.base/sun.util.locale.provider=ALL-UNNAMED",
    "-Djava.locale.providers=SPI,CLDR,COMPAT",
];

/// How test patterns are spelled on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStyle {
    /// Surefire `-Dtest=Class#method,Class#method`
    #[default]
    Maven,
    /// Gradle `--tests Class.method` per pattern
    Gradle,
    /// `Class,method;Class,method`
    Raw,
}

impl PatternStyle {
    /// Patterns joined into the single string substituted for `{tests}`.
    pub fn join(self, patterns: &[TestPattern]) -> String {
        let (sep, join) = match self {
            PatternStyle::Maven => ("#", ","),
            PatternStyle::Gradle => (".", " "),
            PatternStyle::Raw => (",", ";"),
        };
        patterns
            .iter()
            .map(|p| format!("{}{}{}", p.class_name, sep, p.method_name))
            .collect::<Vec<_>>()
            .join(join)
    }
}

/// A resolved test command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub module_args: Vec<String>,
    pub style: PatternStyle,
    pub options_env: String,
}

impl LaunchSpec {
    /// Built-in command for a pattern style.
    pub fn defaults_for(style: PatternStyle) -> Self {
        let (program, args, module_args): (&str, &[&str], &[&str]) = match style {
            PatternStyle::Maven => (
                "mvn",
                &[
                    "-q",
                    "test",
                    "-Dtest={tests}",
                    "-DfailIfNoTests=false",
                    "-Dsurefire.failIfNoSpecifiedTests=false",
                ],
                &["-pl", "{module}"],
            ),
            PatternStyle::Gradle => ("gradle", &["test", "{tests}"], &["-p", "{module}"]),
            PatternStyle::Raw => ("echo", &["{tests}"], &[]),
        };
        let owned = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.to_string()).collect() };
        LaunchSpec {
            program: program.to_string(),
            args: owned(args),
            module_args: owned(module_args),
            style,
            options_env: DEFAULT_OPTIONS_ENV.to_string(),
        }
    }

    /// Command-line arguments for `request`, placeholders substituted.
    pub fn command_args(&self, request: &RunRequest) -> Vec<String> {
        let module = match &request.scope {
            RunScope::SingleModule(m) => Some(m.as_str()),
            RunScope::WholeProject => None,
        };
        let tests = self.style.join(&request.patterns);

        let mut out = Vec::new();
        let module_args: &[String] = if module.is_some() {
            &self.module_args
        } else {
            &[]
        };
        for arg in self.args.iter().chain(module_args) {
            if self.style == PatternStyle::Gradle && arg == "{tests}" {
                for p in &request.patterns {
                    out.push("--tests".to_string());
                    out.push(format!("{}.{}", p.class_name, p.method_name));
                }
                continue;
            }
            out.push(
                arg.replace("{tests}", &tests)
                    .replace("{module}", module.unwrap_or("")),
            );
        }
        out
    }
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("No test command configured")]
    EmptyCommand,
    #[error("No test patterns to run")]
    NoPatterns,
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a test run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Run configuration name
    pub name: String,
    /// `None` when the process was killed by a signal or could not be waited on
    pub exit_code: Option<i32>,
    pub success: bool,
    pub duration_ms: u64,
}

/// Called once when the test process terminates.
pub type ExitCallback = Box<dyn FnOnce(&RunOutcome) + Send + 'static>;

/// A started test run.
#[derive(Debug)]
pub struct RunHandle {
    name: String,
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Running(JoinHandle<RunOutcome>),
    Finished(RunOutcome),
}

impl RunHandle {
    pub fn spawned(name: impl Into<String>, watcher: JoinHandle<RunOutcome>) -> Self {
        Self {
            name: name.into(),
            state: HandleState::Running(watcher),
        }
    }

    /// A handle for a run that has already ended.
    pub fn finished(outcome: RunOutcome) -> Self {
        Self {
            name: outcome.name.clone(),
            state: HandleState::Finished(outcome),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the process to end.
    pub fn join(self) -> RunOutcome {
        match self.state {
            HandleState::Finished(outcome) => outcome,
            HandleState::Running(watcher) => watcher.join().unwrap_or_else(|_| {
                tracing::error!(name = %self.name, "Test run watcher panicked");
                RunOutcome {
                    name: self.name,
                    exit_code: None,
                    success: false,
                    duration_ms: 0,
                }
            }),
        }
    }
}

/// The test-execution engine.
pub trait TestLauncher: Send + Sync {
    /// Start a run. `on_exit` fires once when it ends; it is not called when
    /// this returns an error.
    fn launch(&self, request: &RunRequest, on_exit: ExitCallback)
        -> Result<RunHandle, LaunchError>;
}

/// Runs the configured build tool as a child process.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    spec: LaunchSpec,
}

impl CommandLauncher {
    pub fn new(spec: LaunchSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    fn command(&self, request: &RunRequest) -> Result<Command, LaunchError> {
        if self.spec.program.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        if request.patterns.is_empty() {
            return Err(LaunchError::NoPatterns);
        }
        // `program` may carry its own arguments, e.g. "./mvnw -B"
        let mut words = shell_words::split(&self.spec.program).map_err(|e| LaunchError::Spawn {
            program: self.spec.program.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;
        if words.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        let program = words.remove(0);

        let mut cmd = Command::new(program);
        cmd.args(words)
            .args(self.spec.command_args(request))
            .current_dir(&request.working_dir);
        if let Some(options) = &request.options {
            cmd.env(&self.spec.options_env, options);
        }
        Ok(cmd)
    }
}

impl TestLauncher for CommandLauncher {
    fn launch(
        &self,
        request: &RunRequest,
        on_exit: ExitCallback,
    ) -> Result<RunHandle, LaunchError> {
        let _span = tracing::info_span!("launch", name = %request.name).entered();
        let mut cmd = self.command(request)?;
        tracing::info!(
            program = %self.spec.program,
            patterns = request.patterns.len(),
            dir = %request.working_dir.display(),
            "Starting test run"
        );

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.spec.program.clone(),
            source,
        })?;

        let name = request.name.clone();
        let watcher = std::thread::Builder::new()
            .name(format!("run-{}", name))
            .spawn(move || {
                let (exit_code, success) = match child.wait() {
                    Ok(status) => (status.code(), status.success()),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed waiting for test process");
                        (None, false)
                    }
                };
                let outcome = RunOutcome {
                    name,
                    exit_code,
                    success,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                tracing::info!(?outcome, "Test run finished");
                on_exit(&outcome);
                outcome
            })
            .map_err(|source| LaunchError::Spawn {
                program: "watcher thread".into(),
                source,
            })?;

        Ok(RunHandle::spawned(request.name.clone(), watcher))
    }
}
