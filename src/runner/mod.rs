//! Test run configuration and submission
//!
//! [`TestRunAdapter`] turns impacted test methods into a [`RunRequest`]:
//! module scoping, the size cap, exclusion rules and the session's
//! populate-once pattern set are applied here, in that order.

mod launcher;

pub use launcher::{
    CommandLauncher, ExitCallback, LaunchError, LaunchSpec, PatternStyle, RunHandle, RunOutcome,
    TestLauncher, DEFAULT_JVM_OPTIONS, DEFAULT_OPTIONS_ENV,
};

use std::path::PathBuf;

use crate::error::SessionError;
use crate::filter::{bounded_subset, ModuleRegistry, TestMethodFilter, DEFAULT_MAX_TESTS};
use crate::impact::{TestMethod, TypeHierarchy};
use crate::session::{RunSession, TestPattern};

/// Where the test engine looks for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    SingleModule(String),
    WholeProject,
}

/// Everything the test engine needs for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Run configuration name
    pub name: String,
    pub patterns: Vec<TestPattern>,
    pub scope: RunScope,
    pub working_dir: PathBuf,
    /// JVM options for the test process
    pub options: Option<String>,
}

impl RunRequest {
    pub fn module(&self) -> Option<&str> {
        match &self.scope {
            RunScope::SingleModule(m) => Some(m),
            RunScope::WholeProject => None,
        }
    }
}

/// Builds and submits test runs.
#[derive(Debug, Clone)]
pub struct TestRunAdapter {
    filter: TestMethodFilter,
    registry: ModuleRegistry,
    target_module: Option<String>,
    max_tests: usize,
    working_dir: PathBuf,
    options: Option<String>,
}

impl TestRunAdapter {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            filter: TestMethodFilter::default(),
            registry: ModuleRegistry::default(),
            target_module: None,
            max_tests: DEFAULT_MAX_TESTS,
            working_dir: working_dir.into(),
            options: None,
        }
    }

    pub fn with_filter(mut self, filter: TestMethodFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Restrict runs to `module`, looked up in `registry`.
    pub fn with_module(mut self, module: Option<String>, registry: ModuleRegistry) -> Self {
        self.target_module = module;
        self.registry = registry;
        self
    }

    pub fn with_max_tests(mut self, max_tests: usize) -> Self {
        self.max_tests = max_tests;
        self
    }

    pub fn with_options(mut self, options: Option<String>) -> Self {
        self.options = options;
        self
    }

    /// Build the run request for `methods`.
    ///
    /// Patterns are collected into `session` only if it is still empty; the
    /// request always carries the session's pattern set, so a second run in
    /// the same session selects exactly what the first one did.
    pub fn prepare(
        &self,
        name: &str,
        methods: &[TestMethod],
        hierarchy: &TypeHierarchy,
        session: &RunSession,
    ) -> Result<RunRequest, SessionError> {
        let _span = tracing::info_span!("prepare_run", name, candidates = methods.len()).entered();

        let scope = match &self.target_module {
            Some(module) => RunScope::SingleModule(module.clone()),
            None => RunScope::WholeProject,
        };
        let scoped = match &self.target_module {
            Some(module) => {
                self.filter
                    .select_module_scoped(methods.to_vec(), module, &self.registry)?
            }
            None => methods.to_vec(),
        };
        let selected = bounded_subset(&scoped, self.max_tests);
        let added = self.filter.collect_patterns(&selected, hierarchy, session);
        tracing::debug!(added, "Patterns collected");

        Ok(RunRequest {
            name: name.to_string(),
            patterns: session.patterns(),
            scope,
            working_dir: self.working_dir.clone(),
            options: self.options.clone(),
        })
    }

    /// Hand `request` to the test engine.
    pub fn submit(
        &self,
        launcher: &dyn TestLauncher,
        request: &RunRequest,
        on_exit: ExitCallback,
    ) -> Result<RunHandle, SessionError> {
        launcher.launch(request, on_exit).map_err(|e| {
            tracing::error!(name = %request.name, error = %e, "Failed to start test run");
            SessionError::ExecutionEngineUnavailable(e.to_string())
        })
    }
}
