//! Version control: working-tree snapshots and file history
//!
//! [`GitCli`] shells out to `git`. [`SnapshotCoordinator`] brackets the
//! head-state run: stash the working changes before it, re-apply the top
//! stash entry after it. An entry this client created is dropped once it has
//! been applied cleanly.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::error::SessionError;

/// Message recorded on stash entries created before a head-state run.
pub const STASH_MESSAGE: &str = "affected: head-state test run";

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("Failed to run git. Is git installed? {0}")]
    Unavailable(#[from] std::io::Error),
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// The two working-tree operations the orchestrator depends on.
pub trait Vcs: Send + Sync {
    /// Stash uncommitted changes. Returns `false` when there was nothing to
    /// stash and no entry was created.
    fn stash_push(&self, message: &str) -> Result<bool, VcsError>;

    /// Apply the most recent stash entry (`stash@{0}`) onto the working tree.
    ///
    /// After a successful apply the entry is dropped if it is still the one
    /// `stash_push` created. On failure it stays on the stack.
    fn stash_apply_top(&self) -> Result<(), VcsError>;
}

/// `git` command-line client rooted at a working copy.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    /// Commit id of the stash entry created by the last `stash_push`
    pushed: Arc<Mutex<Option<String>>>,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pushed: Arc::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `git <args>` in the working copy and return stdout.
    pub fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        let _span = tracing::debug_span!("git", args = ?args).entered();
        let output = Command::new("git")
            .arg("--no-pager")
            .args(args)
            .current_dir(&self.root)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VcsError::Failed {
                command: args.first().copied().unwrap_or("").to_string(),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// File contents at `rev`, or `None` if the path does not exist there.
    pub fn show_file(&self, rev: &str, path: &str) -> Result<Option<String>, VcsError> {
        if path.starts_with('-') {
            return Err(VcsError::Failed {
                command: "show".into(),
                stderr: format!("Invalid path '{path}': must not start with '-'"),
            });
        }
        match self.run(&["show", &format!("{rev}:{path}")]) {
            Ok(text) => Ok(Some(text)),
            Err(VcsError::Failed { stderr, .. })
                if stderr.contains("does not exist") || stderr.contains("exists on disk, but not in") =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn stash_top(&self) -> Result<Option<String>, VcsError> {
        match self.run(&["rev-parse", "-q", "--verify", "refs/stash"]) {
            Ok(out) => Ok(Some(out.trim().to_string())),
            // exit 1 with no output: the stash is empty
            Err(VcsError::Failed { stderr, .. }) if stderr.is_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Vcs for GitCli {
    fn stash_push(&self, message: &str) -> Result<bool, VcsError> {
        let before = self.stash_top()?;
        self.run(&["stash", "push", "--include-untracked", "-m", message])?;
        let after = self.stash_top()?;
        let created = after.is_some() && after != before;
        *self.pushed.lock().unwrap_or_else(|p| p.into_inner()) =
            if created { after } else { None };
        Ok(created)
    }

    fn stash_apply_top(&self) -> Result<(), VcsError> {
        self.run(&["stash", "apply", "stash@{0}"])?;

        let Some(pushed) = self.pushed.lock().unwrap_or_else(|p| p.into_inner()).take() else {
            return Ok(());
        };
        // Someone else may have stashed since; leave their entry alone
        match self.stash_top() {
            Ok(top) if top.as_deref() == Some(pushed.as_str()) => {}
            Ok(_) => {
                tracing::warn!(stash = %pushed, "Stash stack changed, keeping entry");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Changes restored but stash entry not dropped");
                return Ok(());
            }
        }
        if let Err(e) = self.run(&["stash", "drop", "-q", "stash@{0}"]) {
            tracing::warn!(error = %e, "Changes restored but stash entry not dropped");
        }
        Ok(())
    }
}

/// Sequences the stash/restore bracket around the head-state run.
#[derive(Clone)]
pub struct SnapshotCoordinator {
    vcs: Arc<dyn Vcs>,
}

impl SnapshotCoordinator {
    pub fn new(vcs: Arc<dyn Vcs>) -> Self {
        Self { vcs }
    }

    /// Set the working changes aside so the tree matches HEAD.
    ///
    /// Returns whether a stash entry was created; only then is there anything
    /// to restore.
    pub fn stash_current_changes(&self) -> Result<bool, SessionError> {
        let _span = tracing::info_span!("stash_current_changes").entered();
        let created = self
            .vcs
            .stash_push(STASH_MESSAGE)
            .map_err(|e| SessionError::VcsOperationFailed(e.to_string()))?;
        if created {
            tracing::info!("Working changes stashed");
        } else {
            tracing::info!("Nothing to stash, working tree already matches HEAD");
        }
        Ok(created)
    }

    /// Re-apply the top stash entry when `should_restore` is set.
    ///
    /// On failure the stash entry is left in place, so nothing is lost.
    pub fn restore_stashed_changes(&self, should_restore: bool) -> Result<(), SessionError> {
        let _span = tracing::info_span!("restore_stashed_changes", should_restore).entered();
        if !should_restore {
            return Ok(());
        }
        self.vcs.stash_apply_top().map_err(|e| {
            tracing::error!(error = %e, "Failed to re-apply stashed changes");
            SessionError::VcsOperationFailed(e.to_string())
        })?;
        tracing::info!("Stashed changes re-applied");
        Ok(())
    }
}
