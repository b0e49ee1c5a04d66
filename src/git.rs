//! Branch discovery and worktree checkout.
//!
//! Both pipelines only need two things from git: the list of remote branches
//! (to find change-request markers and preview branches) and a way to check a
//! branch out into a directory. They are behind `BranchSource` and
//! `BranchCheckout` so the pipelines can run against pre-existing directories.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Lists remote branch names, without the remote prefix.
pub trait BranchSource {
    fn remote_branches(&self) -> Result<Vec<String>>;
}

/// Makes the content of a branch available in a directory.
pub trait BranchCheckout {
    fn checkout(&self, branch: &str, target: &Path) -> Result<()>;
}

/// Git operations through the system `git` command.
///
/// This uses the system git command, which automatically handles SSH keys,
/// credential helpers and any authentication configured in ~/.gitconfig.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>, remote: &str) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        debug!("git {}", command);
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| Error::GitCommand {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BranchSource for GitCli {
    fn remote_branches(&self) -> Result<Vec<String>> {
        // A failed fetch leaves the last known remote state, which is still usable.
        if let Err(e) = self.run(&["fetch", &self.remote]) {
            warn!("{}", e);
        }
        let stdout = self.run(&["branch", "-r"])?;
        let branches = parse_remote_branches(&stdout, &self.remote);
        info!("Found {} remote branches", branches.len());
        Ok(branches)
    }
}

impl BranchCheckout for GitCli {
    fn checkout(&self, branch: &str, target: &Path) -> Result<()> {
        if target.exists() {
            debug!("Worktree for {} already at {}", branch, target.display());
            return Ok(());
        }
        let target_str = target.to_string_lossy();
        info!("Checking out {} at {}", branch, target.display());
        self.run(&["worktree", "add", &target_str, branch])?;
        Ok(())
    }
}

/// Parse `git branch -r` output into branch names of `remote`.
///
/// Symbolic entries such as `origin/HEAD -> origin/main` are skipped.
pub fn parse_remote_branches(stdout: &str, remote: &str) -> Vec<String> {
    let prefix = format!("{}/", remote);
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.contains(" -> "))
        .filter_map(|line| line.strip_prefix(&prefix))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// A fixed branch list over directories that are already checked out.
#[derive(Debug, Clone, Default)]
pub struct StaticBranches {
    branches: Vec<String>,
}

impl StaticBranches {
    pub fn new<I, S>(branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branches: branches.into_iter().map(Into::into).collect(),
        }
    }
}

impl BranchSource for StaticBranches {
    fn remote_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.clone())
    }
}

impl BranchCheckout for StaticBranches {
    fn checkout(&self, branch: &str, target: &Path) -> Result<()> {
        if target.is_dir() {
            Ok(())
        } else {
            Err(Error::GitCommand {
                command: format!("checkout {}", branch),
                stderr: format!("expected an existing checkout at {}", target.display()),
            })
        }
    }
}
