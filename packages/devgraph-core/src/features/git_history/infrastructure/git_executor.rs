//! Git command executor with per-command timeouts.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{CoreError, Result};

/// Timeout for `git log` invocations.
pub const LOG_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for `git show <hash>:<path>` content fetches.
pub const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes git commands in a repository, with the pager disabled.
pub struct GitExecutor {
    repo_path: PathBuf,
}

impl GitExecutor {
    pub fn new(repo_path: impl AsRef<Path>) -> Result<Self> {
        let path = repo_path.as_ref().to_path_buf();

        if !path.join(".git").exists() {
            return Err(CoreError::NotARepository(path.display().to_string()));
        }

        Ok(Self { repo_path: path })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Run a git command, enforcing `timeout`. Failures surface the stderr
    /// snippet; timeouts kill the child.
    pub fn run(&self, args: &[&str], timeout: Duration) -> Result<String> {
        debug!("git {}", args.join(" "));

        let child = Command::new("git")
            .arg("--no-pager")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_PAGER", "cat")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (status, stdout, stderr) = wait_with_timeout(child, timeout)?;

        if status {
            Ok(String::from_utf8_lossy(&stdout).into_owned())
        } else {
            let snippet: String = String::from_utf8_lossy(&stderr).chars().take(400).collect();
            Err(CoreError::GitCommand(snippet))
        }
    }
}

/// Wait for a child process with a deadline. Stdout/stderr are drained on
/// reader threads so the child cannot block on a full pipe.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<(bool, Vec<u8>, Vec<u8>)> {
    let stdout_handle = spawn_reader(child.stdout.take());
    let stderr_handle = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CoreError::GitTimeout(timeout.as_secs()));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok((status.success(), stdout, stderr))
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitExecutor::new(dir.path());
        assert!(matches!(result, Err(CoreError::NotARepository(_))));
    }
}
