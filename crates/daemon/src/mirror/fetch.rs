// Git fetch for bare mirrors.
//
// `update` refreshes an existing mirror in place with `git remote update`;
// `clone` creates a new one with `git clone --mirror`. Commands go through a
// `CommandExecutor` so tests can script the results.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// What a fetch should do with the local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Update,
    Clone,
}

impl FetchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Clone => "clone",
        }
    }
}

impl Display for FetchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },
    #[error("`{command}` failed with code {code:?}: {}", .stderr.trim())]
    CommandFailed { command: String, code: Option<i32>, stderr: String },
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

/// Refreshes or creates the mirror of `remote` at `local`.
pub trait MirrorFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        remote: &str,
        local: &Path,
        mode: FetchMode,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}

// ── Command execution ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ── Git fetcher ────────────────────────────────────────────────────

/// Runs `git` on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher<E = ProcessCommandExecutor> {
    executor: E,
}

impl GitFetcher<ProcessCommandExecutor> {
    pub fn new() -> Self {
        Self { executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor + Clone + 'static> GitFetcher<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Synchronous fetch; `fetch` runs this off the async runtime.
    pub fn fetch_blocking(
        &self,
        remote: &str,
        local: &Path,
        mode: FetchMode,
    ) -> Result<(), FetchError> {
        let (args, cwd) = match mode {
            FetchMode::Update => {
                (vec!["remote".to_string(), "update".to_string(), "--prune".to_string()], local)
            }
            FetchMode::Clone => {
                let parent = local.parent().unwrap_or(local);
                std::fs::create_dir_all(parent).map_err(|error| FetchError::SpawnFailed {
                    command: "git clone".to_string(),
                    message: format!("cannot create `{}`: {error}", parent.display()),
                })?;
                (
                    vec![
                        "clone".to_string(),
                        "--mirror".to_string(),
                        remote.to_string(),
                        local.to_string_lossy().into_owned(),
                    ],
                    parent,
                )
            }
        };
        self.run(args, cwd)
    }

    fn run(&self, args: Vec<String>, cwd: &Path) -> Result<(), FetchError> {
        let command = format!("git {}", args.join(" "));
        let result = self.executor.execute("git", &args, cwd).map_err(|error| {
            FetchError::SpawnFailed { command: command.clone(), message: error.to_string() }
        })?;

        if result.success {
            return Ok(());
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };
        Err(FetchError::CommandFailed { command, code: result.code, stderr })
    }
}

impl<E: CommandExecutor + Clone + 'static> MirrorFetcher for GitFetcher<E> {
    async fn fetch(&self, remote: &str, local: &Path, mode: FetchMode) -> Result<(), FetchError> {
        let fetcher = self.clone();
        let remote = remote.to_string();
        let local: PathBuf = local.to_path_buf();
        tokio::task::spawn_blocking(move || fetcher.fetch_blocking(&remote, &local, mode))
            .await
            .map_err(|error| FetchError::Aborted(error.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Invocation {
        program: String,
        args: Vec<String>,
        cwd: PathBuf,
    }

    #[derive(Clone)]
    struct MockExecutor {
        calls: Arc<Mutex<Vec<Invocation>>>,
        responses: Arc<Mutex<VecDeque<Result<CommandResult, std::io::Error>>>>,
    }

    impl MockExecutor {
        fn new(responses: Vec<Result<CommandResult, std::io::Error>>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            }
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().expect("mock calls lock poisoned").clone()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn execute(
            &self,
            program: &str,
            args: &[String],
            cwd: &Path,
        ) -> Result<CommandResult, std::io::Error> {
            self.calls.lock().expect("mock calls lock poisoned").push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.to_path_buf(),
            });

            self.responses
                .lock()
                .expect("mock responses lock poisoned")
                .pop_front()
                .expect("missing mock response")
        }
    }

    fn success() -> Result<CommandResult, std::io::Error> {
        Ok(CommandResult {
            success: true,
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    #[test]
    fn mode_names_are_literal() {
        assert_eq!(FetchMode::Update.as_str(), "update");
        assert_eq!(FetchMode::Clone.to_string(), "clone");
    }

    #[test]
    fn update_runs_remote_update_inside_mirror() {
        let mock = MockExecutor::new(vec![success()]);
        let fetcher = GitFetcher::with_executor(mock.clone());

        fetcher
            .fetch_blocking(
                "https://github.com/a/b",
                Path::new("/cache/github.com/a/b"),
                FetchMode::Update,
            )
            .expect("update should succeed");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "git");
        assert_eq!(calls[0].args, vec!["remote", "update", "--prune"]);
        assert_eq!(calls[0].cwd, PathBuf::from("/cache/github.com/a/b"));
    }

    #[test]
    fn clone_runs_mirror_clone_from_parent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let local = tmp.path().join("github.com/a/b");
        let mock = MockExecutor::new(vec![success()]);
        let fetcher = GitFetcher::with_executor(mock.clone());

        fetcher
            .fetch_blocking("https://github.com/a/b", &local, FetchMode::Clone)
            .expect("clone should succeed");

        let calls = mock.calls();
        assert_eq!(
            calls[0].args,
            vec![
                "clone".to_string(),
                "--mirror".to_string(),
                "https://github.com/a/b".to_string(),
                local.to_string_lossy().into_owned(),
            ]
        );
        assert_eq!(calls[0].cwd, tmp.path().join("github.com/a"));
        assert!(tmp.path().join("github.com/a").is_dir());
    }

    #[test]
    fn failure_carries_stderr_or_stdout() {
        let mock = MockExecutor::new(vec![
            Ok(CommandResult {
                success: false,
                code: Some(128),
                stdout: String::new(),
                stderr: "fatal: repository not found\n".to_string(),
            }),
            Ok(CommandResult {
                success: false,
                code: Some(1),
                stdout: "error on stdout\n".to_string(),
                stderr: "  ".to_string(),
            }),
        ]);
        let fetcher = GitFetcher::with_executor(mock);

        let error = fetcher
            .fetch_blocking("https://h/a/b", Path::new("/cache/h/a/b"), FetchMode::Update)
            .expect_err("first fetch should fail");
        assert_eq!(
            error,
            FetchError::CommandFailed {
                command: "git remote update --prune".to_string(),
                code: Some(128),
                stderr: "fatal: repository not found\n".to_string(),
            }
        );
        assert_eq!(
            error.to_string(),
            "`git remote update --prune` failed with code Some(128): fatal: repository not found"
        );

        let error = fetcher
            .fetch_blocking("https://h/a/b", Path::new("/cache/h/a/b"), FetchMode::Update)
            .expect_err("second fetch should fail");
        assert!(matches!(
            error,
            FetchError::CommandFailed { ref stderr, .. } if stderr == "error on stdout\n"
        ));
    }

    #[test]
    fn spawn_failure_is_reported() {
        let mock = MockExecutor::new(vec![Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "git not installed",
        ))]);
        let fetcher = GitFetcher::with_executor(mock);

        let error = fetcher
            .fetch_blocking("https://h/a/b", Path::new("/cache/h/a/b"), FetchMode::Update)
            .expect_err("fetch should fail");
        assert!(matches!(error, FetchError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn async_fetch_runs_on_blocking_pool() {
        let mock = MockExecutor::new(vec![success()]);
        let fetcher = GitFetcher::with_executor(mock.clone());

        fetcher
            .fetch("https://h/a/b", Path::new("/cache/h/a/b"), FetchMode::Update)
            .await
            .expect("fetch should succeed");
        assert_eq!(mock.calls().len(), 1);
    }
}
