use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::{
    parse_containers, parse_images, parse_stats_line, ContainerManagement, ContainerRow,
    ContainerUsage, EngineError, ImageRow, Notice, CONTAINER_FORMAT, IMAGE_FORMAT, STATS_FORMAT,
};

/// Thin wrapper over the engine command line tool.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Runs the engine and returns stdout, or a `CommandFailed` carrying
    /// whatever the engine printed.
    async fn run(&self, args: &[&str]) -> Result<String, EngineError> {
        let command = self.describe(args);
        debug!("Running: {}", command);
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(EngineError::CommandFailed {
                command,
                status: output.status,
                output: format!("{}{}", stdout, stderr),
            })
        }
    }

    pub async fn list_containers(&self) -> Result<Vec<ContainerRow>, EngineError> {
        let out = self
            .run(&["ps", "-a", "--format", CONTAINER_FORMAT])
            .await?;
        Ok(parse_containers(&out))
    }

    pub async fn list_images(&self) -> Result<Vec<ImageRow>, EngineError> {
        let out = self.run(&["images", "--format", IMAGE_FORMAT]).await?;
        Ok(parse_images(&out))
    }

    pub async fn start_container(&self, id: &str) -> Result<String, EngineError> {
        info!("Start container: {}", id);
        self.run(&["start", id]).await
    }

    pub async fn stop_container(&self, id: &str) -> Result<String, EngineError> {
        info!("Stop container: {}", id);
        self.run(&["stop", id]).await
    }

    pub async fn remove_container(&self, id: &str) -> Result<String, EngineError> {
        info!("Remove container: {}", id);
        self.run(&["rm", id]).await
    }

    /// Log lines written at or after `since` (all of them when `None`), in
    /// write order. The engine replays the container's stderr on its own
    /// stderr, so both streams are merged back by timestamp.
    pub async fn logs(
        &self,
        id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LogLine>, EngineError> {
        let since = since.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Nanos, true));
        let mut args = vec!["logs", "--timestamps"];
        if let Some(since) = since.as_deref() {
            args.push("--since");
            args.push(since);
        }
        args.push(id);

        let command = self.describe(&args);
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                command: command.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(EngineError::CommandFailed {
                command,
                status: output.status,
                output: stderr.into_owned(),
            });
        }
        let mut lines: Vec<LogLine> = stdout
            .lines()
            .chain(stderr.lines())
            .map(LogLine::parse)
            .collect();
        lines.sort_by_key(|line| line.timestamp);
        Ok(lines)
    }

    pub async fn container_usage(&self, id: &str) -> Result<ContainerUsage, EngineError> {
        let out = self
            .run(&["stats", "--no-stream", "--format", STATS_FORMAT, id])
            .await?;
        parse_stats_line(&out)
    }

    pub async fn remove_image(&self, id: &str) -> Result<String, EngineError> {
        info!("Remove image: {}", id);
        self.run(&["rmi", id]).await
    }

    pub async fn run_image(&self, reference: &str) -> Result<String, EngineError> {
        info!("Run image: {}", reference);
        self.run(&["run", "-d", reference]).await
    }

    /// Opens `<engine> run -it <reference> bash` in a new terminal emulator window.
    pub fn run_image_interactive(
        &self,
        reference: &str,
        terminals: &[String],
    ) -> Result<PathBuf, EngineError> {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let terminal = find_terminal(terminals, &path)
            .ok_or_else(|| EngineError::NoTerminal(terminals.join(", ")))?;
        let args = ["--", self.binary.as_str(), "run", "-it", reference, "bash"];
        info!("Interactive run of {} in {}", reference, terminal.display());
        Command::new(&terminal)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: format!("{} {}", terminal.display(), args.join(" ")),
                source,
            })?;
        Ok(terminal)
    }
}

/// One line of `logs --timestamps` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: Option<DateTime<Utc>>,
    pub text: String,
}

impl LogLine {
    /// Splits the leading RFC 3339 stamp off. Lines without one are kept whole.
    pub fn parse(line: &str) -> Self {
        let (stamp, text) = line.split_once(' ').unwrap_or((line, ""));
        match DateTime::parse_from_rfc3339(stamp) {
            Ok(ts) => Self {
                timestamp: Some(ts.with_timezone(&Utc)),
                text: text.to_string(),
            },
            Err(_) => Self {
                timestamp: None,
                text: line.to_string(),
            },
        }
    }
}

/// Polls the container's logs every `interval` and appends new lines to the
/// manager. Ends when the engine refuses the request, e.g. once the container
/// is gone.
pub async fn follow_logs(
    docker: DockerCli,
    container_id: String,
    interval: Duration,
    manager: Arc<Mutex<impl ContainerManagement + Send + 'static>>,
) {
    let mut since: Option<DateTime<Utc>> = None;

    loop {
        let polled_at = Utc::now();
        match docker.logs(&container_id, since).await {
            Ok(lines) => {
                if lines.is_empty() {
                    tokio::time::sleep(interval).await;
                    continue;
                }
                // `--since` is inclusive, resume right after the newest line.
                since = match lines.iter().filter_map(|line| line.timestamp).max() {
                    Some(newest) => Some(newest + chrono::Duration::nanoseconds(1)),
                    None => Some(polled_at),
                };
                let lines = lines.into_iter().map(|line| line.text).collect();
                manager.lock().await.add_logs(lines);
            }
            Err(e) => {
                error!("Error getting logs for {}: {}", container_id, e);
                manager
                    .lock()
                    .await
                    .notify(Notice::error("Logs", e.user_message()));
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// First candidate that resolves to an executable file on `path`.
/// Candidates containing a path separator are checked as-is.
pub fn find_terminal(candidates: &[String], path: &OsStr) -> Option<PathBuf> {
    candidates.iter().find_map(|candidate| {
        let candidate_path = Path::new(candidate);
        if candidate_path.components().count() > 1 {
            return is_executable(candidate_path).then(|| candidate_path.to_path_buf());
        }
        std::env::split_paths(path)
            .map(|dir| dir.join(candidate))
            .find(|full| is_executable(full))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[cfg(unix)]
    fn write_file(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::write(path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn find_terminal_walks_path_in_candidate_order() {
        let dir = std::env::temp_dir().join(format!("dockhand-term-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_file(&dir.join("xterm"), 0o755);

        let path = std::env::join_paths([dir.clone()]).unwrap();
        let candidates = vec!["gnome-terminal".to_string(), "xterm".to_string()];
        assert_eq!(find_terminal(&candidates, &path), Some(dir.join("xterm")));
        assert_eq!(
            find_terminal(&["gnome-terminal".to_string()], &path),
            None
        );
        assert_eq!(find_terminal(&candidates, &OsString::new()), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn find_terminal_skips_files_without_exec_bit() {
        let first = std::env::temp_dir().join(format!("dockhand-noexec-{}", std::process::id()));
        let second = first.with_extension("bin");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        write_file(&first.join("xterm"), 0o644);
        write_file(&second.join("xterm"), 0o755);

        let path = std::env::join_paths([first.clone(), second.clone()]).unwrap();
        assert_eq!(
            find_terminal(&["xterm".to_string()], &path),
            Some(second.join("xterm"))
        );
        let direct = first.join("xterm").to_string_lossy().into_owned();
        assert_eq!(find_terminal(&[direct], &path), None);

        std::fs::remove_dir_all(&first).unwrap();
        std::fs::remove_dir_all(&second).unwrap();
    }

    #[test]
    fn log_line_splits_timestamp_prefix() {
        let line = LogLine::parse("2024-05-01T10:00:00.000000001Z listening on :80");
        assert_eq!(line.text, "listening on :80");
        assert_eq!(
            line.timestamp,
            Some(
                DateTime::parse_from_rfc3339("2024-05-01T10:00:00.000000001Z")
                    .unwrap()
                    .with_timezone(&Utc)
            )
        );

        let bare = LogLine::parse("no stamp here");
        assert_eq!(bare.timestamp, None);
        assert_eq!(bare.text, "no stamp here");

        let empty = LogLine::parse("2024-05-01T10:00:00Z");
        assert!(empty.timestamp.is_some());
        assert_eq!(empty.text, "");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let cli = DockerCli::new("dockhand-no-such-engine");
        match cli.list_containers().await {
            Err(EngineError::Spawn { command, .. }) => {
                assert!(command.starts_with("dockhand-no-such-engine ps -a"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
