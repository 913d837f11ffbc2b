mod docker;

use log::warn;
use thiserror::Error;

pub use docker::{find_terminal, follow_logs, DockerCli, LogLine};

/// Field separator used in the `--format` templates of `ps` and `images`.
pub const ROW_DELIMITER: char = '|';
/// Field separator used in the `--format` template of `stats`.
pub const STATS_DELIMITER: char = ';';

pub const CONTAINER_FORMAT: &str = "{{.ID}}|{{.Image}}|{{.Status}}|{{.Names}}";
pub const IMAGE_FORMAT: &str = "{{.Repository}}|{{.Tag}}|{{.ID}}|{{.Size}}";
pub const STATS_FORMAT: &str = "{{.CPUPerc}};{{.MemPerc}}";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        output: String,
    },
    #[error("unexpected engine output: {0:?}")]
    MalformedOutput(String),
    #[error("no terminal emulator found (tried {0})")]
    NoTerminal(String),
}

impl EngineError {
    /// Text shown to the user in a notice, mirroring what the engine printed.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::CommandFailed { output, .. } if !output.trim().is_empty() => {
                format!("Error: {}", output.trim())
            }
            other => format!("Error: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRow {
    pub id: String,
    pub image: String,
    pub status: String,
    pub name: String,
}

impl ContainerRow {
    pub fn state(&self) -> ContainerStatus {
        ContainerStatus::from(self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRow {
    pub repository: String,
    pub tag: String,
    pub id: String,
    pub size: String,
}

impl ImageRow {
    /// Reference handed to `run`. Dangling images have no usable name, so the id is used.
    pub fn reference(&self) -> String {
        if self.repository == "<none>" || self.tag == "<none>" {
            self.id.clone()
        } else {
            format!("{}:{}", self.repository, self.tag)
        }
    }
}

/// Coarse state derived from the human readable `{{.Status}}` column
/// (`Up 3 hours`, `Exited (0) 2 days ago`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl From<&str> for ContainerStatus {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with("Up") {
            if s.contains("(Paused)") {
                ContainerStatus::Paused
            } else {
                ContainerStatus::Running
            }
        } else if s.starts_with("Exited") {
            ContainerStatus::Exited
        } else if s.starts_with("Created") {
            ContainerStatus::Created
        } else if s.starts_with("Restarting") {
            ContainerStatus::Restarting
        } else if s.starts_with("Removal") {
            ContainerStatus::Removing
        } else if s.starts_with("Dead") {
            ContainerStatus::Dead
        } else {
            ContainerStatus::Unknown
        }
    }
}

/// Instant CPU and memory percentages of a single container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerUsage {
    pub cpu: f64,
    pub mem: f64,
}

/// Message surfaced to the user as a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            title: title.into(),
            body: body.into(),
        }
    }
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            title: title.into(),
            body: body.into(),
        }
    }
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Seam used by background tasks to push engine results into the UI state.
pub trait ContainerManagement {
    fn set_containers(&mut self, containers: Vec<ContainerRow>);
    fn set_images(&mut self, images: Vec<ImageRow>);
    fn add_logs(&mut self, logs: Vec<String>);
    fn update_usage(&mut self, usage: crate::usage::UsageSnapshot);
    fn notify(&mut self, notice: Notice);
}

fn split_fields<const N: usize>(line: &str) -> Option<[String; N]> {
    let parts: Vec<&str> = line.split(ROW_DELIMITER).collect();
    if parts.len() != N {
        return None;
    }
    let mut fields: [String; N] = std::array::from_fn(|_| String::new());
    for (field, part) in fields.iter_mut().zip(parts) {
        *field = part.trim().to_string();
    }
    Some(fields)
}

pub fn parse_containers(output: &str) -> Vec<ContainerRow> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match split_fields::<4>(line) {
            Some([id, image, status, name]) => Some(ContainerRow {
                id,
                image,
                status,
                name,
            }),
            None => {
                warn!("Skipping malformed container row: {:?}", line);
                None
            }
        })
        .collect()
}

pub fn parse_images(output: &str) -> Vec<ImageRow> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match split_fields::<4>(line) {
            Some([repository, tag, id, size]) => Some(ImageRow {
                repository,
                tag,
                id,
                size,
            }),
            None => {
                warn!("Skipping malformed image row: {:?}", line);
                None
            }
        })
        .collect()
}

/// Parses `"<cpu>%;<mem>%"` as printed by `stats --no-stream`.
pub fn parse_stats_line(output: &str) -> Result<ContainerUsage, EngineError> {
    let cleaned = output.trim().replace('%', "");
    let mut fields = cleaned.split(STATS_DELIMITER);
    let (cpu, mem) = match (fields.next(), fields.next(), fields.next()) {
        (Some(cpu), Some(mem), None) => (cpu.trim(), mem.trim()),
        _ => return Err(EngineError::MalformedOutput(output.to_string())),
    };
    let cpu = cpu
        .parse::<f64>()
        .map_err(|_| EngineError::MalformedOutput(output.to_string()))?;
    let mem = mem
        .parse::<f64>()
        .map_err(|_| EngineError::MalformedOutput(output.to_string()))?;
    Ok(ContainerUsage { cpu, mem })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stats_line() {
        let usage = parse_stats_line("12.5%;34.0%\n").unwrap();
        assert_eq!(usage, ContainerUsage { cpu: 12.5, mem: 34.0 });
    }

    #[test]
    fn rejects_malformed_stats() {
        assert!(parse_stats_line("bad data").is_err());
        assert!(parse_stats_line("").is_err());
        assert!(parse_stats_line("1%;2%;3%").is_err());
        assert!(parse_stats_line("--;--").is_err());
    }

    #[test]
    fn parses_container_rows_and_skips_garbage() {
        let out = "abc123|nginx:latest|Up 2 hours|web\nnot a row\n\ndef456|redis|Exited (0) 3 days ago|cache\n";
        let rows = parse_containers(out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "web");
        assert_eq!(rows[0].state(), ContainerStatus::Running);
        assert_eq!(rows[1].state(), ContainerStatus::Exited);
    }

    #[test]
    fn image_reference_falls_back_to_id() {
        let rows = parse_images("nginx|1.25|sha1|187MB\n<none>|<none>|sha2|12MB");
        assert_eq!(rows[0].reference(), "nginx:1.25");
        assert_eq!(rows[1].reference(), "sha2");
    }

    #[test]
    fn status_detects_paused() {
        assert_eq!(
            ContainerStatus::from("Up 5 minutes (Paused)"),
            ContainerStatus::Paused
        );
        assert_eq!(ContainerStatus::from("Created"), ContainerStatus::Created);
    }
}
