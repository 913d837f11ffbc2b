pub mod handler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoEvent {
    Initialize,
    RefreshContainers,
    RefreshImages,
    StartContainer(String),
    StopContainer(String),
    RemoveContainer(String),
    ShowLogs(String),
    ShowUsage(String),
    /// Cancels the log follower or usage sampler, if any.
    StopBackground,
    RemoveImage(String),
    RunImage(String),
    RunImageInteractive(String),
}
