use super::actions::{Action, Actions};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Containers,
    Images,
    Logs {
        container: String,
    },
    Usage {
        container: String,
    },
}

impl AppState {
    pub fn get_actions(&self) -> Actions {
        match self {
            Self::Containers => vec![
                Action::Quit,
                Action::SwitchTab,
                Action::Next,
                Action::Previous,
                Action::Refresh,
                Action::StartContainer,
                Action::StopContainer,
                Action::RemoveContainer,
                Action::ShowLogs,
                Action::ShowUsage,
            ]
            .into(),
            Self::Images => vec![
                Action::Quit,
                Action::SwitchTab,
                Action::Next,
                Action::Previous,
                Action::Refresh,
                Action::RunImage,
                Action::RunImageInteractive,
                Action::RemoveImage,
            ]
            .into(),
            Self::Logs { .. } => vec![
                Action::Quit,
                Action::ScrollDown,
                Action::ScrollUp,
                Action::Search,
                Action::DeleteChar,
            ]
            .into(),
            Self::Usage { .. } => vec![Action::Quit].into(),
        }
    }

    pub fn is_containers(&self) -> bool {
        matches!(self, &Self::Containers)
    }

    pub fn is_images(&self) -> bool {
        matches!(self, &Self::Images)
    }

    pub fn is_logging(&self) -> bool {
        matches!(self, &Self::Logs { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, &Self::Usage { .. })
    }

    /// Container a detail view is bound to.
    pub fn container(&self) -> Option<&str> {
        match self {
            Self::Logs { container } | Self::Usage { container } => Some(container),
            _ => None,
        }
    }

    /// Index of the tab highlighted in the header.
    pub fn tab_index(&self) -> usize {
        if self.is_images() {
            1
        } else {
            0
        }
    }
}
