pub mod actions;
pub mod state;
pub mod ui;

use std::collections::VecDeque;

use log::{debug, error, warn};
use tokio::sync::mpsc::error::TrySendError;

use crate::container_management::{
    ContainerManagement, ContainerRow, ImageRow, Notice,
};
use crate::inputs::key::Key;
use crate::io::IoEvent;
use crate::usage::UsageSnapshot;
use actions::{Action, Actions};
use state::AppState;

/// Oldest log lines are dropped past this.
const MAX_LOG_LINES: usize = 10_000;

#[derive(Debug, PartialEq, Eq)]
pub enum AppReturn {
    Exit,
    Continue,
}

pub struct App {
    containers: Vec<ContainerRow>,
    images: Vec<ImageRow>,
    /// Work handed to the IO handler
    io_tx: tokio::sync::mpsc::Sender<IoEvent>,
    /// Contextual actions
    actions: Actions,
    state: AppState,
    selected_container: Option<String>,
    selected_image: Option<String>,
    // Logging attributes
    logs: Vec<String>,
    log_position: usize, // Reverse index from where to start taking log lines
    search: Option<String>,
    usage: Option<UsageSnapshot>,
    /// Shown one at a time, oldest first.
    notices: VecDeque<Notice>,
}

impl App {
    pub fn new(io_tx: tokio::sync::mpsc::Sender<IoEvent>) -> Self {
        let state = AppState::default();
        let actions = state.get_actions();

        Self {
            containers: Vec::new(),
            images: Vec::new(),
            io_tx,
            actions,
            state,
            selected_container: None,
            selected_image: None,
            logs: Vec::new(),
            log_position: 0,
            search: None,
            usage: None,
            notices: VecDeque::new(),
        }
    }

    /// Handle a user action
    pub async fn do_action(&mut self, key: Key) -> AppReturn {
        // A notice is modal, any key dismisses it.
        if self.notices.pop_front().is_some() {
            return AppReturn::Continue;
        }
        if let (Some(search), Some(c)) = (self.search.as_mut(), key.get_char()) {
            search.push(c);
            return AppReturn::Continue;
        }
        let action = match self.actions.find(key) {
            Some(action) => *action,
            None => return AppReturn::Continue,
        };
        match self.state {
            AppState::Containers => self.do_containers_actions(action).await,
            AppState::Images => self.do_images_actions(action).await,
            AppState::Logs { .. } => self.do_logging_actions(action).await,
            AppState::Usage { .. } => self.do_usage_actions(action).await,
        }
    }

    fn set_state(&mut self, state: AppState) {
        self.state = state;
        self.actions = self.state.get_actions();
    }

    /// Selected container id, or an error notice asking to pick one.
    fn require_container(&mut self, what: &str) -> Option<String> {
        if self.selected_container.is_none() {
            self.notify(Notice::error(
                "Error",
                format!("Please select a container to {}.", what),
            ));
        }
        self.selected_container.clone()
    }

    fn require_image(&mut self, what: &str) -> Option<ImageRow> {
        let image = self.selected_image_row().cloned();
        if image.is_none() {
            self.notify(Notice::error(
                "Error",
                format!("Please select an image to {}.", what),
            ));
        }
        image
    }

    async fn do_containers_actions(&mut self, action: Action) -> AppReturn {
        match action {
            Action::Quit => return AppReturn::Exit,
            Action::SwitchTab => self.set_state(AppState::Images),
            Action::Next => self.next(),
            Action::Previous => self.previous(),
            Action::Refresh => self.dispatch(IoEvent::RefreshContainers),
            Action::StartContainer => {
                if let Some(id) = self.require_container("start") {
                    self.dispatch(IoEvent::StartContainer(id));
                }
            }
            Action::StopContainer => {
                if let Some(id) = self.require_container("stop") {
                    self.dispatch(IoEvent::StopContainer(id));
                }
            }
            Action::RemoveContainer => {
                if let Some(id) = self.require_container("remove") {
                    self.dispatch(IoEvent::RemoveContainer(id));
                }
            }
            Action::ShowLogs => {
                if let Some(id) = self.require_container("view logs") {
                    self.logs.clear();
                    self.log_position = 0;
                    self.search = None;
                    self.set_state(AppState::Logs {
                        container: id.clone(),
                    });
                    self.dispatch(IoEvent::ShowLogs(id));
                }
            }
            Action::ShowUsage => {
                if let Some(id) = self.require_container("view usage") {
                    self.usage = None;
                    self.set_state(AppState::Usage {
                        container: id.clone(),
                    });
                    self.dispatch(IoEvent::ShowUsage(id));
                }
            }
            _ => {}
        }
        AppReturn::Continue
    }

    async fn do_images_actions(&mut self, action: Action) -> AppReturn {
        match action {
            Action::Quit => return AppReturn::Exit,
            Action::SwitchTab => self.set_state(AppState::Containers),
            Action::Next => self.next(),
            Action::Previous => self.previous(),
            Action::Refresh => self.dispatch(IoEvent::RefreshImages),
            Action::RunImage => {
                if let Some(image) = self.require_image("run") {
                    self.dispatch(IoEvent::RunImage(image.reference()));
                }
            }
            Action::RunImageInteractive => {
                if let Some(image) = self.require_image("run in interactive mode") {
                    self.dispatch(IoEvent::RunImageInteractive(image.reference()));
                }
            }
            Action::RemoveImage => {
                if let Some(image) = self.require_image("remove") {
                    self.dispatch(IoEvent::RemoveImage(image.id));
                }
            }
            _ => {}
        }
        AppReturn::Continue
    }

    async fn do_logging_actions(&mut self, action: Action) -> AppReturn {
        match action {
            Action::Quit => {
                if self.search.is_some() {
                    self.search = None;
                    return AppReturn::Continue;
                }
                self.logs.clear();
                self.log_position = 0;
                self.set_state(AppState::Containers);
                self.dispatch(IoEvent::StopBackground);
            }
            Action::ScrollDown => {
                self.log_position = self.log_position.saturating_sub(1);
            }
            Action::ScrollUp => {
                if self.log_position + 1 < self.logs.len() {
                    self.log_position += 1;
                }
            }
            Action::Search => {
                if let Some(search_text) = self.search.as_deref() {
                    if let Some(line) = self
                        .logs
                        .iter()
                        .rev()
                        .skip(self.log_position + 1)
                        .position(|line| line.contains(search_text))
                    {
                        self.log_position += line + 1;
                    }
                } else {
                    self.search = Some(String::new());
                }
            }
            Action::DeleteChar => {
                if let Some(search) = self.search.as_mut() {
                    search.pop();
                }
            }
            _ => {}
        }
        AppReturn::Continue
    }

    async fn do_usage_actions(&mut self, action: Action) -> AppReturn {
        if action == Action::Quit {
            self.usage = None;
            self.set_state(AppState::Containers);
            self.dispatch(IoEvent::StopBackground);
        }
        AppReturn::Continue
    }

    /// Queues `action` for the IO handler without waiting. The UI holds the
    /// app lock here and the handler needs it to make progress, so a full
    /// queue drops the request instead of blocking.
    pub fn dispatch(&mut self, action: IoEvent) {
        debug!("Dispatch {:?}", action);
        match self.io_tx.try_send(action) {
            Ok(()) => {}
            Err(TrySendError::Full(action)) => {
                warn!("IO queue full, dropping {:?}", action);
                self.notify(Notice::warning(
                    "Busy",
                    "Still working on earlier requests, try again.",
                ));
            }
            Err(TrySendError::Closed(action)) => {
                error!("IO handler gone, dropping {:?}", action);
            }
        }
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }
    pub fn state(&self) -> &AppState {
        &self.state
    }
    pub fn containers(&self) -> &[ContainerRow] {
        &self.containers
    }
    pub fn images(&self) -> &[ImageRow] {
        &self.images
    }
    pub fn selected_container(&self) -> Option<&str> {
        self.selected_container.as_deref()
    }
    pub fn selected_container_index(&self) -> Option<usize> {
        self.selected_container
            .as_ref()
            .and_then(|id| self.containers.iter().position(|c| c.id == *id))
    }
    pub fn selected_image_index(&self) -> Option<usize> {
        self.selected_image
            .as_ref()
            .and_then(|id| self.images.iter().position(|i| i.id == *id))
    }
    fn selected_image_row(&self) -> Option<&ImageRow> {
        self.selected_image_index().map(|i| &self.images[i])
    }
    pub fn logs(&self) -> &[String] {
        &self.logs
    }
    pub fn log_position(&self) -> usize {
        self.log_position
    }
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
    pub fn usage(&self) -> Option<&UsageSnapshot> {
        self.usage.as_ref()
    }
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    fn move_selection(&mut self, forward: bool) {
        let on_images = self.state.is_images();
        let (len, current) = if on_images {
            (self.images.len(), self.selected_image_index())
        } else {
            (self.containers.len(), self.selected_container_index())
        };
        if len == 0 {
            return;
        }
        let index = match current {
            Some(idx) if forward => (idx + 1).min(len - 1),
            Some(idx) => idx.saturating_sub(1),
            None => 0,
        };
        if on_images {
            self.selected_image = Some(self.images[index].id.clone());
        } else {
            self.selected_container = Some(self.containers[index].id.clone());
        }
    }

    pub fn next(&mut self) {
        self.move_selection(true);
    }

    pub fn previous(&mut self) {
        self.move_selection(false);
    }
}

impl ContainerManagement for App {
    fn set_containers(&mut self, containers: Vec<ContainerRow>) {
        self.containers = containers;
        if self.selected_container_index().is_none() {
            self.selected_container = self.containers.first().map(|c| c.id.clone());
        }
    }

    fn set_images(&mut self, images: Vec<ImageRow>) {
        self.images = images;
        if self.selected_image_index().is_none() {
            self.selected_image = self.images.first().map(|i| i.id.clone());
        }
    }

    fn add_logs(&mut self, logs: Vec<String>) {
        if !self.state.is_logging() {
            return;
        }
        self.logs.extend(logs);
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
            self.log_position = self.log_position.min(self.logs.len().saturating_sub(1));
        }
    }

    fn update_usage(&mut self, usage: UsageSnapshot) {
        // A sampler that was just cancelled may still land one snapshot.
        if self.state.is_usage() && self.state.container() == Some(usage.container_id.as_str()) {
            self.usage = Some(usage);
        }
    }

    fn notify(&mut self, notice: Notice) {
        // Repeated requests (e.g. holding refresh) would stack the same popup.
        if self.notices.back() != Some(&notice) {
            self.notices.push_back(notice);
        }
    }
}
