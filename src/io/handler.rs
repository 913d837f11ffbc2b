use std::sync::Arc;

use eyre::Result;
use log::{error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::IoEvent;

use crate::app::App;
use crate::config::Config;
use crate::container_management::{
    follow_logs, ContainerManagement, ContainerRow, DockerCli, EngineError, ImageRow, Notice,
};
use crate::usage::{run_sampler, SystemProbe};

/// Runs engine work off the UI loop. At most one long running task (log
/// follower or usage sampler) is alive at a time.
pub struct IoAsyncHandler {
    app: Arc<Mutex<App>>,
    docker: DockerCli,
    config: Config,
    active_task: Option<JoinHandle<()>>,
}

impl IoAsyncHandler {
    pub fn new(app: Arc<tokio::sync::Mutex<App>>, config: Config) -> Self {
        Self {
            app,
            docker: DockerCli::new(config.engine_binary.clone()),
            config,
            active_task: None,
        }
    }

    /// Runs one request to completion. Long running work is spawned and
    /// tracked in `active_task` instead.
    pub async fn handle_io_event(&mut self, io_event: IoEvent) {
        let result = match io_event {
            IoEvent::Initialize => self.initialize().await,
            IoEvent::RefreshContainers => self.refresh_containers().await,
            IoEvent::RefreshImages => self.refresh_images().await,
            IoEvent::StartContainer(id) => self.start_container(id).await,
            IoEvent::StopContainer(id) => self.stop_container(id).await,
            IoEvent::RemoveContainer(id) => self.remove_container(id).await,
            IoEvent::ShowLogs(id) => self.start_logs_monitoring(id).await,
            IoEvent::ShowUsage(id) => self.start_usage_sampling(id).await,
            IoEvent::StopBackground => {
                self.abort_current_task().await;
                Ok(())
            }
            IoEvent::RemoveImage(id) => self.remove_image(id).await,
            IoEvent::RunImage(reference) => self.run_image(reference).await,
            IoEvent::RunImageInteractive(reference) => {
                self.run_image_interactive(reference).await
            }
        };

        if let Err(err) = result {
            error!("Oops, something wrong happen: {:?}", err);
        }
    }

    async fn notify(&self, notice: Notice) {
        self.app.lock().await.notify(notice);
    }

    /// Shows `title` with the engine output on success, the engine error otherwise.
    async fn report(&self, title: &str, result: Result<String, EngineError>) {
        let notice = match result {
            Ok(out) => Notice::info(title, out.trim().to_string()),
            Err(e) => {
                error!("{} failed: {}", title, e);
                Notice::error(title, e.user_message())
            }
        };
        self.notify(notice).await;
    }

    async fn abort_current_task(&mut self) {
        if let Some(task) = self.active_task.take() {
            task.abort();
            // Waiting makes sure the task and its buffer are gone.
            let _ = task.await;
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        let (containers, images) =
            futures::join!(self.docker.list_containers(), self.docker.list_images());
        self.apply_containers(containers).await;
        self.apply_images(images).await;
        Ok(())
    }

    async fn apply_containers(&self, containers: Result<Vec<ContainerRow>, EngineError>) {
        let mut app = self.app.lock().await;
        match containers {
            Ok(rows) => {
                if rows.is_empty() {
                    app.notify(Notice::warning("No Containers", "No containers found."));
                }
                app.set_containers(rows);
            }
            Err(e) => {
                error!("Error fetching container list: {}", e);
                app.notify(Notice::error("Error", "Error fetching container list."));
            }
        }
    }

    async fn apply_images(&self, images: Result<Vec<ImageRow>, EngineError>) {
        let mut app = self.app.lock().await;
        match images {
            Ok(rows) => {
                if rows.is_empty() {
                    app.notify(Notice::warning("No Images", "No images found."));
                }
                app.set_images(rows);
            }
            Err(e) => {
                error!("Error fetching image list: {}", e);
                app.notify(Notice::error("Error", "Failed to fetch images."));
            }
        }
    }

    async fn refresh_containers(&mut self) -> Result<()> {
        let containers = self.docker.list_containers().await;
        self.apply_containers(containers).await;
        Ok(())
    }

    async fn refresh_images(&mut self) -> Result<()> {
        let images = self.docker.list_images().await;
        self.apply_images(images).await;
        Ok(())
    }

    async fn start_container(&mut self, container_id: String) -> Result<()> {
        let result = self
            .docker
            .start_container(&container_id)
            .await
            .map(|_| format!("started container {}", container_id));
        self.report("Start", result).await;
        self.refresh_containers().await
    }

    async fn stop_container(&mut self, container_id: String) -> Result<()> {
        let result = self.docker.stop_container(&container_id).await;
        self.report("Stop", result).await;
        self.refresh_containers().await
    }

    async fn remove_container(&mut self, container_id: String) -> Result<()> {
        let result = self.docker.remove_container(&container_id).await;
        self.report("Remove", result).await;
        self.refresh_containers().await
    }

    async fn start_logs_monitoring(&mut self, container_id: String) -> Result<()> {
        self.abort_current_task().await;
        info!("Start monitoring logs for container: {}", container_id);
        let app = Arc::clone(&self.app);
        let docker = self.docker.clone();
        let interval = self.config.log_follow_interval();
        let t = tokio::spawn(async move {
            follow_logs(docker, container_id, interval, app).await;
        });
        self.active_task = Some(t);
        Ok(())
    }

    async fn start_usage_sampling(&mut self, container_id: String) -> Result<()> {
        self.abort_current_task().await;
        let app = Arc::clone(&self.app);
        let docker = self.docker.clone();
        let settings = self.config.sampler_settings();
        let t = tokio::spawn(async move {
            run_sampler(container_id, settings, docker, SystemProbe::new(), app).await;
        });
        self.active_task = Some(t);
        Ok(())
    }

    async fn remove_image(&mut self, image_id: String) -> Result<()> {
        let result = self.docker.remove_image(&image_id).await;
        self.report("Remove Image", result).await;
        self.refresh_images().await
    }

    async fn run_image(&mut self, reference: String) -> Result<()> {
        let result = self
            .docker
            .run_image(&reference)
            .await
            .map(|_| format!("Image '{}' is now running.", reference));
        self.report("Run Image", result).await;
        self.refresh_containers().await
    }

    async fn run_image_interactive(&mut self, reference: String) -> Result<()> {
        let result = self
            .docker
            .run_image_interactive(&reference, &self.config.terminals)
            .map(|_| format!("Interactive session started for '{}'.", reference));
        self.report("Interactive Run", result).await;
        self.refresh_containers().await
    }
}
