use crate::command::{Command, CommandPlan, Step};
use crate::connection::Connection;
use crate::error::{MixerError, Result};
use crate::refresh::RefreshOrchestrator;
use crate::state::Notification;
use std::sync::Arc;

/// Sends commands to the mixer and re-synchronises afterwards
///
/// Holds no state of its own: the plan is computed from the current
/// document, issued, and followed by a refresh once the command's settle
/// delay has passed.
#[derive(Clone)]
pub struct CommandDispatcher {
    connection: Connection,
    refresher: Arc<RefreshOrchestrator>,
}

impl CommandDispatcher {
    /// Create a new dispatcher refreshing through `refresher`
    pub fn new(connection: Connection, refresher: Arc<RefreshOrchestrator>) -> Self {
        Self {
            connection,
            refresher,
        }
    }

    /// Run a command, wait its settle delay, then refresh
    ///
    /// Never fails: a failed call is logged and published as a notification,
    /// and the refresh runs regardless so the view reconciles with the mixer.
    pub async fn execute(&self, command: Command) {
        let state = self.refresher.state();
        let plan = command.plan(state.current().as_deref());

        tracing::info!("Executing {} on input {}", command.label(), command.input());

        if let Err(e) = self.try_run(&plan).await {
            tracing::error!("Command {} failed: {}", command.label(), e);
            state.notify_user(Notification::error(format!(
                "Failed to {}",
                command.label()
            )));
        }

        tokio::time::sleep(plan.settle).await;

        if let Err(e) = self.refresher.refresh().await {
            tracing::debug!("Refresh after {} failed: {}", command.label(), e);
        }
    }

    /// Issue the plan's steps in order, stopping at the first failed call
    ///
    /// Calls already made are not rolled back.
    pub async fn try_run(&self, plan: &CommandPlan) -> Result<()> {
        for step in &plan.steps {
            match step {
                Step::Call(call) => {
                    self.connection
                        .call(call)
                        .await
                        .map_err(|e| MixerError::Command {
                            function: call.function().to_string(),
                            source: Box::new(e),
                        })?;
                }
                Step::Wait(delay) => tokio::time::sleep(*delay).await,
            }
        }
        Ok(())
    }
}
