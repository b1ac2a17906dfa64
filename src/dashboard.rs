use std::sync::Arc;

use anyhow::{bail, Result};

use crate::{
    charts::{ChartType, DurationDataset, SadPathDataset},
    config::DashboardConfig,
    db::Database,
    log_info,
    notify::{LogNotifier, Notifier},
    session::SessionProvider,
    store::CustomValueStore,
    workflow::EditWorkflow,
};

const ENABLE_LOGS: bool = true;

/// Both chart workflows. They share the store and notifier handles but
/// nothing mutable, so editing one chart never affects the other.
#[derive(Clone)]
pub struct Dashboard {
    pub duration: EditWorkflow<DurationDataset>,
    pub sad_path: EditWorkflow<SadPathDataset>,
    display_name: String,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn CustomValueStore>,
        notifier: Arc<dyn Notifier>,
        config: &DashboardConfig,
        session: &dyn SessionProvider,
    ) -> Result<Self> {
        if !session.is_authenticated() {
            bail!("sign in before opening the dashboard");
        }

        let duration = EditWorkflow::new(
            DurationDataset::default(),
            store.clone(),
            notifier.clone(),
        )
        .with_request_timeout(config.request_timeout);
        let sad_path = EditWorkflow::new(SadPathDataset::default(), store, notifier)
            .with_request_timeout(config.request_timeout);

        Ok(Self {
            duration,
            sad_path,
            display_name: session.display_name(),
        })
    }

    /// Opens the SQLite store at `config.database_path` and reports outcomes
    /// through the logger.
    pub fn open(config: &DashboardConfig, session: &dyn SessionProvider) -> Result<Self> {
        let database = Database::new(config.database_path.clone())?;
        let dashboard = Self::new(Arc::new(database), Arc::new(LogNotifier), config, session)?;
        log_info!("Dashboard ready for {}", dashboard.display_name);
        Ok(dashboard)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn charts(&self) -> [ChartType; 2] {
        [ChartType::Duration, ChartType::SadPath]
    }

    pub fn welcome(&self) -> String {
        format!("Welcome, {}", self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        charts::{DurationEdit, DurationField},
        notify::RecordingNotifier,
        store::MemoryStore,
        workflow::WorkflowState,
    };

    struct FixedSession(bool);

    impl SessionProvider for FixedSession {
        fn is_authenticated(&self) -> bool {
            self.0
        }

        fn display_name(&self) -> String {
            "analyst".into()
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            &DashboardConfig::default(),
            &FixedSession(true),
        )
        .unwrap()
    }

    #[test]
    fn requires_an_authenticated_session() {
        let result = Dashboard::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            &DashboardConfig::default(),
            &FixedSession(false),
        );
        assert!(result.is_err());
        assert_eq!(dashboard().welcome(), "Welcome, analyst");
    }

    #[tokio::test]
    async fn chart_workflows_are_independent() {
        let dashboard = dashboard();
        dashboard.duration.begin_edit().await.unwrap();
        dashboard.duration.submit_email("a@b.com").await.unwrap();
        dashboard
            .duration
            .edit(DurationEdit {
                index: 0,
                field: DurationField::Frequency,
                value: 3.0,
            })
            .await
            .unwrap();

        assert_eq!(dashboard.duration.state().await, WorkflowState::Editing);
        assert_eq!(dashboard.sad_path.state().await, WorkflowState::Idle);
        assert_eq!(dashboard.sad_path.displayed().await, SadPathDataset::default());
    }

    #[tokio::test]
    async fn open_uses_sqlite_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            database_path: dir.path().join("dash.sqlite3"),
            ..DashboardConfig::default()
        };

        let dashboard = Dashboard::open(&config, &FixedSession(true)).unwrap();
        dashboard.sad_path.begin_edit().await.unwrap();
        dashboard.sad_path.submit_email("a@b.com").await.unwrap();
        dashboard.sad_path.save().await.unwrap();

        assert!(config.database_path.exists());
        assert_eq!(dashboard.sad_path.state().await, WorkflowState::Idle);
    }
}
