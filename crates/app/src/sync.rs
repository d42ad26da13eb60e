//! Debounced persistence. Every mutation schedules a full-state
//! snapshot; snapshots arriving within the quiet window coalesce and
//! only the newest is written. A failed write is logged and the next
//! mutation retries naturally.

use std::time::Duration;

use rateio_core::AppState;
use rateio_storage::DbPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

pub struct Synchronizer {
    tx: mpsc::UnboundedSender<AppState>,
    handle: JoinHandle<()>,
}

impl Synchronizer {
    /// Starts the background writer for one user's blob.
    pub fn spawn(pool: DbPool, user_id: String, debounce: Duration) -> Synchronizer {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(writer_loop(pool, user_id, debounce, rx));
        Synchronizer { tx, handle }
    }

    /// Queues a snapshot for saving. Never blocks the mutation path;
    /// if the writer has already shut down the snapshot is dropped.
    pub fn schedule(&self, state: &AppState) {
        if self.tx.send(state.clone()).is_err() {
            tracing::warn!("gravador de estado encerrado, snapshot descartado");
        }
    }

    /// Flushes any pending snapshot and stops the writer.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::warn!("gravador de estado terminou com erro: {e}");
        }
    }
}

async fn writer_loop(
    pool: DbPool,
    user_id: String,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<AppState>,
) {
    while let Some(mut latest) = rx.recv().await {
        // Coalesce until the channel stays quiet for the whole window.
        let closed = loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(newer)) => latest = newer,
                Ok(None) => break true,
                Err(_) => break false,
            }
        };

        match rateio_storage::save_state(&pool, &user_id, &latest).await {
            Ok(()) => tracing::debug!(user = %user_id, "estado salvo"),
            Err(e) => tracing::warn!(user = %user_id, "falha ao salvar estado: {e}"),
        }

        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rateio_core::{Money, Owner};

    async fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = rateio_storage::create_db(&dir.path().join("test.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn burst_of_snapshots_saves_the_newest() {
        let (_dir, pool) = test_pool().await;
        let sync = Synchronizer::spawn(pool.clone(), "ana".into(), Duration::from_millis(20));

        let mut state = AppState::new();
        for month in ["Janeiro", "Fevereiro", "Março"] {
            state.create_month(month);
            sync.schedule(&state);
        }
        sync.shutdown().await;

        let loaded = rateio_storage::load_state(&pool, "ana").await.unwrap();
        assert_eq!(loaded.month_order.len(), 3);
        assert_eq!(loaded.selected_month.as_deref(), Some("Março"));
    }

    #[tokio::test]
    async fn quiet_window_triggers_a_write_without_shutdown() {
        let (_dir, pool) = test_pool().await;
        let sync = Synchronizer::spawn(pool.clone(), "ana".into(), Duration::from_millis(10));

        let mut state = AppState::new();
        state.set_income(Owner::Me, Money::from_cents(300000));
        sync.schedule(&state);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let loaded = rateio_storage::load_state(&pool, "ana").await.unwrap();
        assert_eq!(loaded.income(Owner::Me), Money::from_cents(300000));

        sync.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_with_nothing_pending_is_clean() {
        let (_dir, pool) = test_pool().await;
        let sync = Synchronizer::spawn(pool, "ana".into(), DEFAULT_DEBOUNCE);
        sync.shutdown().await;
    }
}
