use rateio_core::AppState;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Erro de banco de dados: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Dados salvos corrompidos: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Usuário {actor} não tem acesso aos dados de {owner}")]
    Unauthorized { actor: String, owner: String },
    #[error("Nenhum convite de {owner} para {guest}")]
    GrantNotFound { owner: String, guest: String },
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_state (
            user_id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS share_grants (
            owner_id TEXT NOT NULL,
            guest_id TEXT NOT NULL,
            accepted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (owner_id, guest_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Maps a user to the identity whose blob their operations act on.
/// A guest with an accepted grant is redirected to the grant's owner;
/// everyone else acts on their own blob. With a single accepted grant
/// per guest the oldest one wins.
pub async fn resolve_identity(pool: &DbPool, user_id: &str) -> Result<String, StorageError> {
    let owner = sqlx::query_as::<_, (String,)>(
        "SELECT owner_id FROM share_grants WHERE guest_id = ? AND accepted = 1 ORDER BY created_at LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(owner.map(|r| r.0).unwrap_or_else(|| user_id.to_string()))
}

/// Loads the state blob the user acts on, following grant redirection.
/// A user with no saved blob starts from an empty state.
pub async fn load_state(pool: &DbPool, user_id: &str) -> Result<AppState, StorageError> {
    let identity = resolve_identity(pool, user_id).await?;
    load_blob(pool, &identity).await
}

/// Saves the whole state as one JSON blob under the identity the user
/// acts on. Last write wins.
pub async fn save_state(
    pool: &DbPool,
    user_id: &str,
    state: &AppState,
) -> Result<(), StorageError> {
    let identity = resolve_identity(pool, user_id).await?;
    let data = serde_json::to_string(state)?;
    sqlx::query(
        r#"
        INSERT INTO user_state (user_id, data, updated_at) VALUES (?, ?, datetime('now'))
        ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
        "#,
    )
    .bind(&identity)
    .bind(&data)
    .execute(pool)
    .await?;
    Ok(())
}

/// Loads a specific owner's blob on behalf of `actor`. Reading someone
/// else's data requires an accepted grant.
pub async fn load_state_of(
    pool: &DbPool,
    actor: &str,
    owner: &str,
) -> Result<AppState, StorageError> {
    ensure_access(pool, actor, owner).await?;
    load_blob(pool, owner).await
}

async fn load_blob(pool: &DbPool, identity: &str) -> Result<AppState, StorageError> {
    let row = sqlx::query_as::<_, (String,)>("SELECT data FROM user_state WHERE user_id = ?")
        .bind(identity)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((data,)) => Ok(serde_json::from_str(&data)?),
        None => Ok(AppState::new()),
    }
}

async fn ensure_access(pool: &DbPool, actor: &str, owner: &str) -> Result<(), StorageError> {
    if actor == owner {
        return Ok(());
    }
    let granted = sqlx::query_as::<_, (i64,)>(
        "SELECT 1 FROM share_grants WHERE owner_id = ? AND guest_id = ? AND accepted = 1",
    )
    .bind(owner)
    .bind(actor)
    .fetch_optional(pool)
    .await?;

    if granted.is_some() {
        Ok(())
    } else {
        Err(StorageError::Unauthorized {
            actor: actor.to_string(),
            owner: owner.to_string(),
        })
    }
}

/// Invites `guest` to act on `owner`'s data. The invitation stays
/// pending until the guest accepts it. Re-inviting is a no-op.
pub async fn grant_access(pool: &DbPool, owner: &str, guest: &str) -> Result<(), StorageError> {
    sqlx::query("INSERT OR IGNORE INTO share_grants (owner_id, guest_id) VALUES (?, ?)")
        .bind(owner)
        .bind(guest)
        .execute(pool)
        .await?;
    Ok(())
}

/// Accepts a pending invitation. From this point the guest's reads and
/// writes act on the owner's blob.
pub async fn accept_grant(pool: &DbPool, owner: &str, guest: &str) -> Result<(), StorageError> {
    let result =
        sqlx::query("UPDATE share_grants SET accepted = 1 WHERE owner_id = ? AND guest_id = ?")
            .bind(owner)
            .bind(guest)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::GrantNotFound {
            owner: owner.to_string(),
            guest: guest.to_string(),
        });
    }
    Ok(())
}

/// Removes a grant, pending or accepted. The guest falls back to their
/// own blob on the next operation.
pub async fn revoke_access(pool: &DbPool, owner: &str, guest: &str) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM share_grants WHERE owner_id = ? AND guest_id = ?")
        .bind(owner)
        .bind(guest)
        .execute(pool)
        .await?;
    Ok(())
}

/// Owners whose invitations to `guest` are still awaiting acceptance.
pub async fn pending_grants(pool: &DbPool, guest: &str) -> Result<Vec<String>, StorageError> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT owner_id FROM share_grants WHERE guest_id = ? AND accepted = 0 ORDER BY created_at",
    )
    .bind(guest)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rateio_core::{Money, Owner};

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn missing_user_loads_empty_state() {
        let (_dir, pool) = test_db().await;
        let state = load_state(&pool, "ana").await.unwrap();
        assert!(state.months_data.is_empty());
        assert!(state.month_order.is_empty());
    }

    #[tokio::test]
    async fn save_load_round_trips() {
        let (_dir, pool) = test_db().await;

        let mut state = AppState::new();
        state.create_month("Janeiro");
        state.set_income(Owner::Me, Money::from_cents(450000));
        save_state(&pool, "ana", &state).await.unwrap();

        let loaded = load_state(&pool, "ana").await.unwrap();
        assert_eq!(loaded.month_order, vec!["Janeiro".to_string()]);
        assert_eq!(loaded.selected_month.as_deref(), Some("Janeiro"));
        assert_eq!(loaded.income(Owner::Me), Money::from_cents(450000));
    }

    #[tokio::test]
    async fn second_save_overwrites() {
        let (_dir, pool) = test_db().await;

        let mut state = AppState::new();
        state.create_month("Janeiro");
        save_state(&pool, "ana", &state).await.unwrap();
        state.create_month("Fevereiro");
        save_state(&pool, "ana", &state).await.unwrap();

        let loaded = load_state(&pool, "ana").await.unwrap();
        assert_eq!(loaded.month_order.len(), 2);
    }

    #[tokio::test]
    async fn pending_grant_does_not_redirect() {
        let (_dir, pool) = test_db().await;

        let mut state = AppState::new();
        state.create_month("Janeiro");
        save_state(&pool, "ana", &state).await.unwrap();
        grant_access(&pool, "ana", "bia").await.unwrap();

        assert_eq!(resolve_identity(&pool, "bia").await.unwrap(), "bia");
        let guest_view = load_state(&pool, "bia").await.unwrap();
        assert!(guest_view.month_order.is_empty());
        assert_eq!(pending_grants(&pool, "bia").await.unwrap(), vec!["ana"]);
    }

    #[tokio::test]
    async fn accepted_grant_redirects_reads_and_writes() {
        let (_dir, pool) = test_db().await;

        let mut state = AppState::new();
        state.create_month("Janeiro");
        save_state(&pool, "ana", &state).await.unwrap();

        grant_access(&pool, "ana", "bia").await.unwrap();
        accept_grant(&pool, "ana", "bia").await.unwrap();

        assert_eq!(resolve_identity(&pool, "bia").await.unwrap(), "ana");
        let mut shared = load_state(&pool, "bia").await.unwrap();
        assert_eq!(shared.month_order, vec!["Janeiro".to_string()]);

        shared.create_month("Fevereiro");
        save_state(&pool, "bia", &shared).await.unwrap();

        let owner_view = load_state(&pool, "ana").await.unwrap();
        assert_eq!(owner_view.month_order.len(), 2);
    }

    #[tokio::test]
    async fn foreign_read_without_grant_is_unauthorized() {
        let (_dir, pool) = test_db().await;

        save_state(&pool, "ana", &AppState::new()).await.unwrap();
        let err = load_state_of(&pool, "bia", "ana").await.unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn accepting_nonexistent_grant_fails() {
        let (_dir, pool) = test_db().await;
        let err = accept_grant(&pool, "ana", "bia").await.unwrap_err();
        assert!(matches!(err, StorageError::GrantNotFound { .. }));
    }

    #[tokio::test]
    async fn revoking_restores_own_blob() {
        let (_dir, pool) = test_db().await;

        let mut state = AppState::new();
        state.create_month("Janeiro");
        save_state(&pool, "ana", &state).await.unwrap();
        grant_access(&pool, "ana", "bia").await.unwrap();
        accept_grant(&pool, "ana", "bia").await.unwrap();
        revoke_access(&pool, "ana", "bia").await.unwrap();

        assert_eq!(resolve_identity(&pool, "bia").await.unwrap(), "bia");
        let own = load_state(&pool, "bia").await.unwrap();
        assert!(own.month_order.is_empty());
    }
}
