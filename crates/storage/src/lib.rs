pub mod db;

pub use db::{
    accept_grant, create_db, grant_access, load_state, load_state_of, pending_grants,
    resolve_identity, revoke_access, save_state, DbPool, StorageError,
};
