use crate::errors::AppError;
use crate::models::ClubData;
use crate::storage::persist_data;
use axum::http::HeaderMap;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Shared service context, built once at startup by the binary.
///
/// `data` always holds the last snapshot that reached disk. Writers build
/// the next snapshot from it, persist that, and only then swap it in, so
/// a failed write leaves memory and disk agreeing on the old state.
/// Concurrent replacements (local edits and sync pushes) are last write
/// wins.
#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub admin_token: Option<String>,
    pub data: Arc<Mutex<ClubData>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, admin_token: Option<String>, data: ClubData) -> Self {
        Self {
            data_path,
            admin_token,
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn is_privileged(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.admin_token.as_deref() else {
            return false;
        };
        headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|token| token == expected)
    }

    /// Persists `next` and installs it as the current snapshot.
    pub async fn commit(&self, current: &mut ClubData, next: ClubData) -> Result<(), AppError> {
        persist_data(&self.data_path, &next).await?;
        *current = next;
        Ok(())
    }
}
