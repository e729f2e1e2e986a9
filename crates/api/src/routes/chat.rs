use axum::{extract::State, http::HeaderMap, Json};
use carelink_database::Doctor;
use serde::Serialize;

use crate::{routes::models::CollectionResponse, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct InboxEntry {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub online: bool,
}

/// Doctors a signed-in user can write to, flagged with live presence.
pub async fn inbox(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CollectionResponse<InboxEntry>>, ApiError> {
    state.protect(&headers).await?;

    let doctors = state.authenticator().doctors().list_all().await?;
    let mut entries = Vec::with_capacity(doctors.len());
    for doctor in doctors {
        let online = state
            .hub()
            .presence()
            .get_user(&doctor.public_id)
            .await
            .is_some();
        entries.push(InboxEntry { doctor, online });
    }

    Ok(Json(CollectionResponse::from(entries)))
}
