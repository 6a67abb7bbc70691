use std::convert::Infallible;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{Duration, Utc};
use futures::Stream;
use invoicing_core::error::AppError;
use serde::{Deserialize, Serialize};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use crate::{
    AppState,
    dtos::{MessageResponse, NotificationResponse, Pagination, PaginationParams},
    middleware::AuthUser,
};

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ClearOldParams {
    pub days: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let pagination = PaginationParams {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(20),
    };

    let (notifications, total) = state
        .notifications
        .list_for_user(
            &claims.sub,
            params.unread_only,
            pagination.skip(),
            pagination.limit(),
        )
        .await?;

    Ok(Json(NotificationListResponse {
        notifications: notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
        pagination: Pagination::new(&pagination, total),
    }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let unread_count = state.notifications.unread_count(&claims.sub).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, AppError> {
    let mut notification = state
        .notifications
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Notification not found")))?;

    notification.mark_read();
    state.notifications.replace(&notification).await?;

    Ok(Json(notification.into()))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let count = state.notifications.mark_all_read(&claims.sub).await?;
    Ok(Json(MessageResponse::new(format!(
        "Marked {} notifications as read",
        count
    ))))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state.notifications.delete_for_user(&claims.sub, &id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow!("Notification not found")));
    }
    Ok(Json(MessageResponse::new("Notification deleted")))
}

/// Admin-only cleanup of old notifications across all users.
pub async fn clear_old(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<ClearOldParams>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;
    if !user.is_admin() {
        return Err(AppError::Forbidden(anyhow!("Admin access required")));
    }

    let days = params.days.unwrap_or(30);
    let cutoff = Utc::now() - Duration::days(days);
    let count = state.notifications.delete_older_than(cutoff).await?;

    tracing::info!(count, days, "Old notifications cleared");

    Ok(Json(MessageResponse::new(format!(
        "Deleted {} notifications older than {}",
        count,
        cutoff.to_rfc3339()
    ))))
}

/// Realtime notification stream. Every event on the hub is fanned out to
/// all connected clients; each connection filters to its own user.
pub async fn notification_stream(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.hub.subscribe();
    let user_id = claims.sub;

    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let notification = match result {
            Ok(notification) if notification.user_id == user_id => notification,
            // Lagged receivers drop missed events and keep streaming
            _ => return None,
        };

        let payload =
            serde_json::to_string(&NotificationResponse::from(notification)).ok()?;
        Some(Ok(Event::default().event("notification").data(payload)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
