use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    dtos::{ClientResponse, MessageResponse, Pagination, PaginationParams},
    middleware::AuthUser,
    models::{Client, NewClient},
    services::{ClientEvent, repository::ClientListFilter},
};

#[derive(Debug, Deserialize)]
pub struct ClientListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
}

impl ClientListParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(10),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1))]
    pub company_name: String,
    #[serde(default)]
    pub contact_person: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[validate(length(min = 1))]
    pub billing_address: String,
    #[validate(length(min = 1))]
    pub billing_city: String,
    #[serde(default)]
    pub billing_state: String,
    #[serde(default)]
    pub billing_zip_code: String,
    #[validate(length(min = 1))]
    pub billing_country: String,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip_code: Option<String>,
    pub shipping_country: Option<String>,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_zip_code: Option<String>,
    pub billing_country: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_zip_code: Option<String>,
    pub shipping_country: Option<String>,
    pub tax_id: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

pub async fn list_clients(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<ClientListParams>,
) -> Result<Json<ClientListResponse>, AppError> {
    let filter = ClientListFilter {
        search: params.search.clone(),
        tags: params
            .tags
            .as_deref()
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let pagination = params.pagination();
    let (clients, total) = state
        .clients
        .list_for_user(&claims.sub, &filter, pagination.skip(), pagination.limit())
        .await?;

    Ok(Json(ClientListResponse {
        clients: clients.into_iter().map(ClientResponse::from).collect(),
        pagination: Pagination::new(&pagination, total),
    }))
}

pub async fn get_client(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state
        .clients
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Client not found")))?;

    Ok(Json(client.into()))
}

pub async fn create_client(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = Client::new(NewClient {
        user_id: claims.sub.clone(),
        company_name: body.company_name,
        contact_person: body.contact_person,
        email: body.email,
        phone: body.phone,
        billing_address: body.billing_address,
        billing_city: body.billing_city,
        billing_state: body.billing_state,
        billing_zip_code: body.billing_zip_code,
        billing_country: body.billing_country,
        shipping_address: body.shipping_address,
        shipping_city: body.shipping_city,
        shipping_state: body.shipping_state,
        shipping_zip_code: body.shipping_zip_code,
        shipping_country: body.shipping_country,
        tax_id: body.tax_id,
        notes: body.notes,
        tags: body.tags,
    });
    state.clients.create(client.clone()).await?;

    tracing::info!(client_id = %client.id, user_id = %claims.sub, "Client created");

    if let Err(e) = state.notifier.client_event(ClientEvent::Created, &client).await {
        tracing::warn!(error = %e, "Failed to record client notification");
    }

    Ok(Json(client.into()))
}

pub async fn update_client(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let mut client = state
        .clients
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Client not found")))?;

    if let Some(company_name) = body.company_name {
        client.company_name = company_name;
    }
    if let Some(contact_person) = body.contact_person {
        client.contact_person = contact_person;
    }
    if let Some(email) = body.email {
        client.email = email;
    }
    if let Some(phone) = body.phone {
        client.phone = phone;
    }
    if let Some(billing_address) = body.billing_address {
        client.billing_address = billing_address;
    }
    if let Some(billing_city) = body.billing_city {
        client.billing_city = billing_city;
    }
    if let Some(billing_state) = body.billing_state {
        client.billing_state = billing_state;
    }
    if let Some(billing_zip_code) = body.billing_zip_code {
        client.billing_zip_code = billing_zip_code;
    }
    if let Some(billing_country) = body.billing_country {
        client.billing_country = billing_country;
    }
    if let Some(shipping_address) = body.shipping_address {
        client.shipping_address = shipping_address;
    }
    if let Some(shipping_city) = body.shipping_city {
        client.shipping_city = shipping_city;
    }
    if let Some(shipping_state) = body.shipping_state {
        client.shipping_state = shipping_state;
    }
    if let Some(shipping_zip_code) = body.shipping_zip_code {
        client.shipping_zip_code = shipping_zip_code;
    }
    if let Some(shipping_country) = body.shipping_country {
        client.shipping_country = shipping_country;
    }
    if let Some(tax_id) = body.tax_id {
        client.tax_id = tax_id;
    }
    if let Some(notes) = body.notes {
        client.notes = notes;
    }
    if let Some(tags) = body.tags {
        client.tags = tags;
    }
    client.updated_at = chrono::Utc::now();

    state.clients.replace(&client).await?;

    if let Err(e) = state.notifier.client_event(ClientEvent::Updated, &client).await {
        tracing::warn!(error = %e, "Failed to record client notification");
    }

    Ok(Json(client.into()))
}

/// Soft delete; the client keeps its invoices and can be reactivated in the
/// database if needed.
pub async fn delete_client(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state.clients.deactivate(&claims.sub, &id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow!("Client not found")));
    }

    tracing::info!(client_id = %id, user_id = %claims.sub, "Client deactivated");

    Ok(Json(MessageResponse::new("Client deleted successfully")))
}

pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<TagsResponse>, AppError> {
    let tags = state.clients.distinct_tags(&claims.sub).await?;
    Ok(Json(TagsResponse { tags }))
}
