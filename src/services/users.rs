// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User management on top of [`AdminApi`].
//!
//! Creating a user is two provider calls: the user itself, then its client
//! role mappings. If the second step fails the user is deleted again so a
//! half-provisioned account never remains.

use serde::Serialize;
use utoipa::ToSchema;

use crate::provider::{
    admin::CredentialRepresentation, AdminApi, ProviderError, RoleRepresentation,
    UserRepresentation,
};

/// Profile of the calling user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
    pub email_verified: Option<bool>,
}

impl From<UserRepresentation> for UserProfile {
    fn from(user: UserRepresentation) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            enabled: user.enabled,
            email_verified: user.email_verified,
        }
    }
}

/// Entry of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UserRepresentation> for UserSummary {
    fn from(user: UserRepresentation) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            enabled: user.enabled,
        }
    }
}

/// Input of [`create_user_with_password`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Client roles to assign, by name
    pub roles: Vec<String>,
}

impl NewUser {
    fn representation(&self) -> UserRepresentation {
        UserRepresentation {
            id: None,
            username: Some(self.email.clone()),
            email: Some(self.email.clone()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            enabled: Some(true),
            email_verified: None,
            credentials: vec![CredentialRepresentation::password(self.password.clone())],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Role {0} is not defined")]
    UndefinedRole(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub async fn get_profile(admin: &dyn AdminApi, user_id: &str) -> Result<UserProfile, ProviderError> {
    admin.get_user(user_id).await.map(UserProfile::from)
}

pub async fn list_users(admin: &dyn AdminApi) -> Result<Vec<UserSummary>, ProviderError> {
    let users = admin.get_users().await?;
    Ok(users.into_iter().map(UserSummary::from).collect())
}

/// Create a user with a password and assign `new_user.roles` on `client_id`.
///
/// Returns the new user's ID. On a role failure the created user is deleted
/// before the error is returned.
pub async fn create_user_with_password(
    admin: &dyn AdminApi,
    client_id: &str,
    new_user: &NewUser,
) -> Result<String, UserServiceError> {
    let user_id = admin.create_user(&new_user.representation()).await?;
    tracing::info!(user_id = %user_id, username = %new_user.email, "user created");

    if let Err(e) = assign_roles(admin, client_id, &user_id, &new_user.roles).await {
        tracing::warn!(user_id = %user_id, error = %e, "role assignment failed, removing user");
        if let Err(delete_err) = admin.delete_user(&user_id).await {
            tracing::error!(
                user_id = %user_id,
                error = %delete_err,
                "failed to remove user after role assignment failure"
            );
        }
        return Err(e);
    }

    Ok(user_id)
}

async fn assign_roles(
    admin: &dyn AdminApi,
    client_id: &str,
    user_id: &str,
    requested: &[String],
) -> Result<(), UserServiceError> {
    if requested.is_empty() {
        return Ok(());
    }

    let client_uuid = admin.get_client_uuid(client_id).await?;
    let defined = admin.get_client_roles(&client_uuid).await?;

    let roles = requested
        .iter()
        .map(|name| {
            defined
                .iter()
                .find(|role| &role.name == name)
                .cloned()
                .ok_or_else(|| UserServiceError::UndefinedRole(name.clone()))
        })
        .collect::<Result<Vec<RoleRepresentation>, _>>()?;

    admin.assign_client_roles(user_id, &client_uuid, &roles).await?;
    Ok(())
}
