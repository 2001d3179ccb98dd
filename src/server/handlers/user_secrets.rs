use crate::{
    error::Error as ToolvaultError,
    secrets::{SecretsError, UserSecretParams, UserSecretStatus, UserSecretType},
    server::app_state::AppState,
    users::User,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct ListSecretsQuery {
    #[serde(rename = "type")]
    pub secret_type: Option<UserSecretType>,
}

#[derive(Deserialize)]
pub struct CreateSecretBody {
    pub context: String,
    #[serde(rename = "type")]
    pub secret_type: UserSecretType,
    pub label: String,
    pub value: String,
}

/// GET /api/user/secrets
pub async fn user_secrets_list(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<ListSecretsQuery>,
) -> Result<HttpResponse, ToolvaultError> {
    match state
        .api
        .secrets()
        .list_user_secret_statuses(user.id, query.secret_type)
        .await
    {
        Ok(statuses) => Ok(HttpResponse::Ok().json(statuses)),
        Err(err) => {
            error!(user.id = %user.id, "Failed to list user secrets: {err:?}");
            Err(err.into())
        }
    }
}

/// POST /api/user/secrets
pub async fn user_secrets_create(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<CreateSecretBody>,
) -> Result<HttpResponse, ToolvaultError> {
    if body.secret_type.is_reserved() {
        return Err(ToolvaultError::client(format!(
            "Secrets of type '{}' are managed by the service.",
            body.secret_type
        )));
    }

    let params = UserSecretParams {
        context: &body.context,
        secret_type: body.secret_type,
        label: &body.label,
        value: &body.value,
    };
    match state.api.secrets().create_user_secret(user.id, params).await {
        Ok(secret) => {
            info!(user.id = %user.id, secret.id = %secret.id, "Created user secret.");
            Ok(HttpResponse::Created().json(UserSecretStatus::new(&secret, true)))
        }
        Err(err) => match err.downcast_ref::<SecretsError>() {
            Some(SecretsError::Conflict) => Err(ToolvaultError::conflict(format!(
                "A secret of type '{}' already exists for '{}'.",
                body.secret_type, body.context
            ))),
            Some(SecretsError::MissingKey) => {
                error!(user.id = %user.id, "Cannot store user secret: {err}");
                Ok(HttpResponse::InternalServerError().json(json!({
                    "message": "Secrets encryption is not configured. Ask an administrator to configure it."
                })))
            }
            _ => {
                error!(user.id = %user.id, "Failed to create user secret: {err:?}");
                Err(err.into())
            }
        },
    }
}

/// DELETE /api/user/secrets/{id}
pub async fn user_secrets_delete(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ToolvaultError> {
    let id = path.into_inner();
    match state.api.secrets().delete_user_secret_by_id(user.id, id).await {
        Ok(0) => Err(ToolvaultError::not_found("Secret not found.")),
        Ok(_) => {
            info!(user.id = %user.id, secret.id = %id, "Deleted user secret.");
            Ok(HttpResponse::NoContent().finish())
        }
        Err(err) => {
            error!(user.id = %user.id, secret.id = %id, "Failed to delete user secret: {err:?}");
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CreateSecretBody, ListSecretsQuery, user_secrets_create, user_secrets_delete, user_secrets_list};
    use crate::{
        error::ErrorKind,
        secrets::UserSecretType,
        server::tests::mock_app_state,
        tests::{mock_api_with_config, mock_config, mock_user},
    };
    use actix_web::{body::MessageBody, web};
    use serde_json::{Value as JsonValue, json};
    use uuid::Uuid;

    fn create_body(context: &str, secret_type: UserSecretType) -> web::Json<CreateSecretBody> {
        web::Json(CreateSecretBody {
            context: context.to_string(),
            secret_type,
            label: "OpenAI".to_string(),
            value: "sk-my-super-secret-api-key-12345".to_string(),
        })
    }

    fn json_body(response: actix_web::HttpResponse) -> anyhow::Result<JsonValue> {
        let body = response.into_body().try_into_bytes().unwrap();
        Ok(serde_json::from_slice(&body)?)
    }

    #[tokio::test]
    async fn can_create_list_and_delete_secrets() -> anyhow::Result<()> {
        let state = web::Data::new(mock_app_state().await?);
        let user = mock_user()?;
        state.api.db.upsert_user(&user).await?;

        let response = user_secrets_create(
            state.clone(),
            user.clone(),
            create_body("backend-1", UserSecretType::BackendCredentials),
        )
        .await?;
        assert_eq!(response.status().as_u16(), 201);
        let created = json_body(response)?;
        assert_eq!(created["context"], "backend-1");
        assert_eq!(created["type"], "backend-credentials");
        assert_eq!(created["readable"], true);
        assert!(created.get("value").is_none());

        let err = user_secrets_create(
            state.clone(),
            user.clone(),
            create_body("backend-1", UserSecretType::BackendCredentials),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.public_message(),
            "A secret of type 'backend-credentials' already exists for 'backend-1'."
        );

        let response = user_secrets_list(
            state.clone(),
            user.clone(),
            web::Query(ListSecretsQuery { secret_type: None }),
        )
        .await?;
        assert_eq!(response.status().as_u16(), 200);
        let listed = json_body(response)?;
        assert_eq!(listed, json!([created.clone()]));

        let response = user_secrets_list(
            state.clone(),
            user.clone(),
            web::Query(ListSecretsQuery {
                secret_type: Some(UserSecretType::McpOauth),
            }),
        )
        .await?;
        assert_eq!(json_body(response)?, json!([]));

        let id = created["id"]
            .as_str()
            .unwrap_or_default()
            .parse::<Uuid>()?;
        let response = user_secrets_delete(state.clone(), user.clone(), web::Path::from(id)).await?;
        assert_eq!(response.status().as_u16(), 204);

        let err = user_secrets_delete(state, user, web::Path::from(id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        Ok(())
    }

    #[tokio::test]
    async fn rejects_reserved_and_invalid_secrets() -> anyhow::Result<()> {
        let state = web::Data::new(mock_app_state().await?);
        let user = mock_user()?;
        state.api.db.upsert_user(&user).await?;

        let err = user_secrets_create(
            state.clone(),
            user.clone(),
            create_body("tool-1", UserSecretType::McpOauth),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientError);

        let err = user_secrets_create(
            state,
            user,
            create_body(" ", UserSecretType::BackendCredentials),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(err.public_message(), "Secret context cannot be empty.");

        Ok(())
    }

    #[tokio::test]
    async fn reports_missing_passphrase() -> anyhow::Result<()> {
        let mut config = mock_config()?;
        config.security.secrets_passphrase = None;
        let state = mock_app_state().await?;
        let state = web::Data::new(crate::server::app_state::AppState::new(
            config.clone(),
            mock_api_with_config(state.api.db.clone(), config)?,
        ));
        let user = mock_user()?;
        state.api.db.upsert_user(&user).await?;

        let response = user_secrets_create(
            state,
            user,
            create_body("backend-1", UserSecretType::BackendCredentials),
        )
        .await?;
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(
            json_body(response)?,
            json!({ "message": "Secrets encryption is not configured. Ask an administrator to configure it." })
        );

        Ok(())
    }
}
