use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde_json::{Value, json};

use crate::config::AppConfig;

use super::{Principal, Role};

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Principal {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("principal_guard");
        let _guard = auth_span.enter();

        let cookies = request.cookies();

        let user_id = cookies
            .get_private("user_id")
            .and_then(|c| c.value().parse::<i64>().ok());

        let Some(user_id) = user_id else {
            return Outcome::Forward(Status::Unauthorized);
        };

        let email = cookies
            .get_private("user_email")
            .map(|c| c.value().to_string())
            .unwrap_or_default();

        let display_name = cookies
            .get_private("user_name")
            .map(|c| c.value().to_string())
            .unwrap_or_else(|| email.clone());

        let role_str = cookies
            .get_private("user_role")
            .map(|c| c.value().to_string())
            .unwrap_or_else(|| "student".to_string());

        match Role::from_str(&role_str) {
            Ok(role) => {
                tracing::info!(user_id = %user_id, role = %role.as_str(), "Principal resolved from auth cookies");
                Outcome::Success(Principal {
                    user_id,
                    email,
                    display_name,
                    role,
                })
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, role = %role_str, error = ?err, "Unknown role in auth cookie");
                Outcome::Forward(Status::Unauthorized)
            }
        }
    }
}

/// Request guard for the payment collaborator's webhook: a shared key in the
/// X-Webhook-Key header, checked against config.
pub struct WebhookCaller;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for WebhookCaller {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match request.rocket().state::<AppConfig>() {
            Some(config) => config,
            _ => {
                tracing::error!("App config not found in managed state");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        match request.headers().get_one("X-Webhook-Key") {
            Some(key) if !config.payment_webhook_key.is_empty() && key == config.payment_webhook_key => {
                Outcome::Success(WebhookCaller)
            }
            Some(_) => {
                tracing::warn!("Webhook called with an invalid key");
                Outcome::Error((Status::Unauthorized, ()))
            }
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Result<Status, Custom<Json<Value>>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Authentication required"
    });

    Err(Custom(Status::Unauthorized, Json(error_json)))
}
