use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::{LockedResponse, LoginAcceptedResponse, MessageResponse, RejectionResponse, VerifyBody};
use super::request_context;
use crate::biometric::{LoginOutcome, VerifyService};

#[utoipa::path(
    post,
    path = "/v1/login",
    request_body = VerifyBody,
    responses(
        (status = 200, description = "Login accepted", body = LoginAcceptedResponse),
        (status = 400, description = "Missing or malformed payload", body = MessageResponse),
        (status = 401, description = "Payload did not match the enrolled template", body = MessageResponse),
        (status = 404, description = "No active member matches the identity reference", body = MessageResponse),
        (status = 422, description = "One or more policy violations", body = RejectionResponse),
        (status = 423, description = "Account is in a lockout window", body = LockedResponse),
        (status = 500, description = "Infrastructure failure", body = MessageResponse)
    ),
    tag = "verification"
)]
pub async fn login(
    service: Extension<Arc<VerifyService>>,
    headers: HeaderMap,
    payload: Option<Json<VerifyBody>>,
) -> Response {
    let Some(Json(body)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                message: "Missing payload".to_string(),
            }),
        )
            .into_response();
    };

    let context = request_context(&headers);

    match service.login(body.into_input(), &context).await {
        Ok(LoginOutcome::Accepted {
            member_id,
            confidence,
        }) => (
            StatusCode::OK,
            Json(LoginAcceptedResponse {
                status: "accepted".to_string(),
                member_id,
                confidence,
            }),
        )
            .into_response(),
        Ok(LoginOutcome::Locked {
            retry_after_seconds,
        }) => (
            StatusCode::LOCKED,
            [(header::RETRY_AFTER, retry_after_seconds.to_string())],
            Json(LockedResponse {
                status: "locked".to_string(),
                retry_after_seconds,
            }),
        )
            .into_response(),
        Ok(LoginOutcome::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Json(MessageResponse {
                message: "Invalid credentials".to_string(),
            }),
        )
            .into_response(),
        Ok(LoginOutcome::Rejected(violations)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RejectionResponse {
                status: "rejected".to_string(),
                violations,
            }),
        )
            .into_response(),
        Ok(LoginOutcome::IdentityNotFound) => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                message: "Member not found".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("login failed: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: "Internal error".to_string(),
                }),
            )
                .into_response()
        }
    }
}
