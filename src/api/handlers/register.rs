use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::{MessageResponse, RegisterAcceptedResponse, RegisterBody, RejectionResponse};
use super::request_context;
use crate::biometric::{RegisterOutcome, VerifyService};

#[utoipa::path(
    post,
    path = "/v1/register",
    request_body = RegisterBody,
    responses(
        (status = 200, description = "Application passed every rule", body = RegisterAcceptedResponse),
        (status = 400, description = "Missing or malformed payload", body = MessageResponse),
        (status = 422, description = "One or more violated rules", body = RejectionResponse),
        (status = 500, description = "Infrastructure failure", body = MessageResponse)
    ),
    tag = "membership"
)]
pub async fn register(
    service: Extension<Arc<VerifyService>>,
    headers: HeaderMap,
    payload: Option<Json<RegisterBody>>,
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
    let (details, enrollment) = body.into_parts();

    match service.register(details, enrollment, &context).await {
        Ok(RegisterOutcome::Accepted(normalized)) => (
            StatusCode::OK,
            Json(RegisterAcceptedResponse {
                status: "accepted".to_string(),
                email: normalized.email,
                cpf: normalized.cpf,
            }),
        )
            .into_response(),
        Ok(RegisterOutcome::Rejected(violations)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RejectionResponse {
                status: "rejected".to_string(),
                violations,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("registration validation failed: {err:?}");
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
