use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use super::types::{AcceptedResponse, MessageResponse, RejectionResponse, VerifyBody};
use super::request_context;
use crate::biometric::{Decision, VerifyService};

#[utoipa::path(
    post,
    path = "/v1/verify",
    request_body = VerifyBody,
    responses(
        (status = 200, description = "Request passed every policy check", body = AcceptedResponse),
        (status = 400, description = "Missing or malformed payload", body = MessageResponse),
        (status = 404, description = "No active member matches the identity reference", body = MessageResponse),
        (status = 422, description = "One or more policy violations", body = RejectionResponse),
        (status = 500, description = "Infrastructure failure", body = MessageResponse)
    ),
    tag = "verification"
)]
pub async fn verify(
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

    match service.verify(body.into_input(), &context).await {
        Ok(Decision::Accepted { member_id }) => (
            StatusCode::OK,
            Json(AcceptedResponse {
                status: "accepted".to_string(),
                member_id,
            }),
        )
            .into_response(),
        Ok(Decision::Rejected(violations)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RejectionResponse {
                status: "rejected".to_string(),
                violations,
            }),
        )
            .into_response(),
        Ok(Decision::IdentityNotFound) => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                message: "Member not found".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("verification failed: {err:?}");
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
