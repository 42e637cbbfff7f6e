use actix_web::{
    Error, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};
use tracing::warn;

use crate::{AppState, error::AppError};

pub const PASSWORD_HEADER: &str = "X-Password";

/// Rejects requests whose `X-Password` header does not match the configured
/// password. Passes everything through when no password is set.
pub async fn require_password<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let expected = req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.config.password.clone());

    if let Some(expected) = expected {
        let supplied = req
            .headers()
            .get(PASSWORD_HEADER)
            .and_then(|value| value.to_str().ok());
        if supplied != Some(expected.as_str()) {
            warn!(path = %req.path(), "rejected request without a valid password");
            let response = AppError::Unauthorized.error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}
