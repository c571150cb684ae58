use crate::web::api::APIError;
use log::{error, info, warn};

fn client_address(request: &actix_web::HttpRequest) -> String {
    request
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_owned()
}

pub async fn error_logging_middleware<B: actix_web::body::MessageBody>(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<B>,
) -> Result<actix_web::dev::ServiceResponse<B>, actix_web::Error> {
    let response = next.call(req).await?;

    if let Some(error) = response.response().error() {
        let status = response.response().status();
        let request = response.request();
        if let Some(api_error) = error.as_error::<APIError>() {
            match api_error {
                APIError::PermissionDenied { required_privilege } => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}> Requires privilege: {:?}",
                        status,
                        request.uri(),
                        client_address(request),
                        required_privilege,
                    );
                }
                APIError::NoSessionToken => {
                    warn!(
                        "HTTP {} permission denied at <{}>. Client: <{}> Cause: No session token",
                        status,
                        request.uri(),
                        client_address(request),
                    );
                }
                APIError::InvalidSessionToken => {
                    warn!(
                        "HTTP {} invalid session token. Client: <{}>",
                        status,
                        client_address(request),
                    );
                }
                APIError::LoginFailed(e) => {
                    warn!(
                        "HTTP {} login failed. Client: <{}> Cause: {}",
                        status,
                        client_address(request),
                        e
                    );
                }
                APIError::BookingConflict(conflict) => {
                    info!(
                        "HTTP {} booking conflict at <{}>: {:?}",
                        status,
                        request.uri(),
                        conflict
                    );
                }
                APIError::NotExisting
                | APIError::AlreadyExisting
                | APIError::NotFoundOrForbidden
                | APIError::HallClosed
                | APIError::LoginNotConfigured
                | APIError::InvalidJson(_)
                | APIError::InvalidQuery(_)
                | APIError::InvalidData(_)
                | APIError::TransactionConflict => {}
                APIError::StorageUnavailable(e) => {
                    error!("HTTP {} database connection error: {}", status, e);
                }
                APIError::InternalError(e) => {
                    error!(
                        "HTTP {} internal server error at <{}>: {}",
                        status,
                        request.uri(),
                        e
                    );
                }
            }
        } else {
            error!(
                "HTTP {} unexpected error at <{}>: {:?}",
                status,
                request.uri(),
                error
            );
        }
    }
    Ok(response)
}
