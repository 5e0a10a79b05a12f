//! HTTP request handlers for userbase

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION, SERVER, WWW_AUTHENTICATE};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, error, info, warn};
use userbase_core::*;

pub type ResponseBody = Full<Bytes>;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const SERVER_NAME: &str = concat!("userbase/", env!("CARGO_PKG_VERSION"));

/// Main request handler
pub async fn handle_request<B>(
    req: Request<B>,
    service: UserService,
) -> std::result::Result<Response<ResponseBody>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Handling {} {}", method, path);

    let response = match route(req, &service, &path).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    };

    info!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

async fn route<B>(req: Request<B>, service: &UserService, path: &str) -> Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (req.method(), segments.as_slice()) {
        (&Method::GET, ["health"]) => Ok(handle_health()),

        (&Method::GET, ["api", "users"]) => handle_list(service).await,
        (&Method::POST, ["api", "users"]) => handle_register(req, service).await,
        (&Method::POST, ["api", "users", "login"]) => handle_login(req, service).await,

        (&Method::GET, ["api", "users", id]) => {
            authenticate(&req, service)?;
            handle_get(service, id).await
        }
        (&Method::PUT, ["api", "users", id]) => {
            let principal = authenticate(&req, service)?;
            handle_update(req, service, &principal, id).await
        }
        (&Method::DELETE, ["api", "users", id]) => {
            let principal = authenticate(&req, service)?;
            handle_delete(service, &principal, id).await
        }

        (_, ["health"]) | (_, ["api", "users"]) | (_, ["api", "users", _]) => Ok(json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({"name": "MethodNotAllowed", "message": "Method not allowed"}),
        )),

        _ => Ok(json_response(
            StatusCode::NOT_FOUND,
            &json!({"name": ErrorKind::NotFound.name(), "message": "Not found"}),
        )),
    }
}

/// Health check handler
fn handle_health() -> Response<ResponseBody> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "service": "userbase"
        }),
    )
}

async fn handle_list(service: &UserService) -> Result<Response<ResponseBody>> {
    let users = service.list().await?;
    Ok(json_response(StatusCode::OK, &json!({ "users": users })))
}

async fn handle_register<B>(req: Request<B>, service: &UserService) -> Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request: NewUser = read_json(req).await?;
    let user = service.register(&request).await?;

    let mut response = json_response(StatusCode::CREATED, &user);
    if let Ok(location) = HeaderValue::try_from(format!("/api/users/{}", user.id)) {
        response.headers_mut().insert(LOCATION, location);
    }
    Ok(response)
}

/// Password login, from a Basic header when one is sent and the JSON body otherwise
async fn handle_login<B>(req: Request<B>, service: &UserService) -> Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let header = authorization(&req, AuthFailure::MalformedCredentials)?.map(str::to_owned);
    let token = match header {
        Some(header) => service.login_basic(Some(&header)).await?,
        None => {
            let request: LoginRequest = read_json(req).await?;
            service.login(&request).await?
        }
    };

    Ok(json_response(StatusCode::OK, &json!({ "token": token.token() })))
}

async fn handle_get(service: &UserService, id: &str) -> Result<Response<ResponseBody>> {
    let user = service.get(id.parse()?).await?;
    Ok(json_response(StatusCode::OK, &user))
}

async fn handle_update<B>(
    req: Request<B>,
    service: &UserService,
    principal: &Principal,
    id: &str,
) -> Result<Response<ResponseBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let id: UserId = id.parse()?;
    let changes: UserChanges = read_json(req).await?;

    let user = service.update(principal, id, &changes).await?;
    Ok(json_response(StatusCode::OK, &user))
}

async fn handle_delete(service: &UserService, principal: &Principal, id: &str) -> Result<Response<ResponseBody>> {
    service.delete(principal, id.parse()?).await?;
    Ok(response(StatusCode::NO_CONTENT, Bytes::new()))
}

/// Bearer authentication for protected routes
fn authenticate<B>(req: &Request<B>, service: &UserService) -> Result<Principal> {
    service.authenticate_bearer(authorization(req, AuthFailure::Malformed)?)
}

/// The `Authorization` header as text; `cause` is logged when it is not visible ASCII
fn authorization<B>(req: &Request<B>, cause: AuthFailure) -> Result<Option<&str>> {
    match req.headers().get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| {
            warn!(%cause, "authentication failed");
            UserbaseError::authentication(cause)
        }),
    }
}

async fn read_json<B, T>(req: Request<B>) -> Result<T>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    T: DeserializeOwned,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| UserbaseError::InvalidInput(format!("failed to read request body: {}", e)))?
        .to_bytes();

    serde_json::from_slice(&body)
        .map_err(|e| UserbaseError::InvalidInput(format!("invalid JSON body: {}", e)))
}

/// Map an error to its status and public body
pub fn error_response(err: &UserbaseError) -> Response<ResponseBody> {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // authentication and authorization causes are logged where they are raised
    match kind {
        ErrorKind::Internal => error!("Handler error: {}", err),
        ErrorKind::Authentication | ErrorKind::Authorization => {}
        _ => debug!("Request rejected: {}", err),
    }

    let mut body = json!({
        "name": kind.name(),
        "message": err.public_message(),
    });
    if let UserbaseError::Validation { validations } = err {
        body["validations"] = json!(validations);
    }

    let mut response = json_response(status, &body);
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

/// JSON response builder
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, Bytes::from(body)),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"name":"InternalError","message":"Internal server error"}"#),
            )
        }
    };

    let mut response = response(status, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn response(status: StatusCode, body: Bytes) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}
