//! Response and request helpers shared by every route

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::{body::Incoming, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use crate::types::{BattleError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(full_body(json))
        .unwrap()
}

/// `{ message, code }` with the error's status. Server faults are logged here.
pub fn error_response(err: BattleError) -> Response<BoxBody> {
    if err.is_server_error() {
        error!("Request failed: {}", err);
    }

    json_response(
        err.status_code(),
        &serde_json::json!({
            "message": err.public_message(),
            "code": err.code(),
        }),
    )
}

pub fn not_found() -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "message": "Route not found" }),
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Read a JSON body of at most `limit` bytes. An empty body reads as `{}`.
pub async fn parse_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
    limit: usize,
) -> Result<T> {
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                BattleError::InvalidArgument("Request body too large".into())
            } else {
                BattleError::InvalidArgument(format!("Failed to read body: {}", e))
            }
        })?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode the query string, falling back to defaults when it does not parse
pub fn parse_query<T: DeserializeOwned + Default>(req: &Request<Incoming>) -> T {
    req.uri()
        .query()
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default()
}

pub fn auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Path segment to ObjectId; malformed ids are InvalidArgument
pub fn parse_id(raw: &str) -> Result<ObjectId> {
    Ok(ObjectId::parse_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_hides_server_detail() {
        let response = error_response(BattleError::Database("connection refused".into()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_json(response).await;
        assert_eq!(json["code"], "DB_ERROR");
        assert_eq!(json["message"], "Database not available");
    }

    #[tokio::test]
    async fn test_client_error_body() {
        let response = error_response(BattleError::NotFound("Meme not found".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );

        let json = body_json(response).await;
        assert_eq!(json["message"], "Meme not found");
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("64b7f0c2a1b2c3d4e5f60718").is_ok());
        assert!(matches!(
            parse_id("not-an-id"),
            Err(BattleError::InvalidArgument(_))
        ));
    }
}
