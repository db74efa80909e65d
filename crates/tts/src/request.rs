use axum::body::Body;
use serde::de::DeserializeOwned;

/// Extractor for JSON request bodies
///
/// Rejects anything that is not `application/json` or exceeds the body limit.
pub struct ExtractPayload<T>(pub T);

/// Body limit for speech requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
}

impl<S, T: DeserializeOwned> axum::extract::FromRequest<S> for ExtractPayload<T>
where
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        use axum::response::IntoResponse;

        let (parts, body) = request.into_parts();

        if !is_json(&parts.headers) {
            return Err((
                axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Content-Type, expected: 'Content-Type: application/json'",
            )
                .into_response());
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err)
                .is_some_and(|source| source.is::<http_body_util::LengthLimitError>())
            {
                (
                    axum::http::StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body is too large, limit is {BODY_LIMIT_BYTES} bytes"),
                )
            } else {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    format!("Failed to read request body: {err}"),
                )
            }
            .into_response()
        })?;

        let body = match serde_json::from_slice::<T>(&bytes) {
            Ok(body) => body,
            Err(e) => {
                return Err((
                    axum::http::StatusCode::BAD_REQUEST,
                    format!("Failed to parse request body: {e}"),
                )
                    .into_response());
            }
        };

        Ok(Self(body))
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequest;
    use http::StatusCode;

    use super::*;
    use crate::types::SpeechRequest;

    fn request(content_type: Option<&str>, body: impl Into<Body>) -> http::Request<Body> {
        let mut builder = http::Request::post("/v1/audio/speech");
        if let Some(content_type) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        builder.body(body.into()).unwrap()
    }

    #[tokio::test]
    async fn parses_json_with_charset() {
        let req = request(Some("application/json; charset=utf-8"), r#"{"input": "Olá"}"#);
        let ExtractPayload(body) = ExtractPayload::<SpeechRequest>::from_request(req, &()).await.unwrap();
        assert_eq!(body.input, "Olá");
        assert_eq!(body.voice, None);
    }

    #[tokio::test]
    async fn rejects_other_content_types() {
        let req = request(Some("text/plain"), "Olá");
        let Err(rejection) = ExtractPayload::<SpeechRequest>::from_request(req, &()).await else {
            panic!("text/plain accepted");
        };
        assert_eq!(rejection.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let req = request(None, r#"{"input": "Olá"}"#);
        let Err(rejection) = ExtractPayload::<SpeechRequest>::from_request(req, &()).await else {
            panic!("missing content type accepted");
        };
        assert_eq!(rejection.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn rejects_oversized_and_malformed_bodies() {
        let req = request(Some("application/json"), vec![b' '; BODY_LIMIT_BYTES + 1]);
        let Err(rejection) = ExtractPayload::<SpeechRequest>::from_request(req, &()).await else {
            panic!("oversized body accepted");
        };
        assert_eq!(rejection.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let req = request(Some("application/json"), r#"{"input": "Olá", "speed": 2}"#);
        let Err(rejection) = ExtractPayload::<SpeechRequest>::from_request(req, &()).await else {
            panic!("unknown field accepted");
        };
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}
