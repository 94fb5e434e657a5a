//! 认证模块
//!
//! 配置了API密钥时，对 `/api` 和 `/ws` 做访问控制

use super::{AppError, AppState};
use axum::{
    extract::{Query, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use tracing::warn;

/// API密钥头部名称
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API密钥查询参数名称
pub const API_KEY_QUERY: &str = "api_key";

/// API密钥校验中间件
///
/// 未配置密钥时直接放行；头部优先于查询参数。
pub async fn require_api_key(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = get_api_key_from_header(req.headers())
        .or_else(|| query.get(API_KEY_QUERY).cloned());

    match provided {
        Some(key) if key == expected => Ok(next.run(req).await),
        Some(_) => {
            warn!("拒绝无效API密钥的请求: {}", req.uri().path());
            Err(AppError::Unauthorized("Invalid API key".to_string()))
        }
        None => Err(AppError::Unauthorized(format!(
            "Missing API key, provide it in the {API_KEY_HEADER} header or the {API_KEY_QUERY} query parameter"
        ))),
    }
}

/// 从HTTP头部获取API密钥
fn get_api_key_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_api_key_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("test-api-key"));

        assert_eq!(
            get_api_key_from_header(&headers),
            Some("test-api-key".to_string())
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(get_api_key_from_header(&HeaderMap::new()), None);
    }
}
