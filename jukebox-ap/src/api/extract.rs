//! Request body extraction
//!
//! Body errors are reported in the same `{"error": ...}` shape as every other
//! failure, with status 400.

use crate::error::Error;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// JSON body whose rejection is an [`Error::InvalidRequest`]
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| Error::InvalidRequest(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Integer field that also accepts numeric strings (`"50"`, `" 7 "`)
///
/// Fractional numbers are truncated toward zero.
pub fn deserialize_loose_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| Error::custom(format!("{} is not an integer", n))),
        Value::String(s) => parse_leading_int(&s)
            .ok_or_else(|| Error::custom(format!("{:?} is not an integer", s))),
        other => Err(Error::custom(format!("expected an integer, got {}", other))),
    }
}

/// Optional sign followed by at least one digit; trailing text is ignored
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
