//! Custom extractors that reject with the API error envelope

use aide::operation::OperationInput;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Form, Json,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::types::error::AppError;

/// Origin the request was addressed to, from `Host` and `X-Forwarded-Proto`.
/// `None` when the request carries no usable `Host` header.
pub struct RequestOrigin(pub Option<String>);

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let origin = header_value(header::HOST).map(|host| {
            let scheme = header_value(header::HeaderName::from_static("x-forwarded-proto"))
                .unwrap_or("https");
            format!("{scheme}://{host}")
        });

        Ok(Self(origin))
    }
}

impl OperationInput for RequestOrigin {}

/// JSON body extractor whose rejections are `AppError`s
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await?;
        Ok(Self(payload))
    }
}

impl<T> OperationInput for JsonBody<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }
}

/// JSON extractor that also runs `validator` rules on the payload
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(payload) = JsonBody::<T>::from_request(req, state).await?;

        payload.validate().map_err(|errors| {
            // A rule's message, when set, is the field's name on the wire
            let mut fields: Vec<String> = errors
                .field_errors()
                .into_iter()
                .map(|(field, field_errors)| {
                    field_errors
                        .iter()
                        .find_map(|error| error.message.as_ref())
                        .map_or_else(|| field.to_string(), ToString::to_string)
                })
                .collect();
            fields.sort();
            AppError::validation("Missing required fields")
                .with_details(serde_json::json!({ "missing": fields }))
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }
}

/// `application/x-www-form-urlencoded` body extractor whose rejections are `AppError`s
pub struct FormBody<T>(pub T);

impl<T, S> FromRequest<S> for FormBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(payload) = Form::<T>::from_request(req, state).await?;
        Ok(Self(payload))
    }
}

impl<T> OperationInput for FormBody<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Form::<T>::operation_input(ctx, operation);
    }
}
