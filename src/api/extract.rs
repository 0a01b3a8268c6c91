use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use super::errors::AppError;
use crate::error::ServiceError;

/// `Json` body extractor whose rejections (bad syntax, wrong types, unknown
/// enum variants, missing fields, wrong content type) surface as a
/// validation failure: `400 {"error": ..}`.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ServiceError::validation(rejection.body_text()).into()),
        }
    }
}
