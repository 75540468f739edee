use axum::extract::{FromRequest, Request};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::PortfolioError;

/// JSON body that has been deserialized and validated.
///
/// Any failure, from a missing content type to a field out of range, is
/// reported as [`PortfolioError::Validation`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = PortfolioError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PortfolioError::Validation(rejection.body_text()))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
