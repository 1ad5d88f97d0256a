use axum::extract::FromRequest;

use crate::errors::AppError;

/// `Json<T>` whose rejection is answered as a `validation` error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);
