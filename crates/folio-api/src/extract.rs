//! Request extractors
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use axum::extract::FromRequest;

/// JSON body whose rejections (bad syntax, wrong field types, missing
/// `Content-Type`) are answered as `AppError::BadRequest`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
