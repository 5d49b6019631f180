use std::collections::BTreeMap;

use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{route::auth, upload::ImageError};

/// Error type for the application.
///
/// The Display trait is not sent to the client for server errors, so it can
/// show sensitive information there; client errors echo their message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] axum_extra::extract::QueryRejection),
	#[error("multipart error: {0}")]
	Multipart(#[from] axum::extract::multipart::MultipartError),
	#[error("Invalid post ID")]
	InvalidId(#[from] mongodb::bson::oid::Error),
	#[error("{0} not found")]
	NotFound(&'static str),
	#[error("{0}")]
	BadRequest(String),
	#[error("{0}")]
	Image(#[from] ImageError),
	#[error("auth error: {0}")]
	Auth(#[from] auth::Error),
	#[error("CAPTCHA provider request failed: {0}")]
	Captcha(reqwest::Error),
	#[error("json payload error: {0}")]
	Payload(#[from] serde_json::Error),
	#[error("bson serialization error: {0}")]
	Bson(#[from] mongodb::bson::ser::Error),
	#[error("database error: {0}")]
	Database(#[from] mongodb::error::Error),
	#[error("template error: {0}")]
	Template(#[from] askama::Error),
}

impl Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..)
			| Self::Json(..)
			| Self::Query(..)
			| Self::Multipart(..)
			| Self::InvalidId(..)
			| Self::BadRequest(..)
			| Self::Image(..)
			| Self::Captcha(..) => StatusCode::BAD_REQUEST,
			Self::NotFound(..) => StatusCode::NOT_FOUND,
			Self::Auth(error) => error.status(),
			Self::Payload(..) | Self::Bson(..) | Self::Database(..) | Self::Template(..) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		let body = match &self {
			Self::Validation(errors) => json!({ "errors": validation_messages(errors) }),
			Self::NotFound(resource) => json!({ "message": format!("{resource} not found") }),
			_ => json!({ "error": self.to_string() }),
		};

		(status, Json(body)).into_response()
	}
}

/// Flattens [`ValidationErrors`] into a field-to-messages map, recursing into
/// nested structures with dotted paths so every offending field is named.
pub fn validation_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
	let mut messages = BTreeMap::new();
	flatten(None, errors, &mut messages);
	messages
}

fn flatten(
	prefix: Option<&str>,
	errors: &ValidationErrors,
	out: &mut BTreeMap<String, Vec<String>>,
) {
	for (field, kind) in errors.errors() {
		let path = match prefix {
			Some(prefix) => format!("{prefix}.{field}"),
			None => field.to_string(),
		};

		match kind {
			ValidationErrorsKind::Field(list) => {
				let messages = list
					.iter()
					.map(|error| {
						error
							.message
							.as_ref()
							.map_or_else(|| error.code.to_string(), ToString::to_string)
					})
					.collect();

				out.insert(path, messages);
			}
			ValidationErrorsKind::Struct(inner) => flatten(Some(&path), inner, out),
			ValidationErrorsKind::List(items) => {
				for (index, inner) in items {
					flatten(Some(&format!("{path}[{index}]")), inner, out);
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use serde::{Deserialize, Serialize};
	use validator::Validate;

	use super::validation_messages;

	#[derive(Debug, Serialize, Deserialize, Validate)]
	struct Inner {
		#[validate(required)]
		description: Option<String>,
	}

	#[derive(Debug, Deserialize, Validate)]
	struct Outer {
		#[validate(required)]
		title: Option<String>,
		#[validate(required, nested)]
		content: Option<Inner>,
	}

	#[test]
	fn missing_fields_are_all_named() {
		let outer: Outer = serde_json::from_str("{}").unwrap();
		let errors = outer.validate().unwrap_err();
		let messages = validation_messages(&errors);

		assert!(messages.contains_key("title"));
		assert!(messages.contains_key("content"));
	}

	#[test]
	fn nested_fields_use_dotted_paths() {
		let outer: Outer = serde_json::from_str(r#"{"title":"t","content":{}}"#).unwrap();
		let errors = outer.validate().unwrap_err();
		let messages = validation_messages(&errors);

		assert!(messages.contains_key("content.description"));
		assert!(!messages.contains_key("title"));
	}
}
