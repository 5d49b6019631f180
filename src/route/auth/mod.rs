use axum::{http::StatusCode, routing::get, Router};

use crate::AppState;

pub mod model;
pub mod route;

pub use route::{bootstrap_admin, create_user, verify_user};

/// An error that can occur while managing accounts.
///
/// Note that the messages are presented to the client, so they should not
/// contain sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Password(#[from] model::PasswordError),
	#[error("Username already taken")]
	UsernameTaken,
	#[error("password hash error: {0}")]
	Hash(argon2::password_hash::Error),
	#[error("database error: {0}")]
	Database(#[from] mongodb::error::Error),
}

impl Error {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Password(..) | Self::UsernameTaken => StatusCode::BAD_REQUEST,
			Self::Hash(..) | Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

/// Login lives at the root rather than under a prefix so the session guards
/// can redirect to a stable `/login` entry point.
pub fn routes() -> Router<AppState> {
	Router::new()
		.route("/login", get(route::login_page).post(route::login))
		.route("/logout", get(route::logout))
}
