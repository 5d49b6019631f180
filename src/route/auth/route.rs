use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, SaltString},
	Argon2, PasswordHasher, PasswordVerifier,
};
use askama::Template;
use axum::{
	extract::{Form, Query, State},
	http::header,
	response::{Html, IntoResponse, Redirect, Response},
};
use mongodb::bson::doc;
use serde::Deserialize;

use crate::{repo::Repos, session, AppState, Error as AppError};

use super::{
	model::{validate_password_complexity, LoginForm, Role, User},
	Error,
};

/// Hashes a password into a salted PHC string.
pub fn hash_password(hasher: &Argon2<'static>, password: &str) -> Result<String, Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(hasher
		.hash_password(password.as_bytes(), &salt)
		.map_err(Error::Hash)?
		.to_string())
}

/// Verifies a password against a stored PHC string. A hash that fails to
/// parse counts as a mismatch.
pub fn verify_password(hasher: &Argon2<'static>, password: &str, hash: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(hash) else {
		return false;
	};

	hasher.verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Creates an account, enforcing password complexity and username uniqueness.
pub async fn create_user(
	repos: &Repos,
	hasher: &Argon2<'static>,
	username: &str,
	password: &str,
	role: Role,
) -> Result<(), Error> {
	validate_password_complexity(password)?;

	if repos
		.users()
		.find_one(doc! { "username": username })
		.await?
		.is_some()
	{
		return Err(Error::UsernameTaken);
	}

	let user = User {
		id: None,
		username: username.to_string(),
		password: hash_password(hasher, password)?,
		role,
	};

	repos.users().insert_one(&user).await?;
	Ok(())
}

/// Looks up an account and checks the password, returning the user on a
/// match and `None` otherwise. A mismatch is a result, not an error.
pub async fn verify_user(
	repos: &Repos,
	hasher: &Argon2<'static>,
	username: &str,
	password: &str,
) -> Result<Option<User>, Error> {
	let Some(user) = repos.users().find_one(doc! { "username": username }).await? else {
		return Ok(None);
	};

	Ok(verify_password(hasher, password, &user.password).then_some(user))
}

/// Creates the configured first administrator when the username is free.
pub async fn bootstrap_admin(state: &AppState) -> Result<(), Error> {
	let Some(bootstrap) = &state.config.bootstrap_admin else {
		return Ok(());
	};

	match create_user(
		&state.repos,
		&state.hasher,
		&bootstrap.username,
		&bootstrap.password,
		Role::Admin,
	)
	.await
	{
		Ok(()) => {
			tracing::info!(username = %bootstrap.username, "bootstrap admin created");
			Ok(())
		}
		Err(Error::UsernameTaken) => Ok(()),
		Err(error) => Err(error),
	}
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
	error: String,
	denied: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
	denied: Option<String>,
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> Result<Html<String>, AppError> {
	let page = LoginTemplate {
		error: String::new(),
		denied: query.denied.is_some(),
	};

	Ok(Html(page.render()?))
}

pub async fn login(
	State(state): State<AppState>,
	Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
	match verify_user(&state.repos, &state.hasher, &form.username, &form.password).await? {
		Some(user) => {
			let claims = session::Claims::new(&user);
			let cookie = session::create_cookie(session::sign(&claims, &state.config.secret_key)?);

			Ok((
				[(header::SET_COOKIE, cookie.to_string())],
				Redirect::to("/admin"),
			)
				.into_response())
		}
		None => {
			let page = LoginTemplate {
				error: "Invalid credentials".to_string(),
				denied: false,
			};

			Ok(Html(page.render()?).into_response())
		}
	}
}

pub async fn logout() -> impl IntoResponse {
	(
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		Redirect::to("/login"),
	)
}
