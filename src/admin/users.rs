use askama::Template;
use axum::{
	extract::{Form, Path, State},
	response::{Html, IntoResponse, Redirect, Response},
	Extension,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use serde::Deserialize;

use crate::{
	route::auth::{
		self,
		model::{validate_password_complexity, Role, User},
	},
	session::CurrentUser,
	AppState, Error,
};

#[derive(Debug, Clone, Deserialize)]
pub struct UserForm {
	pub username: String,
	#[serde(default)]
	pub password: String,
	pub role: String,
}

pub struct UserRow {
	pub id: String,
	pub username: String,
	pub role: &'static str,
}

impl From<&User> for UserRow {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
			username: user.username.clone(),
			role: user.role.as_str(),
		}
	}
}

#[derive(Template)]
#[template(path = "users.html")]
struct UsersTemplate {
	username: String,
	rows: Vec<UserRow>,
}

#[derive(Template)]
#[template(path = "user_form.html")]
struct UserFormTemplate {
	username: String,
	heading: &'static str,
	action: String,
	error: String,
	form_username: String,
	form_role: String,
	ask_password: bool,
}

pub async fn list(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, Error> {
	let users: Vec<User> = state.repos.users().find(doc! {}).await?.try_collect().await?;

	let page = UsersTemplate {
		username: user.0.username,
		rows: users.iter().map(Into::into).collect(),
	};

	Ok(Html(page.render()?))
}

pub async fn new_form(
	Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, Error> {
	let page = UserFormTemplate {
		username: user.0.username,
		heading: "New User",
		action: "/admin/users/new".to_string(),
		error: String::new(),
		form_username: String::new(),
		form_role: Role::Moderator.as_str().to_string(),
		ask_password: true,
	};

	Ok(Html(page.render()?))
}

pub async fn create(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Form(form): Form<UserForm>,
) -> Result<Response, Error> {
	let rerender = |error: String| UserFormTemplate {
		username: user.0.username.clone(),
		heading: "New User",
		action: "/admin/users/new".to_string(),
		error,
		form_username: form.username.clone(),
		form_role: form.role.clone(),
		ask_password: true,
	};

	let Some(role) = Role::parse(&form.role) else {
		return Ok(Html(rerender("Unknown role".to_string()).render()?).into_response());
	};

	match auth::create_user(&state.repos, &state.hasher, &form.username, &form.password, role).await
	{
		Ok(()) => Ok(Redirect::to("/admin/users").into_response()),
		Err(error @ (auth::Error::Password(..) | auth::Error::UsernameTaken)) => {
			Ok(Html(rerender(error.to_string()).render()?).into_response())
		}
		Err(error) => Err(error.into()),
	}
}

pub async fn edit_form(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Path(id): Path<String>,
) -> Result<Html<String>, Error> {
	let id = ObjectId::parse_str(&id)?;
	let edited = state
		.repos
		.users()
		.find_one(doc! { "_id": id })
		.await?
		.ok_or(Error::NotFound("User"))?;

	let page = UserFormTemplate {
		username: user.0.username,
		heading: "Edit User",
		action: format!("/admin/users/{}/edit", id.to_hex()),
		error: String::new(),
		form_username: edited.username,
		form_role: edited.role.as_str().to_string(),
		ask_password: false,
	};

	Ok(Html(page.render()?))
}

pub async fn update(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Path(id): Path<String>,
	Form(form): Form<UserForm>,
) -> Result<Response, Error> {
	let id = ObjectId::parse_str(&id)?;
	let existing = state
		.repos
		.users()
		.find_one(doc! { "_id": id })
		.await?
		.ok_or(Error::NotFound("User"))?;

	let rerender = |error: String| UserFormTemplate {
		username: user.0.username.clone(),
		heading: "Edit User",
		action: format!("/admin/users/{}/edit", id.to_hex()),
		error,
		form_username: form.username.clone(),
		form_role: form.role.clone(),
		ask_password: false,
	};

	let Some(role) = Role::parse(&form.role) else {
		return Ok(Html(rerender("Unknown role".to_string()).render()?).into_response());
	};

	if form.username != existing.username
		&& state
			.repos
			.users()
			.find_one(doc! { "username": &form.username })
			.await?
			.is_some()
	{
		return Ok(Html(rerender("Username already taken".to_string()).render()?).into_response());
	}

	let mut update = doc! { "username": &form.username, "role": role.as_str() };

	// An empty password field leaves the stored hash untouched.
	if !form.password.is_empty() {
		if let Err(error) = validate_password_complexity(&form.password) {
			return Ok(Html(rerender(error.to_string()).render()?).into_response());
		}

		update.insert(
			"password",
			auth::route::hash_password(&state.hasher, &form.password).map_err(Error::Auth)?,
		);
	}

	state
		.repos
		.users()
		.update_one(doc! { "_id": id }, doc! { "$set": update })
		.await?;

	Ok(Redirect::to("/admin/users").into_response())
}

pub async fn delete(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Redirect, Error> {
	let id = ObjectId::parse_str(&id)?;
	state.repos.users().delete_one(doc! { "_id": id }).await?;

	Ok(Redirect::to("/admin/users"))
}
