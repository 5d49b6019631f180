use axum::{
	middleware,
	response::Redirect,
	routing::{get, post},
	Router,
};

use crate::{session, AppState};

pub mod form;
pub mod posts;
pub mod users;

async fn index() -> Redirect {
	Redirect::to("/admin/posts")
}

/// The admin panel: tabular browse/edit/delete over the post and user
/// collections. A single guard layer covers the whole subtree, so no route
/// can be added without the admin/moderator check.
pub fn routes(state: &AppState) -> Router<AppState> {
	Router::new()
		.route("/", get(index))
		.route("/posts", get(posts::list))
		.route("/posts/new", get(posts::new_form).post(posts::create))
		.route("/posts/:id/edit", get(posts::edit_form).post(posts::update))
		.route("/posts/:id/delete", post(posts::delete))
		.route("/users", get(users::list))
		.route("/users/new", get(users::new_form).post(users::create))
		.route("/users/:id/edit", get(users::edit_form).post(users::update))
		.route("/users/:id/delete", post(users::delete))
		.route_layer(middleware::from_fn_with_state(
			state.clone(),
			session::require_moderator,
		))
}
