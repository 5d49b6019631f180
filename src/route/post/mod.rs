use axum::{
	extract::DefaultBodyLimit,
	middleware,
	routing::{delete, get, post, put},
	Router,
};

use crate::{session, AppState};

pub mod model;
pub mod route;

/// Body ceiling for the multipart create endpoint; generous enough for the
/// 5 MiB image limit plus the JSON payload, so the per-file check in
/// [`crate::upload::validate_image`] produces the client-facing error.
const MAX_CREATE_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn routes(state: &AppState) -> Router<AppState> {
	let protected = Router::new()
		.route("/", get(route::list_posts))
		.route("/update/:id", put(route::update_post))
		.route("/delete/:id", delete(route::delete_post))
		.route_layer(middleware::from_fn_with_state(
			state.clone(),
			session::require_session,
		));

	Router::new()
		.route(
			"/create",
			post(route::create_post).layer(DefaultBodyLimit::max(MAX_CREATE_BODY_BYTES)),
		)
		.merge(protected)
}
