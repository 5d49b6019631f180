#![warn(clippy::pedantic)]

pub mod admin;
pub mod captcha;
pub mod config;
pub mod error;
pub mod extract;
pub mod repo;
pub mod route;
pub mod session;
pub mod upload;

use std::sync::Arc;

use argon2::Argon2;
use axum::Router;
use tower_http::{
	cors::CorsLayer,
	services::{ServeDir, ServeFile},
	trace::TraceLayer,
};

pub use config::Config;
pub use error::Error;

/// The shared application state.
///
/// This contains every dependency handlers need: the collection handles, the
/// password hasher, the external-service clients and the configuration. All
/// of it is passed explicitly; there are no module-level singletons.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub repos: repo::Repos,
	pub hasher: Argon2<'static>,
	pub captcha: captcha::CaptchaVerifier,
	pub images: upload::ImageHost,
	pub config: Arc<Config>,
}

pub type AppState = State;

/// Assembles the full application router: the public JSON API, the login
/// pages, the guarded admin panel and the static front-end bundle.
pub fn app(state: State) -> Router {
	let static_dir = state.config.static_dir.clone();
	let assets =
		ServeDir::new(&static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

	Router::new()
		.nest("/api/posts", route::post::routes(&state))
		.merge(route::auth::routes())
		.nest("/admin", admin::routes(&state))
		.fallback_service(assets)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}
