use std::sync::Arc;

use argon2::Argon2;
use climate_stories::{app, captcha::CaptchaVerifier, repo::Repos, route, upload::ImageHost, Config, State};

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = Config::from_env().expect("invalid configuration");

	tracing_subscriber::fmt()
		.with_max_level(if config.debug {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.init();

	let client = mongodb::Client::with_uri_str(&config.mongodb_uri)
		.await
		.expect("failed to connect to database");
	let repos = Repos::new(client.database(&config.database));

	repos
		.ensure_indexes()
		.await
		.expect("failed to create indexes");

	let http = reqwest::Client::new();
	let state = State {
		captcha: CaptchaVerifier::new(
			http.clone(),
			config.captcha_url.clone(),
			config.captcha_secret_key.clone(),
		),
		images: ImageHost::new(http, config.cdn_url.clone(), config.cdn_key.clone()),
		repos,
		hasher: Argon2::default(),
		config: Arc::new(config),
	};

	if let Err(error) = route::auth::bootstrap_admin(&state).await {
		tracing::warn!(%error, "bootstrap admin creation failed");
	}

	let port = state.config.port;
	let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", port);

	axum::serve(listener, app(state)).await.unwrap();
}
