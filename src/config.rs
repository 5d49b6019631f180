use std::path::PathBuf;

/// Runtime configuration, sourced entirely from the environment.
///
/// Secrets are never hard-coded; `main` loads a `.env` file first when one
/// exists, so local development and deployment read the same variable names.
#[derive(Debug, Clone)]
pub struct Config {
	pub secret_key: String,
	pub mongodb_uri: String,
	pub database: String,
	pub captcha_secret_key: String,
	pub captcha_url: String,
	pub cdn_key: Option<String>,
	pub cdn_url: Option<String>,
	pub debug: bool,
	pub port: u16,
	pub static_dir: PathBuf,
	pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the first administrator account, created at startup when
/// both variables are present and the username is still free.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
	pub username: String,
	pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{0} must be a number")]
	NotANumber(&'static str),
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Ok(Self {
			secret_key: require("SECRET_KEY")?,
			mongodb_uri: require("MONGODB_URI")?,
			database: optional("MONGODB_DATABASE")
				.unwrap_or_else(|| "climate_stories".to_string()),
			captcha_secret_key: require("CAPTCHA_SECRET_KEY")?,
			captcha_url: require("CAPTCHA_URL")?,
			cdn_key: optional("CDN_KEY"),
			cdn_url: optional("CDN_URL"),
			debug: optional("DEBUG").is_some_and(|value| value.eq_ignore_ascii_case("true")),
			port: match optional("PORT") {
				Some(port) => port.parse().map_err(|_| ConfigError::NotANumber("PORT"))?,
				None => 3000,
			},
			static_dir: optional("STATIC_DIR").map_or_else(|| PathBuf::from("static"), PathBuf::from),
			bootstrap_admin: match (
				optional("BOOTSTRAP_ADMIN_USERNAME"),
				optional("BOOTSTRAP_ADMIN_PASSWORD"),
			) {
				(Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
				_ => None,
			},
		})
	}
}

fn require(name: &'static str) -> Result<String, ConfigError> {
	optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|value| !value.is_empty())
}
