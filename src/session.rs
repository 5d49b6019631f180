use axum::{
	extract::{Request, State},
	http::{header, HeaderMap},
	middleware::Next,
	response::{IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
	route::auth::model::{Role, User},
	AppState,
};

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "session";

/// Fixed session lifetime in minutes.
pub const LIFETIME_MINUTES: i64 = 60;

/// The contents of a session cookie.
///
/// Sessions live entirely client-side: the claims are serialized, signed with
/// the server secret and handed to the browser. There is no server-side
/// session store, so logout and expiry work purely through the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	pub id: Uuid,
	pub username: String,
	pub role: Role,
	pub expires_at: i64,
}

impl Claims {
	pub fn new(user: &User) -> Self {
		Self {
			id: Uuid::new_v4(),
			username: user.username.clone(),
			role: user.role,
			expires_at: (chrono::Utc::now() + chrono::Duration::minutes(LIFETIME_MINUTES))
				.timestamp(),
		}
	}

	fn is_expired(&self) -> bool {
		self.expires_at <= chrono::Utc::now().timestamp()
	}
}

/// The authenticated user attached to the request by the session guards.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

/// Signs the claims into a `payload.signature` token.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, serde_json::Error> {
	let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
	mac.update(payload.as_bytes());
	let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

	Ok(format!("{payload}.{signature}"))
}

/// Verifies a token's signature and expiry.
///
/// Any malformed token (wrong shape, bad encoding, missing claims) is treated
/// as "not authenticated", never as an error.
pub fn verify(token: &str, secret: &str) -> Option<Claims> {
	let (payload, signature) = token.split_once('.')?;
	let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
	mac.update(payload.as_bytes());
	mac.verify_slice(&signature).ok()?;

	let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
	(!claims.is_expired()).then_some(claims)
}

/// Creates a session cookie expiring with the signed claims.
pub fn create_cookie(token: String) -> cookie::Cookie<'static> {
	cookie::Cookie::build((COOKIE_NAME, token))
		.http_only(true)
		.path("/")
		.max_age(cookie::time::Duration::minutes(LIFETIME_MINUTES))
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one.
pub fn clear_cookie() -> cookie::Cookie<'static> {
	cookie::Cookie::build(COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(cookie::time::Duration::ZERO)
		.into()
}

/// Extracts and verifies the session claims from the request cookies.
pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<Claims> {
	headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == COOKIE_NAME)
		.and_then(|cookie| verify(cookie.value(), secret))
}

/// Guard layer requiring any authenticated session.
///
/// Anonymous or invalid sessions are redirected to the login page.
pub async fn require_session(
	State(state): State<AppState>,
	mut request: Request,
	next: Next,
) -> Response {
	match from_headers(request.headers(), &state.config.secret_key) {
		Some(claims) => {
			request.extensions_mut().insert(CurrentUser(claims));
			next.run(request).await
		}
		None => Redirect::to("/login").into_response(),
	}
}

/// Guard layer requiring an admin or moderator session.
pub async fn require_moderator(
	State(state): State<AppState>,
	mut request: Request,
	next: Next,
) -> Response {
	match from_headers(request.headers(), &state.config.secret_key) {
		Some(claims) if claims.role.is_staff() => {
			request.extensions_mut().insert(CurrentUser(claims));
			next.run(request).await
		}
		Some(_) => Redirect::to("/login?denied=1").into_response(),
		None => Redirect::to("/login").into_response(),
	}
}

#[cfg(test)]
mod test {
	use super::{sign, verify, Claims};
	use crate::route::auth::model::Role;
	use uuid::Uuid;

	const SECRET: &str = "test-secret";

	fn claims(role: Role) -> Claims {
		Claims {
			id: Uuid::new_v4(),
			username: "carol".to_string(),
			role,
			expires_at: chrono::Utc::now().timestamp() + 60,
		}
	}

	#[test]
	fn round_trip() {
		let token = sign(&claims(Role::Moderator), SECRET).unwrap();
		let verified = verify(&token, SECRET).unwrap();

		assert_eq!(verified.username, "carol");
		assert_eq!(verified.role, Role::Moderator);
	}

	#[test]
	fn tampered_payload_is_rejected() {
		let token = sign(&claims(Role::Other), SECRET).unwrap();
		let (_, signature) = token.split_once('.').unwrap();
		let forged = format!("eyJyb2xlIjoiYWRtaW4ifQ.{signature}");

		assert!(verify(&forged, SECRET).is_none());
	}

	#[test]
	fn wrong_secret_is_rejected() {
		let token = sign(&claims(Role::Admin), SECRET).unwrap();

		assert!(verify(&token, "other-secret").is_none());
	}

	#[test]
	fn expired_session_is_rejected() {
		let mut expired = claims(Role::Admin);
		expired.expires_at = chrono::Utc::now().timestamp() - 1;
		let token = sign(&expired, SECRET).unwrap();

		assert!(verify(&token, SECRET).is_none());
	}

	#[test]
	fn garbage_tokens_are_rejected() {
		assert!(verify("", SECRET).is_none());
		assert!(verify("no-dot-here", SECRET).is_none());
		assert!(verify("a.b.c", SECRET).is_none());
	}
}
