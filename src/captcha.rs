use serde::Deserialize;

/// Client for the CAPTCHA provider's verification endpoint.
#[derive(Clone)]
pub struct CaptchaVerifier {
	client: reqwest::Client,
	url: String,
	secret: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
	success: bool,
}

impl CaptchaVerifier {
	pub fn new(client: reqwest::Client, url: String, secret: String) -> Self {
		Self { client, url, secret }
	}

	/// Posts the client token to the provider and returns its verdict.
	///
	/// One attempt, no retries; a transport failure surfaces to the caller.
	pub async fn verify(&self, token: &str) -> Result<bool, reqwest::Error> {
		let response = self
			.client
			.post(&self.url)
			.form(&[("secret", self.secret.as_str()), ("response", token)])
			.send()
			.await?
			.json::<VerifyResponse>()
			.await?;

		if !response.success {
			tracing::warn!("CAPTCHA verification failed");
		}

		Ok(response.success)
	}
}
