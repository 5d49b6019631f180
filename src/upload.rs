use serde::Deserialize;

/// Upload size ceiling for submitted images.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
	#[error("Invalid file type. Only images are allowed.")]
	UnsupportedType,
	#[error("File too large. Maximum size is 5MB.")]
	TooLarge,
}

/// Checks an uploaded file against the image allow-list and size ceiling.
pub fn validate_image(filename: &str, size: usize) -> Result<(), ImageError> {
	let lowered = filename.to_ascii_lowercase();
	let extension = std::path::Path::new(&lowered)
		.extension()
		.and_then(|extension| extension.to_str());

	if !extension.is_some_and(|extension| ALLOWED_EXTENSIONS.contains(&extension)) {
		return Err(ImageError::UnsupportedType);
	}

	if size > MAX_IMAGE_BYTES {
		return Err(ImageError::TooLarge);
	}

	Ok(())
}

/// Client for the external image-hosting API.
#[derive(Clone)]
pub struct ImageHost {
	client: reqwest::Client,
	url: Option<String>,
	key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
	success: bool,
	#[serde(default)]
	data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
	url: String,
}

impl ImageHost {
	pub fn new(client: reqwest::Client, url: Option<String>, key: Option<String>) -> Self {
		Self { client, url, key }
	}

	/// Uploads an image and returns its hosted URL.
	///
	/// Returns `None` when the host is not configured or the upload fails;
	/// callers continue without an image rather than aborting, so failures
	/// are logged here instead of propagated.
	pub async fn upload(&self, filename: String, bytes: Vec<u8>) -> Option<String> {
		let (Some(url), Some(key)) = (&self.url, &self.key) else {
			tracing::warn!("CDN not configured, skipping image upload");
			return None;
		};

		let form = reqwest::multipart::Form::new()
			.text("key", key.clone())
			.part(
				"image",
				reqwest::multipart::Part::bytes(bytes).file_name(filename),
			);

		let response = match self.client.post(url).multipart(form).send().await {
			Ok(response) => response,
			Err(error) => {
				tracing::warn!(%error, "image upload failed, continuing without image");
				return None;
			}
		};

		match response.json::<UploadResponse>().await {
			Ok(UploadResponse {
				success: true,
				data: Some(data),
			}) => Some(data.url),
			Ok(_) => {
				tracing::warn!("image host rejected the upload, continuing without image");
				None
			}
			Err(error) => {
				tracing::warn!(%error, "image host returned an invalid response");
				None
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::{validate_image, ImageError, MAX_IMAGE_BYTES};

	#[test]
	fn accepts_allowed_extensions() {
		for name in ["a.jpg", "b.jpeg", "c.png", "d.gif", "e.webp", "F.PNG"] {
			assert_eq!(validate_image(name, 1024), Ok(()));
		}
	}

	#[test]
	fn rejects_unsupported_extensions() {
		for name in ["script.exe", "notes.txt", "archive.tar.gz", "noextension"] {
			assert_eq!(validate_image(name, 1024), Err(ImageError::UnsupportedType));
		}
	}

	#[test]
	fn rejects_oversized_files() {
		assert_eq!(
			validate_image("big.png", MAX_IMAGE_BYTES + 1),
			Err(ImageError::TooLarge)
		);
		assert_eq!(validate_image("exact.png", MAX_IMAGE_BYTES), Ok(()));
	}
}
