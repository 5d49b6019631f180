use axum::{
	extract::{Host, Multipart, Path, State},
	http::StatusCode,
	response::IntoResponse,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use serde_json::json;

use crate::{
	extract::{Json, Query},
	upload, AppState, Error,
};

use super::model;

/// Hosts that skip CAPTCHA verification during development.
fn is_local_host(host: &str) -> bool {
	host.starts_with("localhost") || host.starts_with("127.0.0.1")
}

/// Creates a new post from a multipart form carrying a `postData` JSON field
/// and an optional `image` file.
pub async fn create_post(
	State(state): State<AppState>,
	host: Option<Host>,
	mut multipart: Multipart,
) -> Result<impl IntoResponse, Error> {
	// A request without a resolvable host is treated as remote.
	let host = host.map_or_else(String::new, |Host(host)| host);
	let mut post_data: Option<String> = None;
	let mut image: Option<(String, Vec<u8>)> = None;

	while let Some(field) = multipart.next_field().await? {
		match field.name() {
			Some("postData") => post_data = Some(field.text().await?),
			Some("image") => {
				let filename = field
					.file_name()
					.map(ToString::to_string)
					.filter(|name| !name.is_empty());
				let bytes = field.bytes().await?;

				if let Some(filename) = filename {
					image = Some((filename, bytes.to_vec()));
				}
			}
			_ => {}
		}
	}

	let post_data = post_data.ok_or_else(|| Error::BadRequest("Post data missing".to_string()))?;
	let input: model::PostInput = serde_json::from_str(&post_data)?;
	let (mut post, captcha_token) = input.into_post()?;

	if !is_local_host(&host) {
		if captcha_token.is_empty() {
			return Err(Error::BadRequest("CAPTCHA token missing".to_string()));
		}

		if !state
			.captcha
			.verify(&captcha_token)
			.await
			.map_err(Error::Captcha)?
		{
			return Err(Error::BadRequest("CAPTCHA verification failed".to_string()));
		}
	}

	if let Some((filename, bytes)) = image {
		upload::validate_image(&filename, bytes.len())?;

		// A failed upload is logged inside the client; the post still goes in.
		if let Some(url) = state.images.upload(filename, bytes).await {
			post.content.image = Some(url);
		}
	}

	post.created_at = DateTime::now();
	// Alpha-period default: submissions go live without review.
	post.status = model::Status::Approved;

	let result = state.repos.posts().insert_one(&post).await?;
	let post_id = result
		.inserted_id
		.as_object_id()
		.map(|id| id.to_hex())
		.unwrap_or_default();

	Ok((
		StatusCode::CREATED,
		axum::Json(json!({ "message": "Post created", "post_id": post_id })),
	))
}

/// Returns all approved posts matching the optional tag filters.
pub async fn list_posts(
	State(state): State<AppState>,
	Query(filter): Query<model::TagFilter>,
) -> Result<Json<Vec<model::PostResponse>>, Error> {
	let query = model::list_filter(filter.tag.as_deref(), &filter.optional_tags);
	let posts: Vec<model::Post> = state.repos.posts().find(query).await?.try_collect().await?;

	Ok(Json(posts.into_iter().map(Into::into).collect()))
}

/// Updates an existing post by its identifier.
pub async fn update_post(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(input): Json<model::PostInput>,
) -> Result<axum::Json<serde_json::Value>, Error> {
	let id = ObjectId::parse_str(&id)?;
	let (post, captcha_token) = input.into_post()?;

	if captcha_token.is_empty() {
		return Err(Error::BadRequest("CAPTCHA token missing".to_string()));
	}

	if !state
		.captcha
		.verify(&captcha_token)
		.await
		.map_err(Error::Captcha)?
	{
		return Err(Error::BadRequest("CAPTCHA verification failed".to_string()));
	}

	let update = doc! { "$set": model::update_document(&post)? };
	let result = state
		.repos
		.posts()
		.update_one(doc! { "_id": id }, update)
		.await?;

	if result.matched_count == 0 {
		return Err(Error::NotFound("Post"));
	}

	Ok(axum::Json(json!({ "message": "Post updated" })))
}

/// Deletes a post by its identifier.
pub async fn delete_post(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<axum::Json<serde_json::Value>, Error> {
	let id = ObjectId::parse_str(&id)?;
	let result = state.repos.posts().delete_one(doc! { "_id": id }).await?;

	if result.deleted_count == 0 {
		return Err(Error::NotFound("Post"));
	}

	Ok(axum::Json(json!({ "message": "Post deleted" })))
}

#[cfg(test)]
mod test {
	use super::is_local_host;

	#[test]
	fn local_hosts_skip_captcha() {
		assert!(is_local_host("localhost"));
		assert!(is_local_host("localhost:3000"));
		assert!(is_local_host("127.0.0.1:8080"));
		assert!(!is_local_host("stories.example.com"));
	}
}
