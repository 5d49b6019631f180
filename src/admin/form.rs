use mongodb::bson::DateTime;
use serde::Deserialize;

use crate::route::post::model::{Content, GeoPoint, Post, Sentiment, Status};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
	#[error("Tag must be one of: Positive, Neutral, Negative.")]
	InvalidTag,
	#[error("Status must be pending or approved.")]
	InvalidStatus,
	#[error("Coordinates must be numbers.")]
	InvalidCoordinates,
}

/// The flattened edit-form representation of a post.
///
/// The pseudo-fields (`content_description`, `location_latitude`, the
/// comma-joined tag string) exist only in the form; [`PostForm::from_post`]
/// and [`PostForm::into_post`] are the explicit bidirectional mapping between
/// this shape and the nested stored shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostForm {
	pub title: String,
	pub content_description: String,
	#[serde(default)]
	pub content_image: String,
	pub location_latitude: String,
	pub location_longitude: String,
	pub tag: String,
	#[serde(default, rename = "optionalTags")]
	pub optional_tags: String,
	#[serde(default)]
	pub status: String,
}

impl PostForm {
	/// Flattens a stored post into form fields.
	pub fn from_post(post: &Post) -> Self {
		Self {
			title: post.title.clone(),
			content_description: post.content.description.clone(),
			content_image: post.content.image.clone().unwrap_or_default(),
			location_latitude: post.location.latitude().to_string(),
			location_longitude: post.location.longitude().to_string(),
			tag: post.tag.as_str().to_string(),
			optional_tags: Self::join_tags(&post.optional_tags),
			status: post.status.as_str().to_string(),
		}
	}

	/// Reassembles the nested stored shape, discarding the flattened fields.
	///
	/// `existing` carries over the identifier and creation time on edits;
	/// `None` creates a fresh document.
	pub fn into_post(self, existing: Option<&Post>) -> Result<Post, FormError> {
		let tag = Sentiment::parse(&self.tag).ok_or(FormError::InvalidTag)?;

		let status = match self.status.as_str() {
			"" => Status::Pending,
			value => Status::parse(value).ok_or(FormError::InvalidStatus)?,
		};

		let latitude: f64 = self
			.location_latitude
			.trim()
			.parse()
			.map_err(|_| FormError::InvalidCoordinates)?;
		let longitude: f64 = self
			.location_longitude
			.trim()
			.parse()
			.map_err(|_| FormError::InvalidCoordinates)?;

		let image = self.content_image.trim();

		Ok(Post {
			id: existing.and_then(|post| post.id),
			title: self.title,
			content: Content {
				description: self.content_description,
				image: (!image.is_empty()).then(|| image.to_string()),
			},
			location: GeoPoint::new(longitude, latitude),
			tag,
			optional_tags: Self::split_tags(&self.optional_tags),
			created_at: existing.map_or_else(DateTime::now, |post| post.created_at),
			updated_at: existing.map(|_| DateTime::now()),
			status,
		})
	}

	/// Splits the comma-joined tag string back into a list.
	pub fn split_tags(raw: &str) -> Vec<String> {
		raw.split(',')
			.map(str::trim)
			.filter(|tag| !tag.is_empty())
			.map(ToString::to_string)
			.collect()
	}

	/// Joins a tag list for display in a single text field.
	pub fn join_tags(tags: &[String]) -> String {
		tags.join(", ")
	}
}

#[cfg(test)]
mod test {
	use mongodb::bson::DateTime;

	use super::{FormError, PostForm};
	use crate::route::post::model::{Content, GeoPoint, Post, Sentiment, Status};

	fn stored_post() -> Post {
		Post {
			id: Some(mongodb::bson::oid::ObjectId::new()),
			title: "Drought".to_string(),
			content: Content {
				description: "No rain for months.".to_string(),
				image: Some("https://cdn.example/d.png".to_string()),
			},
			location: GeoPoint::new(151.2, -33.86),
			tag: Sentiment::Negative,
			optional_tags: vec!["drought".to_string(), "farming".to_string()],
			created_at: DateTime::now(),
			updated_at: None,
			status: Status::Approved,
		}
	}

	#[test]
	fn round_trip_preserves_the_stored_shape() {
		let post = stored_post();
		let rebuilt = PostForm::from_post(&post).into_post(Some(&post)).unwrap();

		assert_eq!(rebuilt.id, post.id);
		assert_eq!(rebuilt.title, post.title);
		assert_eq!(rebuilt.content.description, post.content.description);
		assert_eq!(rebuilt.content.image, post.content.image);
		assert_eq!(rebuilt.location.coordinates, post.location.coordinates);
		assert_eq!(rebuilt.location.kind, "Point");
		assert_eq!(rebuilt.tag, post.tag);
		assert_eq!(rebuilt.optional_tags, post.optional_tags);
		assert_eq!(rebuilt.created_at, post.created_at);
		assert_eq!(rebuilt.status, post.status);
		assert!(rebuilt.updated_at.is_some());
	}

	#[test]
	fn flattening_joins_tags_and_splits_them_back() {
		let form = PostForm::from_post(&stored_post());
		assert_eq!(form.optional_tags, "drought, farming");

		assert_eq!(
			PostForm::split_tags(" drought ,, farming ,"),
			vec!["drought", "farming"]
		);
		assert!(PostForm::split_tags("  ").is_empty());
	}

	#[test]
	fn fresh_forms_create_pending_posts() {
		let form = PostForm {
			title: "Heatwave".to_string(),
			content_description: "Hottest week on record.".to_string(),
			location_latitude: "48.85".to_string(),
			location_longitude: "2.35".to_string(),
			tag: "Neutral".to_string(),
			..PostForm::default()
		};

		let post = form.into_post(None).unwrap();

		assert_eq!(post.id, None);
		assert_eq!(post.status, Status::Pending);
		assert_eq!(post.content.image, None);
		assert_eq!(post.location.coordinates, [2.35, 48.85]);
		assert!(post.updated_at.is_none());
	}

	#[test]
	fn invalid_fields_are_rejected() {
		let valid = PostForm::from_post(&stored_post());

		let mut form = valid.clone();
		form.tag = "Happy".to_string();
		assert_eq!(form.into_post(None), Err(FormError::InvalidTag));

		let mut form = valid.clone();
		form.status = "archived".to_string();
		assert_eq!(form.into_post(None), Err(FormError::InvalidStatus));

		let mut form = valid;
		form.location_latitude = "north".to_string();
		assert_eq!(form.into_post(None), Err(FormError::InvalidCoordinates));
	}
}
