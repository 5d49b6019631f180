use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Closed sentiment classification of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
	Positive,
	Neutral,
	Negative,
}

impl Sentiment {
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"Positive" => Some(Self::Positive),
			"Neutral" => Some(Self::Neutral),
			"Negative" => Some(Self::Negative),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Positive => "Positive",
			Self::Neutral => "Neutral",
			Self::Negative => "Negative",
		}
	}
}

/// Moderation state gating public visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	#[default]
	Pending,
	Approved,
}

impl Status {
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"pending" => Some(Self::Pending),
			"approved" => Some(Self::Approved),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Approved => "approved",
		}
	}
}

/// The story body: a description and an optional hosted image URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
}

/// A GeoJSON point, `coordinates` ordered `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	#[serde(rename = "type")]
	pub kind: String,
	pub coordinates: [f64; 2],
}

impl GeoPoint {
	pub fn new(longitude: f64, latitude: f64) -> Self {
		Self {
			kind: "Point".to_string(),
			coordinates: [longitude, latitude],
		}
	}

	pub fn longitude(&self) -> f64 {
		self.coordinates[0]
	}

	pub fn latitude(&self) -> f64 {
		self.coordinates[1]
	}
}

/// A stored climate story, in its collection shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
	#[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
	pub id: Option<ObjectId>,
	pub title: String,
	pub content: Content,
	pub location: GeoPoint,
	pub tag: Sentiment,
	#[serde(default)]
	pub optional_tags: Vec<String>,
	/// Documents that predate the timestamp rollout fall back to "now".
	#[serde(default = "DateTime::now")]
	pub created_at: DateTime,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime>,
	#[serde(default)]
	pub status: Status,
}

fn validate_tag(tag: &str) -> Result<(), ValidationError> {
	if Sentiment::parse(tag).is_some() {
		return Ok(());
	}

	let mut error = ValidationError::new("invalid_tag");
	error.message = Some("Must be one of: Positive, Neutral, Negative.".into());
	Err(error)
}

/// An incoming post payload.
///
/// Required fields are `Option` so that one validation pass reports every
/// offending field at once instead of stopping at the first.
#[derive(Debug, Deserialize, Validate)]
pub struct PostInput {
	#[validate(required, length(min = 1, message = "Title must not be empty."))]
	pub title: Option<String>,
	#[validate(required, nested)]
	pub content: Option<ContentInput>,
	#[validate(required)]
	pub location: Option<GeoPointInput>,
	#[validate(required, custom(function = "validate_tag"))]
	pub tag: Option<String>,
	#[serde(default, rename = "optionalTags")]
	pub optional_tags: Vec<String>,
	#[validate(required)]
	#[serde(rename = "captchaToken")]
	pub captcha_token: Option<String>,
	#[serde(default)]
	pub status: Option<Status>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ContentInput {
	#[validate(required, length(min = 1, message = "Description must not be empty."))]
	pub description: Option<String>,
	#[serde(default)]
	pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeoPointInput {
	#[serde(default = "point_kind", rename = "type")]
	pub kind: String,
	pub coordinates: [f64; 2],
}

fn point_kind() -> String {
	"Point".to_string()
}

impl PostInput {
	/// Validates the payload and splits it into the storage document and the
	/// CAPTCHA token stripped from it.
	pub fn into_post(self) -> Result<(Post, String), ValidationErrors> {
		self.validate()?;

		let (
			Some(title),
			Some(content),
			Some(location),
			Some(tag),
			Some(captcha_token),
		) = (
			self.title,
			self.content,
			self.location,
			self.tag,
			self.captcha_token,
		)
		else {
			return Err(ValidationErrors::new());
		};

		let (Some(description), Some(tag)) = (content.description, Sentiment::parse(&tag)) else {
			return Err(ValidationErrors::new());
		};

		let post = Post {
			id: None,
			title,
			content: Content {
				description,
				image: content.image,
			},
			location: GeoPoint {
				kind: location.kind,
				coordinates: location.coordinates,
			},
			tag,
			optional_tags: self.optional_tags,
			created_at: DateTime::now(),
			updated_at: None,
			status: self.status.unwrap_or_default(),
		};

		Ok((post, captcha_token))
	}
}

/// Optional filters accepted by the listing endpoint.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TagFilter {
	#[validate(custom(function = "validate_tag"))]
	pub tag: Option<String>,
	#[serde(default, rename = "optionalTags")]
	pub optional_tags: Vec<String>,
}

/// Builds the listing query: always restricted to approved posts, narrowed by
/// an exact tag match and/or an all-of optional-tags match when supplied.
pub fn list_filter(tag: Option<&str>, optional_tags: &[String]) -> Document {
	let mut filter = doc! { "status": Status::Approved.as_str() };

	match (tag, optional_tags.is_empty()) {
		(Some(tag), false) => {
			filter.insert(
				"$and",
				vec![
					doc! { "tag": tag },
					doc! { "optional_tags": { "$all": optional_tags.to_vec() } },
				],
			);
		}
		(Some(tag), true) => {
			filter.insert("tag", tag);
		}
		(None, false) => {
			filter.insert("optional_tags", doc! { "$all": optional_tags.to_vec() });
		}
		(None, true) => {}
	}

	filter
}

/// Builds the `$set` document for an update: every schema field plus a fresh
/// `updated_at`, leaving `created_at` untouched.
pub fn update_document(post: &Post) -> mongodb::bson::ser::Result<Document> {
	Ok(doc! {
		"title": &post.title,
		"content": mongodb::bson::to_bson(&post.content)?,
		"location": mongodb::bson::to_bson(&post.location)?,
		"tag": post.tag.as_str(),
		"optional_tags": &post.optional_tags,
		"status": post.status.as_str(),
		"updated_at": DateTime::now(),
	})
}

/// A post as returned by the JSON API.
#[derive(Debug, Serialize)]
pub struct PostResponse {
	#[serde(rename = "_id")]
	pub id: String,
	pub title: String,
	pub content: Content,
	pub location: GeoPoint,
	pub tag: Sentiment,
	#[serde(rename = "optionalTags")]
	pub optional_tags: Vec<String>,
	#[serde(rename = "createdAt")]
	pub created_at: String,
	pub status: Status,
}

impl From<Post> for PostResponse {
	fn from(post: Post) -> Self {
		Self {
			id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
			title: post.title,
			content: post.content,
			location: post.location,
			tag: post.tag,
			optional_tags: post.optional_tags,
			created_at: post.created_at.to_chrono().to_rfc3339(),
			status: post.status,
		}
	}
}

#[cfg(test)]
mod test {
	use mongodb::bson::doc;

	use super::{list_filter, update_document, Post, PostInput, Sentiment, Status};
	use crate::error::validation_messages;

	fn input(json: &str) -> PostInput {
		serde_json::from_str(json).unwrap()
	}

	const VALID: &str = r#"{
		"title": "Flood",
		"content": { "description": "The river broke its banks." },
		"location": { "type": "Point", "coordinates": [174.76, -36.85] },
		"tag": "Negative",
		"optionalTags": ["flood", "drought"],
		"captchaToken": "tok"
	}"#;

	#[test]
	fn valid_payload_splits_into_post_and_token() {
		let (post, token) = input(VALID).into_post().unwrap();

		assert_eq!(post.title, "Flood");
		assert_eq!(post.tag, Sentiment::Negative);
		assert_eq!(post.status, Status::Pending);
		assert_eq!(post.optional_tags, vec!["flood", "drought"]);
		assert_eq!(post.location.longitude(), 174.76);
		assert_eq!(token, "tok");
	}

	#[test]
	fn missing_fields_are_enumerated() {
		let errors = input("{}").into_post().unwrap_err();
		let messages = validation_messages(&errors);

		for field in ["title", "content", "location", "tag", "captcha_token"] {
			assert!(messages.contains_key(field), "missing {field}");
		}
	}

	#[test]
	fn unknown_tag_is_named() {
		let errors = input(&VALID.replace("Negative", "Happy"))
			.into_post()
			.unwrap_err();
		let messages = validation_messages(&errors);

		assert!(messages.contains_key("tag"));
		assert_eq!(messages.len(), 1);
	}

	#[test]
	fn filter_defaults_to_approved_only() {
		assert_eq!(list_filter(None, &[]), doc! { "status": "approved" });
	}

	#[test]
	fn filter_with_tag_only() {
		assert_eq!(
			list_filter(Some("Positive"), &[]),
			doc! { "status": "approved", "tag": "Positive" }
		);
	}

	#[test]
	fn filter_with_optional_tags_only() {
		let tags = vec!["flood".to_string(), "drought".to_string()];

		assert_eq!(
			list_filter(None, &tags),
			doc! { "status": "approved", "optional_tags": { "$all": ["flood", "drought"] } }
		);
	}

	#[test]
	fn filter_with_both_combines_under_and() {
		let tags = vec!["flood".to_string()];

		assert_eq!(
			list_filter(Some("Negative"), &tags),
			doc! {
				"status": "approved",
				"$and": [
					{ "tag": "Negative" },
					{ "optional_tags": { "$all": ["flood"] } },
				],
			}
		);
	}

	#[test]
	fn update_document_stamps_updated_at_but_not_created_at() {
		let (post, _) = input(VALID).into_post().unwrap();
		let update = update_document(&post).unwrap();

		assert!(update.contains_key("updated_at"));
		assert!(!update.contains_key("created_at"));
		assert_eq!(update.get_str("tag").unwrap(), "Negative");
	}

	#[test]
	fn response_renames_wire_fields() {
		let (mut post, _) = input(VALID).into_post().unwrap();
		post.id = Some(mongodb::bson::oid::ObjectId::new());
		let response = serde_json::to_value(super::PostResponse::from(post)).unwrap();

		assert!(response.get("_id").is_some());
		assert!(response.get("optionalTags").is_some());
		assert!(response.get("createdAt").is_some());
		assert!(response.get("optional_tags").is_none());
		assert_eq!(response["status"], "pending");
		assert!(response["createdAt"].as_str().unwrap().contains('T'));
	}
}
