use mongodb::{
	bson::doc,
	options::IndexOptions,
	Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use crate::route::{auth::model::User, post::model::Post};

/// A tag pre-approved for suggesting in the admin post form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedTag {
	pub name: String,
}

/// Accessors for the database collections.
///
/// The collections are the sole source of truth; neither the HTTP layer nor
/// the admin panel holds durable state of its own.
#[derive(Clone)]
pub struct Repos {
	database: Database,
}

impl Repos {
	pub fn new(database: Database) -> Self {
		Self { database }
	}

	pub fn posts(&self) -> Collection<Post> {
		self.database.collection("stories")
	}

	pub fn users(&self) -> Collection<User> {
		self.database.collection("users")
	}

	pub fn approved_tags(&self) -> Collection<ApprovedTag> {
		self.database.collection("approved_tags")
	}

	/// Creates the unique username index. Safe to call on every startup.
	pub async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
		let index = IndexModel::builder()
			.keys(doc! { "username": 1 })
			.options(IndexOptions::builder().unique(true).build())
			.build();

		self.users().create_index(index).await?;
		Ok(())
	}
}
