use askama::Template;
use axum::{
	extract::{Form, Path, Query, State},
	response::{Html, IntoResponse, Redirect, Response},
	Extension,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::Deserialize;

use crate::{
	repo::{ApprovedTag, Repos},
	route::post::model::{update_document, Post},
	session::CurrentUser,
	AppState, Error,
};

use super::form::PostForm;

/// Filter and sort parameters for the post table. Empty strings are absent
/// filters, which is how an HTML filter form submits untouched inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostListQuery {
	pub sort: String,
	pub order: String,
	pub title: String,
	pub title_op: String,
	pub tag: String,
	pub tag_op: String,
	pub status: String,
	pub status_op: String,
	pub created_after: String,
	pub created_before: String,
}

impl PostListQuery {
	/// Composes the collection filter from whichever inputs are present.
	pub fn filter(&self) -> Document {
		let mut filter = Document::new();

		if !self.title.is_empty() {
			match self.title_op.as_str() {
				"eq" => filter.insert("title", &self.title),
				"ne" => filter.insert("title", doc! { "$ne": &self.title }),
				// substring match by default
				_ => filter.insert(
					"title",
					doc! { "$regex": regex_escape(&self.title), "$options": "i" },
				),
			};
		}

		if !self.tag.is_empty() {
			match self.tag_op.as_str() {
				"ne" => filter.insert("tag", doc! { "$ne": &self.tag }),
				_ => filter.insert("tag", &self.tag),
			};
		}

		if !self.status.is_empty() {
			match self.status_op.as_str() {
				"ne" => filter.insert("status", doc! { "$ne": &self.status }),
				_ => filter.insert("status", &self.status),
			};
		}

		let mut created = Document::new();

		if let Some(after) = parse_day(&self.created_after) {
			created.insert("$gt", after);
		}

		if let Some(before) = parse_day(&self.created_before) {
			created.insert("$lt", before);
		}

		if !created.is_empty() {
			filter.insert("created_at", created);
		}

		filter
	}

	/// Sort specification, restricted to the sortable columns.
	pub fn sort_document(&self) -> Option<Document> {
		let field = match self.sort.as_str() {
			"title" | "created_at" | "status" => self.sort.as_str(),
			_ => return None,
		};

		let direction: i32 = if self.order == "desc" { -1 } else { 1 };
		Some(doc! { field: direction })
	}
}

fn regex_escape(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		if "\\.+*?()[]{}^$|".contains(c) {
			escaped.push('\\');
		}
		escaped.push(c);
	}

	escaped
}

fn parse_day(value: &str) -> Option<DateTime> {
	let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
	Some(DateTime::from_chrono(date.and_hms_opt(0, 0, 0)?.and_utc()))
}

/// One row of the post table, pre-rendered for display.
pub struct PostRow {
	pub id: String,
	pub title: String,
	pub image: String,
	pub description: String,
	pub location: String,
	pub tag: &'static str,
	pub optional_tags: String,
	pub created_at: String,
	pub status: &'static str,
}

impl From<&Post> for PostRow {
	fn from(post: &Post) -> Self {
		Self {
			id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
			title: post.title.clone(),
			image: post.content.image.clone().unwrap_or_default(),
			description: post.content.description.clone(),
			location: format!(
				"{:.4}, {:.4}",
				post.location.latitude(),
				post.location.longitude()
			),
			tag: post.tag.as_str(),
			optional_tags: PostForm::join_tags(&post.optional_tags),
			created_at: post.created_at.to_chrono().format("%Y-%m-%d %H:%M").to_string(),
			status: post.status.as_str(),
		}
	}
}

#[derive(Template)]
#[template(path = "posts.html")]
struct PostsTemplate {
	username: String,
	rows: Vec<PostRow>,
	query: PostListQuery,
}

#[derive(Template)]
#[template(path = "post_form.html")]
struct PostFormTemplate {
	username: String,
	heading: &'static str,
	action: String,
	error: String,
	form: PostForm,
	suggestions: Vec<String>,
}

async fn approved_tag_names(repos: &Repos) -> Result<Vec<String>, Error> {
	let tags: Vec<ApprovedTag> = repos.approved_tags().find(doc! {}).await?.try_collect().await?;
	Ok(tags.into_iter().map(|tag| tag.name).collect())
}

pub async fn list(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Query(query): Query<PostListQuery>,
) -> Result<Html<String>, Error> {
	let collection = state.repos.posts();
	let mut find = collection.find(query.filter());

	if let Some(sort) = query.sort_document() {
		find = find.sort(sort);
	}

	let posts: Vec<Post> = find.await?.try_collect().await?;

	let page = PostsTemplate {
		username: user.0.username,
		rows: posts.iter().map(Into::into).collect(),
		query,
	};

	Ok(Html(page.render()?))
}

pub async fn new_form(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
) -> Result<Html<String>, Error> {
	let page = PostFormTemplate {
		username: user.0.username,
		heading: "New Post",
		action: "/admin/posts/new".to_string(),
		error: String::new(),
		form: PostForm::default(),
		suggestions: approved_tag_names(&state.repos).await?,
	};

	Ok(Html(page.render()?))
}

pub async fn create(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Form(form): Form<PostForm>,
) -> Result<Response, Error> {
	match form.clone().into_post(None) {
		Ok(post) => {
			state.repos.posts().insert_one(&post).await?;
			Ok(Redirect::to("/admin/posts").into_response())
		}
		Err(error) => {
			let page = PostFormTemplate {
				username: user.0.username,
				heading: "New Post",
				action: "/admin/posts/new".to_string(),
				error: error.to_string(),
				form,
				suggestions: approved_tag_names(&state.repos).await?,
			};

			Ok(Html(page.render()?).into_response())
		}
	}
}

pub async fn edit_form(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Path(id): Path<String>,
) -> Result<Html<String>, Error> {
	let id = ObjectId::parse_str(&id)?;
	let post = state
		.repos
		.posts()
		.find_one(doc! { "_id": id })
		.await?
		.ok_or(Error::NotFound("Post"))?;

	let page = PostFormTemplate {
		username: user.0.username,
		heading: "Edit Post",
		action: format!("/admin/posts/{}/edit", id.to_hex()),
		error: String::new(),
		form: PostForm::from_post(&post),
		suggestions: approved_tag_names(&state.repos).await?,
	};

	Ok(Html(page.render()?))
}

pub async fn update(
	State(state): State<AppState>,
	Extension(user): Extension<CurrentUser>,
	Path(id): Path<String>,
	Form(form): Form<PostForm>,
) -> Result<Response, Error> {
	let id = ObjectId::parse_str(&id)?;
	let existing = state
		.repos
		.posts()
		.find_one(doc! { "_id": id })
		.await?
		.ok_or(Error::NotFound("Post"))?;

	match form.clone().into_post(Some(&existing)) {
		Ok(post) => {
			let update = doc! { "$set": update_document(&post)? };
			state
				.repos
				.posts()
				.update_one(doc! { "_id": id }, update)
				.await?;

			Ok(Redirect::to("/admin/posts").into_response())
		}
		Err(error) => {
			let page = PostFormTemplate {
				username: user.0.username,
				heading: "Edit Post",
				action: format!("/admin/posts/{}/edit", id.to_hex()),
				error: error.to_string(),
				form,
				suggestions: approved_tag_names(&state.repos).await?,
			};

			Ok(Html(page.render()?).into_response())
		}
	}
}

pub async fn delete(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Redirect, Error> {
	let id = ObjectId::parse_str(&id)?;
	state.repos.posts().delete_one(doc! { "_id": id }).await?;

	Ok(Redirect::to("/admin/posts"))
}

#[cfg(test)]
mod test {
	use mongodb::bson::doc;

	use super::PostListQuery;

	#[test]
	fn empty_query_builds_an_empty_filter() {
		let query = PostListQuery::default();

		assert!(query.filter().is_empty());
		assert!(query.sort_document().is_none());
	}

	#[test]
	fn title_defaults_to_substring_match_with_escaping() {
		let query = PostListQuery {
			title: "storm (2024)".to_string(),
			..PostListQuery::default()
		};

		assert_eq!(
			query.filter(),
			doc! { "title": { "$regex": "storm \\(2024\\)", "$options": "i" } }
		);
	}

	#[test]
	fn equality_and_inequality_operators() {
		let query = PostListQuery {
			title: "Flood".to_string(),
			title_op: "eq".to_string(),
			tag: "Positive".to_string(),
			tag_op: "ne".to_string(),
			status: "pending".to_string(),
			..PostListQuery::default()
		};

		assert_eq!(
			query.filter(),
			doc! {
				"title": "Flood",
				"tag": { "$ne": "Positive" },
				"status": "pending",
			}
		);
	}

	#[test]
	fn creation_time_bounds_combine() {
		let query = PostListQuery {
			created_after: "2024-01-01".to_string(),
			created_before: "2024-06-30".to_string(),
			..PostListQuery::default()
		};

		let filter = query.filter();
		let created = filter.get_document("created_at").unwrap();

		assert!(created.contains_key("$gt"));
		assert!(created.contains_key("$lt"));
	}

	#[test]
	fn malformed_dates_are_ignored() {
		let query = PostListQuery {
			created_after: "yesterday".to_string(),
			..PostListQuery::default()
		};

		assert!(query.filter().is_empty());
	}

	#[test]
	fn sort_is_restricted_to_known_columns() {
		let query = PostListQuery {
			sort: "created_at".to_string(),
			order: "desc".to_string(),
			..PostListQuery::default()
		};
		assert_eq!(query.sort_document(), Some(doc! { "created_at": -1 }));

		let query = PostListQuery {
			sort: "password".to_string(),
			..PostListQuery::default()
		};
		assert!(query.sort_document().is_none());
	}
}
