use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{comment, group, post, user};
use crate::utils::paginator::Paginated;

use super::forms::{CommentFields, FormErrors, PostFields};

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i32,
    pub username: String,
    pub full_name: String,
}

impl From<user::Model> for AuthorView {
    fn from(user: user::Model) -> Self {
        let full_name = format!("{} {}", user.first_name, user.last_name)
            .trim()
            .to_string();
        Self {
            id: user.id,
            username: user.username,
            full_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<group::Model> for GroupView {
    fn from(group: group::Model) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

/// A post as listing and detail templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: String,
    pub author_id: i32,
    pub group: Option<GroupView>,
    pub image: Option<String>,
}

impl PostView {
    pub fn new(post: post::Model, author: String, group: Option<GroupView>) -> Self {
        Self {
            id: post.id,
            text: post.text,
            pub_date: post.pub_date,
            author,
            author_id: post.author_id,
            group,
            image: post.image,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: String,
}

impl CommentView {
    pub fn new(comment: comment::Model, author: String) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created: comment.created,
            author,
        }
    }
}

// ---------------------------------------------------------------------------
// Page contexts
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct IndexContext {
    pub page_obj: Paginated<PostView>,
}

#[derive(Serialize)]
pub struct GroupListContext {
    pub group: GroupView,
    pub page_obj: Paginated<PostView>,
}

#[derive(Serialize)]
pub struct ProfileContext {
    pub author: AuthorView,
    pub posts_count: u64,
    /// Whether the current visitor follows this author.
    pub following: bool,
    pub page_obj: Paginated<PostView>,
}

#[derive(Serialize)]
pub struct FollowContext {
    pub title: &'static str,
    pub page_obj: Paginated<PostView>,
}

#[derive(Debug, Default, Serialize)]
pub struct CommentFormView {
    pub fields: CommentFields,
    pub errors: FormErrors,
}

#[derive(Serialize)]
pub struct PostDetailContext {
    pub post: PostView,
    pub author: AuthorView,
    pub posts_count: u64,
    pub comments: Vec<CommentView>,
    pub form: CommentFormView,
}

#[derive(Debug, Default, Serialize)]
pub struct PostFormView {
    pub fields: PostFields,
    pub errors: FormErrors,
    /// Image currently attached to the post being edited.
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct PostFormContext {
    pub form: PostFormView,
    /// Choices for the group select.
    pub groups: Vec<GroupView>,
    pub is_edit: bool,
    pub post_id: Option<i32>,
}
