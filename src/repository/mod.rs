use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{
        Analytics, Category, CategoryInput, CategoryWithCount, Comment, CommentStatus,
        CommentWithPost, CreateCommentRequest, DashboardStats, LikeStatus, NewProfile, PostDetail,
        PostFilter, PostInput, Profile, ProfileUpdate, SiteSettings, SiteSettingsInput, Tag,
        TagInput, TagWithCount, UserSummary,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The persistence contract the handlers are written against. `PostgresRepository`
/// talks to the Supabase database; `InMemoryRepository` backs the test suite.
///
/// Lookups return `Ok(None)` / `Ok(false)` for missing rows, so handlers decide
/// what "not found" means for their route.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, id: Uuid) -> RepoResult<Option<Profile>>;
    /// Inserts the profile, or refreshes e-mail/name/role when it already exists.
    async fn upsert_profile(&self, profile: NewProfile) -> RepoResult<Profile>;
    /// Partial update; `None` fields are left untouched.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Profile>>;
    async fn delete_profile(&self, id: Uuid) -> RepoResult<bool>;
    /// Every profile with its number of authored posts, newest first.
    async fn list_users(&self) -> RepoResult<Vec<UserSummary>>;

    // --- Posts ---
    async fn list_posts(&self, filter: &PostFilter) -> RepoResult<Vec<PostDetail>>;
    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostDetail>>;
    /// Only published, non-trashed posts are returned.
    async fn get_published_post_by_slug(&self, slug: &str) -> RepoResult<Option<PostDetail>>;
    /// Writes the post and synchronises its category and tag links in one unit.
    async fn create_post(&self, input: PostInput, author_id: Uuid) -> RepoResult<PostDetail>;
    /// Like `create_post`; links are only replaced when supplied.
    async fn update_post(&self, id: Uuid, input: PostInput) -> RepoResult<Option<PostDetail>>;
    /// Soft delete: stamps `deleted_at` and reverts the post to draft.
    async fn trash_post(&self, id: Uuid) -> RepoResult<bool>;
    async fn restore_post(&self, id: Uuid) -> RepoResult<bool>;
    /// Permanent delete, including links, comments and likes.
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;
    /// Bumps the view counter of a live post, returning the new count.
    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>>;

    // --- Categories ---
    async fn list_categories(&self) -> RepoResult<Vec<CategoryWithCount>>;
    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>>;
    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category>;
    async fn update_category(&self, id: Uuid, input: CategoryInput) -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: Uuid) -> RepoResult<bool>;

    // --- Tags ---
    async fn list_tags(&self) -> RepoResult<Vec<TagWithCount>>;
    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>>;
    async fn create_tag(&self, input: TagInput) -> RepoResult<Tag>;
    async fn update_tag(&self, id: Uuid, input: TagInput) -> RepoResult<Option<Tag>>;
    async fn delete_tag(&self, id: Uuid) -> RepoResult<bool>;

    // --- Comments ---
    /// Approved comments of one post, oldest first.
    async fn list_approved_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>>;
    /// Moderation queue: every comment with its post, newest first.
    async fn list_comments(&self, status: Option<CommentStatus>) -> RepoResult<Vec<CommentWithPost>>;
    async fn create_comment(&self, post_id: Uuid, req: CreateCommentRequest) -> RepoResult<Comment>;
    async fn set_comment_status(&self, id: Uuid, status: CommentStatus) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool>;

    // --- Likes ---
    async fn like_status(&self, post_id: Uuid, user_id: Option<Uuid>) -> RepoResult<LikeStatus>;
    /// Adds the like if absent, removes it otherwise.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<LikeStatus>;

    // --- Settings ---
    async fn get_settings(&self) -> RepoResult<Option<SiteSettings>>;
    async fn save_settings(&self, input: SiteSettingsInput) -> RepoResult<SiteSettings>;

    // --- Dashboard ---
    async fn dashboard_stats(&self) -> RepoResult<DashboardStats>;
    async fn analytics(&self) -> RepoResult<Analytics>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// Number of posts on the dashboard's "recent" list.
pub const RECENT_POSTS_LIMIT: usize = 5;
/// Number of posts on the analytics "top content" list.
pub const TOP_CONTENT_LIMIT: usize = 4;
