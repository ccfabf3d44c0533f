use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::role::Role;

/// slugify
///
/// Lowercases and replaces spaces with dashes. Used for tag, category and
/// post slugs whenever the caller does not provide one.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

// --- Profiles ---

/// Profile
///
/// A row of `public.profiles`, keyed by the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub professional_bio: Option<String>,
    // Free-form role string; see `Profile::role`.
    pub role: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// The parsed role. A profile without a role is an `Unknown` one.
    pub fn role(&self) -> Role {
        self.role.as_deref().map(Role::parse).unwrap_or(Role::Unknown)
    }
}

/// NewProfile
///
/// Insert-or-update payload used after sign-up and invites.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Role,
}

/// ProfileUpdate
///
/// Partial profile update. `None` leaves a column untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// UserSummary
///
/// Row of the admin user list, with display defaults already applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[ts(type = "string")]
    pub joined_at: DateTime<Utc>,
    pub avatar: String,
    pub posts_count: i64,
}

impl UserSummary {
    pub fn from_profile(profile: Profile, posts_count: i64) -> Self {
        Self {
            id: profile.id,
            name: profile.full_name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unnamed User".to_string()),
            email: profile.email.filter(|e| !e.is_empty()).unwrap_or_else(|| "No Email".to_string()),
            role: profile.role.filter(|r| !r.is_empty()).unwrap_or_else(|| "Subscriber".to_string()),
            joined_at: profile.created_at,
            avatar: profile.avatar_url.unwrap_or_default(),
            posts_count,
        }
    }
}

// --- Posts ---

/// PostStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

/// Post
///
/// A row of `public.posts`. `status` is stored as text (`draft` | `published`);
/// a non-null `deleted_at` means the post is in the trash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: String,
    pub author_id: Option<Uuid>,
    pub featured_image_url: Option<String>,
    pub gallery_image_url: Option<String>,
    pub allow_comments: bool,
    pub view_count: i32,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published.as_str()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Visible on the public site.
    pub fn is_live(&self) -> bool {
        self.is_published() && !self.is_trashed()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// PostDetail
///
/// A post with its author, categories and tag names resolved.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostDetail {
    pub post: Post,
    pub author: Option<AuthorSummary>,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<String>,
}

/// PostInput
///
/// Create/update payload for the back office post form. Images are passed as
/// URLs (uploaded beforehand through the presigned upload flow).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub featured_image_url: Option<String>,
    #[serde(default)]
    pub gallery_image_url: Option<String>,
    #[serde(default = "default_true")]
    pub allow_comments: bool,
    /// Explicit publish date. When absent, publishing stamps the current time once.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    /// Category ids to link. On update, `None` leaves the links untouched.
    #[serde(default)]
    pub category_ids: Option<Vec<Uuid>>,
    /// Tag names, created on the fly. On update, `None` leaves the links untouched.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl PostInput {
    /// The slug to store: the provided one, or one derived from the title.
    pub fn effective_slug(&self) -> String {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&self.title))
    }

    /// Trimmed, non-empty, de-duplicated (case-insensitively) tag names, in input order.
    pub fn tag_names(&self) -> Option<Vec<String>> {
        self.tags.as_ref().map(|tags| normalize_tag_names(tags))
    }
}

pub fn normalize_tag_names(raw: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut names = Vec::new();
    for name in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let key = name.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            names.push(name.to_string());
        }
    }
    names
}

/// PostFilter
///
/// Query parameters of the back office post list. `status=trash` lists only
/// trashed posts; otherwise trashed posts are hidden unless `include_deleted`.
#[derive(Debug, Clone, Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    /// Category slug (public blog filter).
    pub category: Option<String>,
    pub limit: Option<i64>,
}

/// Resolved trash visibility of a `PostFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashScope {
    Exclude,
    Include,
    Only,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            status: Some(PostStatus::Published.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn trash_scope(&self) -> TrashScope {
        if self.status.as_deref() == Some("trash") {
            TrashScope::Only
        } else if self.include_deleted {
            TrashScope::Include
        } else {
            TrashScope::Exclude
        }
    }

    /// The concrete status to filter on, if any (`all` and `trash` are not statuses).
    pub fn status_filter(&self) -> Option<&str> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty() && *s != "all" && *s != "trash")
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// --- Taxonomy ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Category plus the number of posts linked to it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

impl CategoryInput {
    pub fn effective_slug(&self) -> String {
        effective_slug(self.slug.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TagInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl TagInput {
    pub fn effective_slug(&self) -> String {
        effective_slug(self.slug.as_deref(), &self.name)
    }
}

fn effective_slug(slug: Option<&str>, name: &str) -> String {
    slug.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slugify(name))
}

// --- Comments & likes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CommentStatus {
    Approved,
    Pending,
    Spam,
    Trash,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Approved => "approved",
            CommentStatus::Pending => "pending",
            CommentStatus::Spam => "spam",
            CommentStatus::Trash => "trash",
        }
    }
}

/// Comment
///
/// Comments are left anonymously (name + e-mail) and start out `pending`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    pub email: String,
    pub content: String,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub name: String,
    pub email: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PostRef {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// A comment with the post it belongs to (moderation queue).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentWithPost {
    pub comment: Comment,
    pub post: Option<PostRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateCommentStatusRequest {
    pub status: CommentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct LikeStatus {
    pub count: i64,
    pub has_liked: bool,
}

// --- Site settings ---

/// Settings row id. The table holds exactly one row.
pub const SETTINGS_ROW_ID: i32 = 1;

/// SiteSettings
///
/// The singleton `site_settings` row. `maintenance_mode` is what the request gate reads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct SiteSettings {
    pub id: i32,
    pub site_name: Option<String>,
    pub admin_email: Option<String>,
    pub site_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub instagram_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub youtube_url: Option<String>,
    pub github_url: Option<String>,
    pub maintenance_mode: bool,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SiteSettings {
    /// What the site runs with before anyone has saved the settings form.
    fn default() -> Self {
        Self {
            id: SETTINGS_ROW_ID,
            site_name: Some("BlogCMS".to_string()),
            admin_email: None,
            site_description: None,
            meta_title: None,
            meta_description: None,
            keywords: None,
            facebook_url: None,
            twitter_url: None,
            instagram_url: None,
            linkedin_url: None,
            youtube_url: None,
            github_url: None,
            maintenance_mode: false,
            updated_at: None,
        }
    }
}

/// SiteSettingsInput
///
/// Full replacement of the settings row (the form always submits every field).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SiteSettingsInput {
    pub site_name: Option<String>,
    pub admin_email: Option<String>,
    pub site_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub instagram_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub youtube_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub maintenance_mode: bool,
}

// --- Dashboard & analytics ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct RecentPost {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub view_count: i32,
}

/// DashboardStats
///
/// Counters for the back office landing page. Trashed posts are excluded everywhere.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub recent_posts: Vec<RecentPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct CategoryShare {
    pub name: String,
    /// Rounded percentage of all category links.
    pub share: i64,
    pub count: i64,
}

impl CategoryShare {
    /// category_shares
    ///
    /// Turns per-category link counts into rounded percentages, largest first.
    /// With no links at all every share is 0.
    pub fn from_counts(counts: Vec<(String, i64)>) -> Vec<CategoryShare> {
        let total: i64 = counts.iter().map(|(_, c)| *c).sum();
        let denominator = total.max(1) as f64;

        let mut shares: Vec<CategoryShare> = counts
            .into_iter()
            .map(|(name, count)| CategoryShare {
                name,
                share: ((count as f64 / denominator) * 100.0).round() as i64,
                count,
            })
            .collect();
        shares.sort_by(|a, b| b.share.cmp(&a.share).then_with(|| a.name.cmp(&b.name)));
        shares
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct TopContent {
    pub title: String,
    pub view_count: i32,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Analytics {
    pub categories_share: Vec<CategoryShare>,
    pub total_comments: i64,
    pub top_content: Vec<TopContent>,
}

// --- Media ---

/// Folders of the media bucket, in display order.
pub const MEDIA_FOLDERS: &[&str] = &["posts", "categories", "avatars"];

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MediaAsset {
    pub name: String,
    pub folder: String,
    pub url: String,
    pub size_bytes: i64,
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.png")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/png")]
    pub file_type: String,
    /// Target folder: `posts`, `categories` or `avatars`. Defaults to `posts`.
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key inside the bucket.
    pub resource_key: String,
    /// Where the object can be read once uploaded; store this on the post/category/profile.
    pub public_url: String,
}

// --- Auth payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NewPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InviteUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Self-service profile edit: only name and bio, never role or e-mail.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMyProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub professional_bio: Option<String>,
}

/// Admin edit of another user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub professional_bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AvatarRequest {
    pub avatar_url: String,
}

/// Where the client should navigate next.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RedirectResponse {
    pub redirect_to: String,
}

/// Human-readable notice shown above the login/register form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct AuthPageNotice {
    pub notice: Option<String>,
}

/// Generic `{ success, message }` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// --- Public pages ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HomePage {
    pub site_name: String,
    pub latest_posts: Vec<PostDetail>,
    pub categories: Vec<CategoryWithCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MaintenancePage {
    pub site_name: String,
    pub message: String,
}
