use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RECENT_POSTS_LIMIT, RepoResult, Repository, TOP_CONTENT_LIMIT};
use crate::{
    error::RepoError,
    gate::{ProfileStore, SettingsStore},
    models::{
        Analytics, AuthorSummary, Category, CategoryInput, CategoryRef, CategoryShare,
        CategoryWithCount, Comment, CommentStatus, CommentWithPost, CreateCommentRequest,
        DashboardStats, LikeStatus, NewProfile, Post, PostDetail, PostFilter, PostInput, PostRef,
        PostStatus, Profile, ProfileUpdate, RecentPost, SETTINGS_ROW_ID, SiteSettings,
        SiteSettingsInput, Tag, TagInput, TagWithCount, TopContent, TrashScope, UserSummary,
        slugify,
    },
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    // Insertion order is kept so ties in sort keys stay deterministic.
    posts: Vec<Post>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    post_categories: Vec<(Uuid, Uuid)>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    likes: HashSet<(Uuid, Uuid)>,
    settings: Option<SiteSettings>,
}

impl Tables {
    fn post_mut(&mut self, id: Uuid) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    fn detail(&self, post: &Post) -> PostDetail {
        let author = post
            .author_id
            .and_then(|id| self.profiles.get(&id))
            .map(|p| AuthorSummary {
                id: p.id,
                full_name: p.full_name.clone(),
                avatar_url: p.avatar_url.clone(),
            });

        let mut categories: Vec<CategoryRef> = self
            .post_categories
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .filter_map(|(_, category_id)| self.categories.iter().find(|c| c.id == *category_id))
            .map(|c| CategoryRef {
                id: c.id,
                name: c.name.clone(),
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tags: Vec<String> = self
            .post_tags
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .filter_map(|(_, tag_id)| self.tags.iter().find(|t| t.id == *tag_id))
            .map(|t| t.name.clone())
            .collect();
        tags.sort();

        PostDetail {
            post: post.clone(),
            author,
            categories,
            tags,
        }
    }

    fn ensure_unique_post_slug(&self, slug: &str, except: Option<Uuid>) -> RepoResult<()> {
        if self.posts.iter().any(|p| p.slug == slug && Some(p.id) != except) {
            return Err(RepoError::Conflict(format!("a post with slug '{}' already exists", slug)));
        }
        Ok(())
    }

    fn sync_categories(&mut self, post_id: Uuid, category_ids: &[Uuid]) {
        self.post_categories.retain(|(p, _)| *p != post_id);
        for category_id in category_ids {
            let known = self.categories.iter().any(|c| c.id == *category_id);
            let linked = self.post_categories.contains(&(post_id, *category_id));
            if known && !linked {
                self.post_categories.push((post_id, *category_id));
            }
        }
    }

    /// Tags are matched by name; unknown names are created on the fly.
    fn sync_tags(&mut self, post_id: Uuid, names: &[String]) {
        self.post_tags.retain(|(p, _)| *p != post_id);
        for name in names {
            let tag_id = match self.tags.iter_mut().find(|t| t.name == *name) {
                Some(tag) => {
                    tag.slug = slugify(name);
                    tag.id
                }
                None => {
                    let tag = Tag {
                        id: Uuid::new_v4(),
                        name: name.clone(),
                        slug: slugify(name),
                        created_at: Utc::now(),
                        updated_at: None,
                    };
                    let id = tag.id;
                    self.tags.push(tag);
                    id
                }
            };
            if !self.post_tags.contains(&(post_id, tag_id)) {
                self.post_tags.push((post_id, tag_id));
            }
        }
    }

    fn category_conflict(&self, name: &str, slug: &str, except: Option<Uuid>) -> bool {
        self.categories
            .iter()
            .any(|c| Some(c.id) != except && (c.name == name || c.slug == slug))
    }

    fn tag_conflict(&self, name: &str, slug: &str, except: Option<Uuid>) -> bool {
        self.tags
            .iter()
            .any(|t| Some(t.id) != except && (t.name == name || t.slug == slug))
    }

    fn like_status(&self, post_id: Uuid, user_id: Option<Uuid>) -> LikeStatus {
        LikeStatus {
            count: self.likes.iter().filter(|(p, _)| *p == post_id).count() as i64,
            has_liked: user_id.is_some_and(|u| self.likes.contains(&(post_id, u))),
        }
    }
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in memory. Used by the integration tests and
/// handy for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a profile with the given role string, stored verbatim.
    pub async fn seed_profile(&self, id: Uuid, full_name: &str, role: &str) -> Profile {
        let profile = Profile {
            id,
            email: Some(format!("{}@example.com", id.simple())),
            full_name: Some(full_name.to_string()),
            role: Some(role.to_string()),
            created_at: Utc::now(),
            ..Profile::default()
        };
        self.tables.write().await.profiles.insert(id, profile.clone());
        profile
    }

    /// Seeds the settings row with only the maintenance flag changed.
    pub async fn seed_maintenance_mode(&self, on: bool) {
        let mut tables = self.tables.write().await;
        let settings = tables.settings.get_or_insert_with(SiteSettings::default);
        settings.maintenance_mode = on;
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_profile(&self, id: Uuid) -> RepoResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn upsert_profile(&self, new: NewProfile) -> RepoResult<Profile> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let profile = tables.profiles.entry(new.id).or_insert_with(|| Profile {
            id: new.id,
            created_at: now,
            ..Profile::default()
        });
        if new.email.is_some() {
            profile.email = new.email;
        }
        if new.full_name.is_some() {
            profile.full_name = new.full_name;
        }
        profile.role = Some(new.role.as_str().to_string());
        profile.updated_at = Some(now);
        Ok(profile.clone())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Profile>> {
        let mut tables = self.tables.write().await;
        let Some(profile) = tables.profiles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = update.full_name {
            profile.full_name = Some(v);
        }
        if let Some(v) = update.email {
            profile.email = Some(v);
        }
        if let Some(v) = update.role {
            profile.role = Some(v);
        }
        if let Some(v) = update.professional_bio {
            profile.professional_bio = Some(v);
        }
        if let Some(v) = update.avatar_url {
            profile.avatar_url = Some(v);
        }
        profile.updated_at = Some(Utc::now());
        Ok(Some(profile.clone()))
    }

    async fn delete_profile(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.tables.write().await.profiles.remove(&id).is_some())
    }

    async fn list_users(&self) -> RepoResult<Vec<UserSummary>> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<&Profile> = tables.profiles.values().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(profiles
            .into_iter()
            .map(|p| {
                let posts = tables.posts.iter().filter(|post| post.author_id == Some(p.id)).count();
                UserSummary::from_profile(p.clone(), posts as i64)
            })
            .collect())
    }

    async fn list_posts(&self, filter: &PostFilter) -> RepoResult<Vec<PostDetail>> {
        let tables = self.tables.read().await;
        let scope = filter.trash_scope();
        let status = filter.status_filter();
        let search = filter.search_term().map(str::to_lowercase);
        let category_id = filter
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|slug| tables.categories.iter().find(|c| c.slug == slug).map(|c| c.id));

        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| match scope {
                TrashScope::Exclude => !p.is_trashed(),
                TrashScope::Only => p.is_trashed(),
                TrashScope::Include => true,
            })
            .filter(|p| status.is_none_or(|s| p.status == s))
            .filter(|p| {
                search
                    .as_deref()
                    .is_none_or(|s| p.title.to_lowercase().contains(s))
            })
            .filter(|p| match category_id {
                None => true,
                // Unknown category slug: nothing matches.
                Some(None) => false,
                Some(Some(id)) => tables.post_categories.contains(&(p.id, id)),
            })
            .collect();

        posts.sort_by(|a, b| {
            b.published_at
                .unwrap_or(b.created_at)
                .cmp(&a.published_at.unwrap_or(a.created_at))
        });
        if let Some(limit) = filter.limit {
            posts.truncate(limit.max(0) as usize);
        }

        Ok(posts.into_iter().map(|p| tables.detail(p)).collect())
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).map(|p| tables.detail(p)))
    }

    async fn get_published_post_by_slug(&self, slug: &str) -> RepoResult<Option<PostDetail>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.slug == slug && p.is_live())
            .map(|p| tables.detail(p)))
    }

    async fn create_post(&self, input: PostInput, author_id: Uuid) -> RepoResult<PostDetail> {
        let mut tables = self.tables.write().await;
        let slug = input.effective_slug();
        tables.ensure_unique_post_slug(&slug, None)?;

        let now = Utc::now();
        let published_at = match (input.published_at, input.status) {
            (Some(date), _) => Some(date),
            (None, PostStatus::Published) => Some(now),
            (None, PostStatus::Draft) => None,
        };
        let post = Post {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            slug,
            content: input.content.clone(),
            excerpt: input.excerpt.clone(),
            status: input.status.as_str().to_string(),
            author_id: Some(input.author_id.unwrap_or(author_id)),
            featured_image_url: input.featured_image_url.clone(),
            gallery_image_url: input.gallery_image_url.clone(),
            allow_comments: input.allow_comments,
            view_count: 0,
            published_at,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let id = post.id;
        tables.posts.push(post);

        if let Some(category_ids) = &input.category_ids {
            tables.sync_categories(id, category_ids);
        }
        if let Some(tags) = input.tag_names() {
            tables.sync_tags(id, &tags);
        }

        let post = tables.posts.iter().find(|p| p.id == id).cloned().unwrap_or_default();
        Ok(tables.detail(&post))
    }

    async fn update_post(&self, id: Uuid, input: PostInput) -> RepoResult<Option<PostDetail>> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        let slug = input.effective_slug();
        tables.ensure_unique_post_slug(&slug, Some(id))?;

        let now = Utc::now();
        if let Some(post) = tables.post_mut(id) {
            post.title = input.title.clone();
            post.slug = slug;
            post.content = input.content.clone();
            post.excerpt = input.excerpt.clone();
            post.status = input.status.as_str().to_string();
            if let Some(author_id) = input.author_id {
                post.author_id = Some(author_id);
            }
            post.featured_image_url = input.featured_image_url.clone();
            post.gallery_image_url = input.gallery_image_url.clone();
            post.allow_comments = input.allow_comments;
            post.published_at = match (input.published_at, input.status) {
                (Some(date), _) => Some(date),
                (None, PostStatus::Published) => Some(post.published_at.unwrap_or(now)),
                (None, PostStatus::Draft) => post.published_at,
            };
            post.updated_at = now;
        }

        if let Some(category_ids) = &input.category_ids {
            tables.sync_categories(id, category_ids);
        }
        if let Some(tags) = input.tag_names() {
            tables.sync_tags(id, &tags);
        }

        Ok(tables.posts.iter().find(|p| p.id == id).map(|p| tables.detail(p)))
    }

    async fn trash_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.post_mut(id) {
            Some(post) => {
                let now = Utc::now();
                post.deleted_at = Some(now);
                post.status = PostStatus::Draft.as_str().to_string();
                post.updated_at = now;
                true
            }
            None => false,
        })
    }

    async fn restore_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.post_mut(id) {
            Some(post) => {
                post.deleted_at = None;
                post.status = PostStatus::Draft.as_str().to_string();
                post.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Ok(false);
        }
        tables.post_categories.retain(|(p, _)| *p != id);
        tables.post_tags.retain(|(p, _)| *p != id);
        tables.likes.retain(|(p, _)| *p != id);
        tables.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>> {
        let mut tables = self.tables.write().await;
        Ok(tables.post_mut(id).filter(|p| p.is_live()).map(|post| {
            post.view_count += 1;
            post.view_count
        }))
    }

    async fn list_categories(&self) -> RepoResult<Vec<CategoryWithCount>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<CategoryWithCount> = tables
            .categories
            .iter()
            .map(|c| CategoryWithCount {
                id: c.id,
                name: c.name.clone(),
                slug: c.slug.clone(),
                description: c.description.clone(),
                icon_url: c.icon_url.clone(),
                post_count: tables.post_categories.iter().filter(|(_, cid)| *cid == c.id).count()
                    as i64,
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        Ok(self.tables.read().await.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category> {
        let mut tables = self.tables.write().await;
        let name = input.name.trim().to_string();
        let slug = input.effective_slug();
        if tables.category_conflict(&name, &slug, None) {
            return Err(RepoError::Conflict(format!("category '{}' already exists", name)));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name,
            slug,
            description: input.description,
            icon_url: input.icon_url,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, input: CategoryInput) -> RepoResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        let name = input.name.trim().to_string();
        let slug = input.effective_slug();
        if tables.category_conflict(&name, &slug, Some(id)) {
            return Err(RepoError::Conflict(format!("category '{}' already exists", name)));
        }
        Ok(tables.categories.iter_mut().find(|c| c.id == id).map(|category| {
            category.name = name;
            category.slug = slug;
            category.description = input.description;
            if input.icon_url.is_some() {
                category.icon_url = input.icon_url;
            }
            category.updated_at = Some(Utc::now());
            category.clone()
        }))
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        tables.post_categories.retain(|(_, c)| *c != id);
        Ok(tables.categories.len() < before)
    }

    async fn list_tags(&self) -> RepoResult<Vec<TagWithCount>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<TagWithCount> = tables
            .tags
            .iter()
            .map(|t| TagWithCount {
                id: t.id,
                name: t.name.clone(),
                slug: t.slug.clone(),
                post_count: tables.post_tags.iter().filter(|(_, tid)| *tid == t.id).count() as i64,
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>> {
        Ok(self.tables.read().await.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn create_tag(&self, input: TagInput) -> RepoResult<Tag> {
        let mut tables = self.tables.write().await;
        let name = input.name.trim().to_string();
        let slug = input.effective_slug();
        if tables.tag_conflict(&name, &slug, None) {
            return Err(RepoError::Conflict(format!("tag '{}' already exists", name)));
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            slug,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: Uuid, input: TagInput) -> RepoResult<Option<Tag>> {
        let mut tables = self.tables.write().await;
        let name = input.name.trim().to_string();
        let slug = input.effective_slug();
        if tables.tag_conflict(&name, &slug, Some(id)) {
            return Err(RepoError::Conflict(format!("tag '{}' already exists", name)));
        }
        Ok(tables.tags.iter_mut().find(|t| t.id == id).map(|tag| {
            tag.name = name;
            tag.slug = slug;
            tag.updated_at = Some(Utc::now());
            tag.clone()
        }))
    }

    async fn delete_tag(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.tags.len();
        tables.tags.retain(|t| t.id != id);
        tables.post_tags.retain(|(_, t)| *t != id);
        Ok(tables.tags.len() < before)
    }

    async fn list_approved_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.status == CommentStatus::Approved.as_str())
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn list_comments(&self, status: Option<CommentStatus>) -> RepoResult<Vec<CommentWithPost>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentWithPost> = tables
            .comments
            .iter()
            .filter(|c| status.is_none_or(|s| c.status == s.as_str()))
            .map(|c| CommentWithPost {
                comment: c.clone(),
                post: tables.posts.iter().find(|p| p.id == c.post_id).map(|p| PostRef {
                    id: p.id,
                    title: p.title.clone(),
                    slug: p.slug.clone(),
                }),
            })
            .collect();
        comments.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
        Ok(comments)
    }

    async fn create_comment(&self, post_id: Uuid, req: CreateCommentRequest) -> RepoResult<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            content: req.content.trim().to_string(),
            status: CommentStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn set_comment_status(&self, id: Uuid, status: CommentStatus) -> RepoResult<Option<Comment>> {
        let mut tables = self.tables.write().await;
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|comment| {
            comment.status = status.as_str().to_string();
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }

    async fn like_status(&self, post_id: Uuid, user_id: Option<Uuid>) -> RepoResult<LikeStatus> {
        Ok(self.tables.read().await.like_status(post_id, user_id))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<LikeStatus> {
        let mut tables = self.tables.write().await;
        if !tables.likes.remove(&(post_id, user_id)) {
            tables.likes.insert((post_id, user_id));
        }
        Ok(tables.like_status(post_id, Some(user_id)))
    }

    async fn get_settings(&self) -> RepoResult<Option<SiteSettings>> {
        Ok(self.tables.read().await.settings.clone())
    }

    async fn save_settings(&self, input: SiteSettingsInput) -> RepoResult<SiteSettings> {
        let settings = SiteSettings {
            id: SETTINGS_ROW_ID,
            site_name: input.site_name,
            admin_email: input.admin_email,
            site_description: input.site_description,
            meta_title: input.meta_title,
            meta_description: input.meta_description,
            keywords: input.keywords,
            facebook_url: input.facebook_url,
            twitter_url: input.twitter_url,
            instagram_url: input.instagram_url,
            linkedin_url: input.linkedin_url,
            youtube_url: input.youtube_url,
            github_url: input.github_url,
            maintenance_mode: input.maintenance_mode,
            updated_at: Some(Utc::now()),
        };
        self.tables.write().await.settings = Some(settings.clone());
        Ok(settings)
    }

    async fn dashboard_stats(&self) -> RepoResult<DashboardStats> {
        let tables = self.tables.read().await;
        let live: Vec<&Post> = tables.posts.iter().filter(|p| !p.is_trashed()).collect();

        let mut recent: Vec<&Post> = live.clone();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent_posts = recent
            .into_iter()
            .take(RECENT_POSTS_LIMIT)
            .map(|p| RecentPost {
                id: p.id,
                title: p.title.clone(),
                status: p.status.clone(),
                created_at: p.created_at,
                view_count: p.view_count,
            })
            .collect();

        Ok(DashboardStats {
            total_posts: live.len() as i64,
            published_posts: live.iter().filter(|p| p.is_published()).count() as i64,
            draft_posts: live
                .iter()
                .filter(|p| p.status == PostStatus::Draft.as_str())
                .count() as i64,
            total_views: live.iter().map(|p| p.view_count as i64).sum(),
            recent_posts,
        })
    }

    async fn analytics(&self) -> RepoResult<Analytics> {
        let tables = self.tables.read().await;

        let counts = tables
            .categories
            .iter()
            .map(|c| {
                let n = tables.post_categories.iter().filter(|(_, cid)| *cid == c.id).count();
                (c.name.clone(), n as i64)
            })
            .collect();

        let mut top: Vec<&Post> = tables.posts.iter().filter(|p| p.is_live()).collect();
        top.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        let top_content = top
            .into_iter()
            .take(TOP_CONTENT_LIMIT)
            .map(|p| TopContent {
                title: p.title.clone(),
                view_count: p.view_count,
                category: tables.detail(p).categories.into_iter().next().map(|c| c.name),
            })
            .collect();

        Ok(Analytics {
            categories_share: CategoryShare::from_counts(counts),
            total_comments: tables.comments.len() as i64,
            top_content,
        })
    }
}

#[async_trait]
impl ProfileStore for InMemoryRepository {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<String>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .get(&user_id)
            .and_then(|p| p.role.clone()))
    }
}

#[async_trait]
impl SettingsStore for InMemoryRepository {
    async fn maintenance_mode(&self) -> Result<Option<bool>, RepoError> {
        Ok(self.tables.read().await.settings.as_ref().map(|s| s.maintenance_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn post_input(title: &str, status: PostStatus) -> PostInput {
        PostInput {
            title: title.to_string(),
            status,
            allow_comments: true,
            ..PostInput::default()
        }
    }

    #[tokio::test]
    async fn create_post_upserts_tags_by_name_and_dedupes() {
        let repo = InMemoryRepository::new();
        let author = Uuid::new_v4();
        let mut input = post_input("Hello World", PostStatus::Draft);
        input.tags = Some(vec!["Rust Lang".into(), " rust lang ".into(), "Web".into()]);

        let detail = repo.create_post(input, author).await.unwrap();

        assert_eq!(detail.post.slug, "hello-world");
        assert_eq!(detail.post.author_id, Some(author));
        assert_eq!(detail.tags, vec!["Rust Lang".to_string(), "Web".to_string()]);
        let tags = repo.list_tags().await.unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().any(|t| t.slug == "rust-lang" && t.post_count == 1));
    }

    #[tokio::test]
    async fn update_without_links_keeps_existing_links() {
        let repo = InMemoryRepository::new();
        let category = repo
            .create_category(CategoryInput {
                name: "News".into(),
                ..CategoryInput::default()
            })
            .await
            .unwrap();
        let mut input = post_input("Linked", PostStatus::Draft);
        input.category_ids = Some(vec![category.id]);
        input.tags = Some(vec!["a".into()]);
        let created = repo.create_post(input, Uuid::new_v4()).await.unwrap();

        let updated = repo
            .update_post(created.post.id, post_input("Linked", PostStatus::Draft))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.categories.len(), 1);
        assert_eq!(updated.tags, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn publishing_keeps_the_first_publication_date() {
        let repo = InMemoryRepository::new();
        let created = repo
            .create_post(post_input("Dated", PostStatus::Published), Uuid::new_v4())
            .await
            .unwrap();
        let first = created.post.published_at.expect("published_at stamped");

        let updated = repo
            .update_post(created.post.id, post_input("Dated", PostStatus::Published))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.post.published_at, Some(first));
    }

    #[tokio::test]
    async fn duplicate_post_slug_is_a_conflict() {
        let repo = InMemoryRepository::new();
        repo.create_post(post_input("Same", PostStatus::Draft), Uuid::new_v4())
            .await
            .unwrap();
        let err = repo
            .create_post(post_input("Same", PostStatus::Draft), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));
    }

    #[tokio::test]
    async fn stores_report_role_and_maintenance_flag() {
        let repo = InMemoryRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(repo.role_of(id).await.unwrap(), None);
        assert_eq!(repo.maintenance_mode().await.unwrap(), None);

        repo.seed_profile(id, "Ada", "Super Admin").await;
        repo.seed_maintenance_mode(true).await;

        assert_eq!(Role::parse(&repo.role_of(id).await.unwrap().unwrap()), Role::SuperAdmin);
        assert_eq!(repo.maintenance_mode().await.unwrap(), Some(true));
    }
}
