use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::collections::HashMap;
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

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, status, author_id, \
    featured_image_url, gallery_image_url, allow_comments, view_count, published_at, \
    deleted_at, created_at, updated_at";

const PROFILE_COLUMNS: &str =
    "id, email, full_name, avatar_url, professional_bio, role, created_at, updated_at";

const SETTINGS_COLUMNS: &str = "id, site_name, admin_email, site_description, meta_title, \
    meta_description, keywords, facebook_url, twitter_url, instagram_url, linkedin_url, \
    youtube_url, github_url, maintenance_mode, updated_at";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database. Queries are
/// parameterised and checked at runtime; the schema belongs to Supabase.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// load_details
    ///
    /// Resolves authors, categories and tags for a page of posts with one
    /// query per relation, preserving the order of `posts`.
    async fn load_details(&self, posts: Vec<Post>) -> RepoResult<Vec<PostDetail>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }
        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let author_ids: Vec<Uuid> = posts.iter().filter_map(|p| p.author_id).collect();

        let authors: HashMap<Uuid, AuthorSummary> = sqlx::query_as::<_, AuthorSummary>(
            "SELECT id, full_name, avatar_url FROM profiles WHERE id = ANY($1)",
        )
        .bind(&author_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

        let category_rows: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"SELECT pc.post_id, c.id, c.name
               FROM post_categories pc
               JOIN categories c ON c.id = pc.category_id
               WHERE pc.post_id = ANY($1)
               ORDER BY c.name"#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        let tag_rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"SELECT pt.post_id, t.name
               FROM post_tags pt
               JOIN tags t ON t.id = pt.tag_id
               WHERE pt.post_id = ANY($1)
               ORDER BY t.name"#,
        )
        .bind(&post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        let mut categories: HashMap<Uuid, Vec<CategoryRef>> = HashMap::new();
        for (post_id, id, name) in category_rows {
            categories.entry(post_id).or_default().push(CategoryRef { id, name });
        }
        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (post_id, name) in tag_rows {
            tags.entry(post_id).or_default().push(name);
        }

        Ok(posts
            .into_iter()
            .map(|post| PostDetail {
                author: post.author_id.and_then(|id| authors.get(&id).cloned()),
                categories: categories.remove(&post.id).unwrap_or_default(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }

    async fn load_detail(&self, post: Option<Post>) -> RepoResult<Option<PostDetail>> {
        match post {
            Some(post) => Ok(self.load_details(vec![post]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn fetch_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)
    }

    /// Replaces the category links of `post_id`.
    async fn sync_categories(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        category_ids: &[Uuid],
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(RepoError::from_sqlx)?;

        if !category_ids.is_empty() {
            sqlx::query(
                r#"INSERT INTO post_categories (post_id, category_id)
                   SELECT $1, UNNEST($2::uuid[])
                   ON CONFLICT DO NOTHING"#,
            )
            .bind(post_id)
            .bind(category_ids)
            .execute(&mut **tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        }
        Ok(())
    }

    /// Upserts each tag by name and replaces the tag links of `post_id`.
    async fn sync_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: Uuid,
        names: &[String],
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(RepoError::from_sqlx)?;

        for name in names {
            let (tag_id,): (Uuid,) = sqlx::query_as(
                r#"INSERT INTO tags (id, name, slug, created_at)
                   VALUES ($1, $2, $3, NOW())
                   ON CONFLICT (name) DO UPDATE SET slug = EXCLUDED.slug
                   RETURNING id"#,
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(slugify(name))
            .fetch_one(&mut **tx)
            .await
            .map_err(RepoError::from_sqlx)?;

            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        }
        Ok(())
    }

    async fn count(&self, sql: &str) -> RepoResult<i64> {
        let (n,): (i64,) = sqlx::query_as(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;
        Ok(n)
    }
}

#[derive(FromRow)]
struct ProfileWithPostCount {
    #[sqlx(flatten)]
    profile: Profile,
    posts_count: i64,
}

#[derive(FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    post_title: Option<String>,
    post_slug: Option<String>,
}

impl From<CommentRow> for CommentWithPost {
    fn from(row: CommentRow) -> Self {
        let post = match (row.post_title, row.post_slug) {
            (Some(title), Some(slug)) => Some(PostRef {
                id: row.comment.post_id,
                title,
                slug,
            }),
            _ => None,
        };
        CommentWithPost {
            comment: row.comment,
            post,
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> RepoResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    /// upsert_profile
    ///
    /// Supabase may already have created the row through its signup trigger,
    /// so this fills in the blanks instead of failing on the primary key.
    async fn upsert_profile(&self, profile: NewProfile) -> RepoResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"INSERT INTO profiles (id, email, full_name, role, created_at, updated_at)
               VALUES ($1, $2, $3, $4, NOW(), NOW())
               ON CONFLICT (id) DO UPDATE SET
                   email = COALESCE(EXCLUDED.email, profiles.email),
                   full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                   role = EXCLUDED.role,
                   updated_at = NOW()
               RETURNING {}"#,
            PROFILE_COLUMNS
        ))
        .bind(profile.id)
        .bind(profile.email)
        .bind(profile.full_name)
        .bind(profile.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> RepoResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            r#"UPDATE profiles SET
                   full_name = COALESCE($2, full_name),
                   email = COALESCE($3, email),
                   role = COALESCE($4, role),
                   professional_bio = COALESCE($5, professional_bio),
                   avatar_url = COALESCE($6, avatar_url),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(update.full_name)
        .bind(update.email)
        .bind(update.role)
        .bind(update.professional_bio)
        .bind(update.avatar_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn delete_profile(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> RepoResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, ProfileWithPostCount>(
            r#"SELECT p.id, p.email, p.full_name, p.avatar_url, p.professional_bio, p.role,
                      p.created_at, p.updated_at,
                      (SELECT COUNT(*) FROM posts WHERE author_id = p.id) AS posts_count
               FROM profiles p
               ORDER BY p.created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| UserSummary::from_profile(row.profile, row.posts_count))
            .collect())
    }

    /// list_posts
    ///
    /// Builds the filter with `QueryBuilder` so every user-supplied value is bound.
    async fn list_posts(&self, filter: &PostFilter) -> RepoResult<Vec<PostDetail>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM posts WHERE TRUE", POST_COLUMNS));

        match filter.trash_scope() {
            TrashScope::Exclude => {
                builder.push(" AND deleted_at IS NULL");
            }
            TrashScope::Only => {
                builder.push(" AND deleted_at IS NOT NULL");
            }
            TrashScope::Include => {}
        }

        if let Some(status) = filter.status_filter() {
            builder.push(" AND status = ");
            builder.push_bind(status.to_string());
        }

        if let Some(search) = filter.search_term() {
            builder.push(" AND title ILIKE ");
            builder.push_bind(format!("%{}%", search));
        }

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(
                " AND id IN (SELECT pc.post_id FROM post_categories pc \
                 JOIN categories c ON c.id = pc.category_id WHERE c.slug = ",
            );
            builder.push_bind(category.to_string());
            builder.push(")");
        }

        builder.push(" ORDER BY COALESCE(published_at, created_at) DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit.max(0));
        }

        let posts = builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;

        self.load_details(posts).await
    }

    async fn get_post(&self, id: Uuid) -> RepoResult<Option<PostDetail>> {
        let post = self.fetch_post(id).await?;
        self.load_detail(post).await
    }

    async fn get_published_post_by_slug(&self, slug: &str) -> RepoResult<Option<PostDetail>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {} FROM posts WHERE slug = $1 AND status = 'published' AND deleted_at IS NULL",
            POST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        self.load_detail(post).await
    }

    /// create_post
    ///
    /// Post row, category links and tag upserts are written in one transaction:
    /// either the post exists with all its links or not at all.
    async fn create_post(&self, input: PostInput, author_id: Uuid) -> RepoResult<PostDetail> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;

        let published_at = match (input.published_at, input.status) {
            (Some(date), _) => Some(date),
            (None, PostStatus::Published) => Some(Utc::now()),
            (None, PostStatus::Draft) => None,
        };

        let (post_id,): (Uuid,) = sqlx::query_as(
            r#"INSERT INTO posts (id, title, slug, content, excerpt, status, author_id,
                                  featured_image_url, gallery_image_url, allow_comments,
                                  view_count, published_at, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, NOW(), NOW())
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(input.effective_slug())
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(input.status.as_str())
        .bind(input.author_id.unwrap_or(author_id))
        .bind(&input.featured_image_url)
        .bind(&input.gallery_image_url)
        .bind(input.allow_comments)
        .bind(published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        if let Some(category_ids) = &input.category_ids {
            Self::sync_categories(&mut tx, post_id, category_ids).await?;
        }
        if let Some(tags) = input.tag_names() {
            Self::sync_tags(&mut tx, post_id, &tags).await?;
        }

        tx.commit().await.map_err(RepoError::from_sqlx)?;

        self.get_post(post_id)
            .await?
            .ok_or_else(|| RepoError::Unavailable("post vanished after insert".to_string()))
    }

    /// update_post
    ///
    /// An explicit `published_at` wins; otherwise publishing keeps the first
    /// publication date, stamping now only if there is none yet.
    async fn update_post(&self, id: Uuid, input: PostInput) -> RepoResult<Option<PostDetail>> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;

        let updated: Option<(Uuid,)> = sqlx::query_as(
            r#"UPDATE posts SET
                   title = $2,
                   slug = $3,
                   content = $4,
                   excerpt = $5,
                   status = $6,
                   author_id = COALESCE($7, author_id),
                   featured_image_url = $8,
                   gallery_image_url = $9,
                   allow_comments = $10,
                   published_at = CASE
                       WHEN $11::timestamptz IS NOT NULL THEN $11::timestamptz
                       WHEN $6 = 'published' THEN COALESCE(published_at, NOW())
                       ELSE published_at
                   END,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id"#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(input.effective_slug())
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(input.status.as_str())
        .bind(input.author_id)
        .bind(&input.featured_image_url)
        .bind(&input.gallery_image_url)
        .bind(input.allow_comments)
        .bind(input.published_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepoError::from_sqlx)?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(category_ids) = &input.category_ids {
            Self::sync_categories(&mut tx, id, category_ids).await?;
        }
        if let Some(tags) = input.tag_names() {
            Self::sync_tags(&mut tx, id, &tags).await?;
        }

        tx.commit().await.map_err(RepoError::from_sqlx)?;
        self.get_post(id).await
    }

    async fn trash_post(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = NOW(), status = 'draft', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_post(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = NULL, status = 'draft', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;

        for sql in [
            "DELETE FROM post_categories WHERE post_id = $1",
            "DELETE FROM post_tags WHERE post_id = $1",
            "DELETE FROM post_likes WHERE post_id = $1",
            "DELETE FROM comments WHERE post_id = $1",
        ] {
            sqlx::query(sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(RepoError::from_sqlx)?;
        }

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;

        tx.commit().await.map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepoResult<Option<i32>> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"UPDATE posts SET view_count = view_count + 1
               WHERE id = $1 AND status = 'published' AND deleted_at IS NULL
               RETURNING view_count"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;
        Ok(row.map(|(count,)| count))
    }

    async fn list_categories(&self) -> RepoResult<Vec<CategoryWithCount>> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"SELECT c.id, c.name, c.slug, c.description, c.icon_url,
                      COUNT(pc.post_id) AS post_count
               FROM categories c
               LEFT JOIN post_categories pc ON pc.category_id = c.id
               GROUP BY c.id
               ORDER BY c.name"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn get_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, icon_url, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn create_category(&self, input: CategoryInput) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (id, name, slug, description, icon_url, created_at)
               VALUES ($1, $2, $3, $4, $5, NOW())
               RETURNING id, name, slug, description, icon_url, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(input.effective_slug())
        .bind(&input.description)
        .bind(&input.icon_url)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn update_category(&self, id: Uuid, input: CategoryInput) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET
                   name = $2, slug = $3, description = $4,
                   icon_url = COALESCE($5, icon_url), updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, slug, description, icon_url, created_at, updated_at"#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.effective_slug())
        .bind(&input.description)
        .bind(&input.icon_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn delete_category(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;
        sqlx::query("DELETE FROM post_categories WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        tx.commit().await.map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tags(&self) -> RepoResult<Vec<TagWithCount>> {
        sqlx::query_as::<_, TagWithCount>(
            r#"SELECT t.id, t.name, t.slug, COUNT(pt.post_id) AS post_count
               FROM tags t
               LEFT JOIN post_tags pt ON pt.tag_id = t.id
               GROUP BY t.id
               ORDER BY t.name"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug, created_at, updated_at FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)
    }

    async fn create_tag(&self, input: TagInput) -> RepoResult<Tag> {
        sqlx::query_as::<_, Tag>(
            r#"INSERT INTO tags (id, name, slug, created_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING id, name, slug, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(input.effective_slug())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn update_tag(&self, id: Uuid, input: TagInput) -> RepoResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>(
            r#"UPDATE tags SET name = $2, slug = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, slug, created_at, updated_at"#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.effective_slug())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn delete_tag(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;
        sqlx::query("DELETE FROM post_tags WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        tx.commit().await.map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_approved_comments(&self, post_id: Uuid) -> RepoResult<Vec<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"SELECT id, post_id, name, email, content, status, created_at
               FROM comments
               WHERE post_id = $1 AND status = 'approved'
               ORDER BY created_at ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn list_comments(&self, status: Option<CommentStatus>) -> RepoResult<Vec<CommentWithPost>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT c.id, c.post_id, c.name, c.email, c.content, c.status, c.created_at,
                      p.title AS post_title, p.slug AS post_slug
               FROM comments c
               LEFT JOIN posts p ON p.id = c.post_id"#,
        );
        if let Some(status) = status {
            builder.push(" WHERE c.status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY c.created_at DESC");

        let rows = builder
            .build_query_as::<CommentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;
        Ok(rows.into_iter().map(CommentWithPost::from).collect())
    }

    async fn create_comment(&self, post_id: Uuid, req: CreateCommentRequest) -> RepoResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (id, post_id, name, email, content, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, NOW())
               RETURNING id, post_id, name, email, content, status, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(req.name.trim())
        .bind(req.email.trim())
        .bind(req.content.trim())
        .bind(CommentStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn set_comment_status(&self, id: Uuid, status: CommentStatus) -> RepoResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"UPDATE comments SET status = $2 WHERE id = $1
               RETURNING id, post_id, name, email, content, status, created_at"#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn delete_comment(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn like_status(&self, post_id: Uuid, user_id: Option<Uuid>) -> RepoResult<LikeStatus> {
        let (count, has_liked): (i64, bool) = sqlx::query_as(
            r#"SELECT COUNT(*),
                      COALESCE(BOOL_OR(user_id = $2), FALSE)
               FROM post_likes
               WHERE post_id = $1"#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;
        Ok(LikeStatus { count, has_liked })
    }

    /// toggle_like
    ///
    /// Delete-then-insert in one transaction: if no row was removed the user
    /// had not liked the post yet, so the like is added.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> RepoResult<LikeStatus> {
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::from_sqlx)?;
        }

        tx.commit().await.map_err(RepoError::from_sqlx)?;
        self.like_status(post_id, Some(user_id)).await
    }

    async fn get_settings(&self) -> RepoResult<Option<SiteSettings>> {
        sqlx::query_as::<_, SiteSettings>(&format!(
            "SELECT {} FROM site_settings WHERE id = $1",
            SETTINGS_COLUMNS
        ))
        .bind(SETTINGS_ROW_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn save_settings(&self, input: SiteSettingsInput) -> RepoResult<SiteSettings> {
        sqlx::query_as::<_, SiteSettings>(&format!(
            r#"INSERT INTO site_settings (id, site_name, admin_email, site_description, meta_title,
                   meta_description, keywords, facebook_url, twitter_url, instagram_url,
                   linkedin_url, youtube_url, github_url, maintenance_mode, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
               ON CONFLICT (id) DO UPDATE SET
                   site_name = EXCLUDED.site_name,
                   admin_email = EXCLUDED.admin_email,
                   site_description = EXCLUDED.site_description,
                   meta_title = EXCLUDED.meta_title,
                   meta_description = EXCLUDED.meta_description,
                   keywords = EXCLUDED.keywords,
                   facebook_url = EXCLUDED.facebook_url,
                   twitter_url = EXCLUDED.twitter_url,
                   instagram_url = EXCLUDED.instagram_url,
                   linkedin_url = EXCLUDED.linkedin_url,
                   youtube_url = EXCLUDED.youtube_url,
                   github_url = EXCLUDED.github_url,
                   maintenance_mode = EXCLUDED.maintenance_mode,
                   updated_at = NOW()
               RETURNING {}"#,
            SETTINGS_COLUMNS
        ))
        .bind(SETTINGS_ROW_ID)
        .bind(input.site_name)
        .bind(input.admin_email)
        .bind(input.site_description)
        .bind(input.meta_title)
        .bind(input.meta_description)
        .bind(input.keywords)
        .bind(input.facebook_url)
        .bind(input.twitter_url)
        .bind(input.instagram_url)
        .bind(input.linkedin_url)
        .bind(input.youtube_url)
        .bind(input.github_url)
        .bind(input.maintenance_mode)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)
    }

    async fn dashboard_stats(&self) -> RepoResult<DashboardStats> {
        let total_posts = self
            .count("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL")
            .await?;
        let published_posts = self
            .count("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL AND status = 'published'")
            .await?;
        let draft_posts = self
            .count("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL AND status = 'draft'")
            .await?;
        let total_views = self
            .count("SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM posts WHERE deleted_at IS NULL")
            .await?;

        let recent_posts = sqlx::query_as::<_, RecentPost>(
            r#"SELECT id, title, status, created_at, view_count
               FROM posts
               WHERE deleted_at IS NULL
               ORDER BY created_at DESC
               LIMIT $1"#,
        )
        .bind(RECENT_POSTS_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts,
            total_views,
            recent_posts,
        })
    }

    async fn analytics(&self) -> RepoResult<Analytics> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT c.name, COUNT(pc.post_id)
               FROM categories c
               LEFT JOIN post_categories pc ON pc.category_id = c.id
               GROUP BY c.id, c.name"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        let total_comments = self.count("SELECT COUNT(*) FROM comments").await?;

        let top_content = sqlx::query_as::<_, TopContent>(
            r#"SELECT p.title, p.view_count,
                      (SELECT c.name FROM post_categories pc
                       JOIN categories c ON c.id = pc.category_id
                       WHERE pc.post_id = p.id
                       ORDER BY c.name LIMIT 1) AS category
               FROM posts p
               WHERE p.status = 'published' AND p.deleted_at IS NULL
               ORDER BY p.view_count DESC
               LIMIT $1"#,
        )
        .bind(TOP_CONTENT_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(Analytics {
            categories_share: CategoryShare::from_counts(counts),
            total_comments,
            top_content,
        })
    }
}

#[async_trait]
impl ProfileStore for PostgresRepository {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<String>, RepoError> {
        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT role FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::from_sqlx)?;
        Ok(row.and_then(|(role,)| role))
    }
}

#[async_trait]
impl SettingsStore for PostgresRepository {
    async fn maintenance_mode(&self) -> Result<Option<bool>, RepoError> {
        let row: Option<(Option<bool>,)> =
            sqlx::query_as("SELECT maintenance_mode FROM site_settings WHERE id = $1")
                .bind(SETTINGS_ROW_ID)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepoError::from_sqlx)?;
        // A NULL flag reads as unset, like a missing row.
        Ok(row.and_then(|(flag,)| flag))
    }
}
