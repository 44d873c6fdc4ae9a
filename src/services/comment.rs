//! Comment service implementation

use serde_json::json;
use tracing::{debug, info};

use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::comment::{
    build_threads, resolve_thread_parent, validate_content, Comment, CommentView, CreateCommentRequest, LikeState,
    ModerateCommentRequest, ModerationAction,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::Permissions;
use crate::services::auth::AuthContext;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::clean_optional;
use crate::utils::logging::log_user_action;

#[derive(Clone)]
pub struct CommentService {
    db: DatabaseService,
}

impl CommentService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Top-level comments newest first, each with its replies oldest first
    pub async fn list_for_event(
        &self,
        ctx: &AuthContext,
        event_id: i64,
        params: PageParams,
    ) -> Result<Page<CommentView>> {
        self.db.events.get(event_id).await?;
        let include_hidden = ctx.has(Permissions::MODERATE_COMMENTS);

        let (roots, total) = self.db.comments.list_roots(event_id, include_hidden, params).await?;
        let root_ids: Vec<i64> = roots.iter().map(|c| c.id).collect();
        let replies = self.db.comments.list_replies(&root_ids, include_hidden).await?;

        let mut all_ids = root_ids;
        all_ids.extend(replies.iter().map(|c| c.id));
        let liked = self.db.comments.liked_ids(ctx.user_id(), &all_ids).await?;

        Ok(Page::new(build_threads(roots, replies, &liked), total, params))
    }

    pub async fn create(&self, ctx: &AuthContext, event_id: i64, request: CreateCommentRequest) -> Result<Comment> {
        self.db.events.get(event_id).await?;
        let content = validate_content(&request.content)?;

        let parent_id = match request.parent_id {
            Some(parent_id) => {
                let parent = self.visible(ctx, parent_id).await?;
                Some(resolve_thread_parent(&parent, event_id)?)
            }
            None => None,
        };

        let comment = self
            .db
            .comments
            .create(event_id, ctx.user_id(), parent_id, &content)
            .await?;
        debug!(comment_id = comment.id, event_id = event_id, parent_id = ?parent_id, "Comment created");
        Ok(comment)
    }

    /// Authors may edit their own comments
    pub async fn update(&self, ctx: &AuthContext, comment_id: i64, content: &str) -> Result<Comment> {
        let comment = self.visible(ctx, comment_id).await?;
        if comment.user_id != ctx.user_id() {
            return Err(CommunityError::PermissionDenied(
                "Only the author can edit this comment".to_string(),
            ));
        }

        let content = validate_content(content)?;
        self.db.comments.update_content(comment_id, &content).await
    }

    /// Delete a comment together with its replies
    pub async fn delete(&self, ctx: &AuthContext, comment_id: i64) -> Result<()> {
        let comment = self.db.comments.get(comment_id).await?;
        let is_author = comment.user_id == ctx.user_id();
        if !is_author {
            ctx.require(Permissions::MODERATE_COMMENTS)?;
        }

        self.db.comments.delete(comment_id).await?;
        if !is_author {
            self.db
                .log_activity(
                    NewActivityLog::new(Some(ctx.user_id()), actions::COMMENT_DELETED, "comment", Some(comment_id))
                        .with_details(json!({ "event_id": comment.event_id, "author_id": comment.user_id })),
                )
                .await;
        }
        Ok(())
    }

    pub async fn toggle_like(&self, ctx: &AuthContext, comment_id: i64) -> Result<LikeState> {
        self.visible(ctx, comment_id).await?;
        let state = self.db.comments.toggle_like(comment_id, ctx.user_id()).await?;
        let action = if state.liked { "comment_liked" } else { "comment_unliked" };
        log_user_action(ctx.user_id(), action, Some(&comment_id.to_string()));
        Ok(state)
    }

    pub async fn flag(&self, ctx: &AuthContext, comment_id: i64, reason: Option<String>) -> Result<Comment> {
        let comment = self.visible(ctx, comment_id).await?;
        if comment.user_id == ctx.user_id() {
            return Err(CommunityError::InvalidInput(
                "You cannot flag your own comment".to_string(),
            ));
        }

        let reason = clean_optional(reason);
        let flagged = self
            .db
            .comments
            .flag(comment_id, ctx.user_id(), reason.as_deref())
            .await?;
        info!(comment_id = comment_id, flag_count = flagged.flag_count, "Comment flagged");
        Ok(flagged)
    }

    pub async fn moderate(
        &self,
        ctx: &AuthContext,
        comment_id: i64,
        request: ModerateCommentRequest,
    ) -> Result<Comment> {
        ctx.require(Permissions::MODERATE_COMMENTS)?;
        let comment = self.db.comments.get(comment_id).await?;

        let hide = request.action == ModerationAction::Hide;
        if comment.is_hidden == hide {
            return Ok(comment);
        }

        let reason = clean_optional(request.reason);
        let updated = self
            .db
            .comments
            .set_hidden(comment_id, hide, ctx.user_id(), reason.as_deref())
            .await?;

        let action = if hide {
            actions::COMMENT_HIDDEN
        } else {
            actions::COMMENT_UNHIDDEN
        };
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), action, "comment", Some(comment_id))
                    .with_details(json!({ "reason": reason, "event_id": comment.event_id })),
            )
            .await;
        Ok(updated)
    }

    pub async fn flagged(&self, ctx: &AuthContext, params: PageParams) -> Result<Page<Comment>> {
        ctx.require(Permissions::MODERATE_COMMENTS)?;
        let (comments, total) = self.db.comments.list_flagged(params).await?;
        Ok(Page::new(comments, total, params))
    }

    /// Hidden comments exist only for moderators
    async fn visible(&self, ctx: &AuthContext, comment_id: i64) -> Result<Comment> {
        let comment = self.db.comments.get(comment_id).await?;
        if comment.is_hidden && !ctx.has(Permissions::MODERATE_COMMENTS) {
            return Err(CommunityError::CommentNotFound { comment_id });
        }
        Ok(comment)
    }
}
