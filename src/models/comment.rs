//! Event comments, likes, flags and moderation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};

use crate::utils::errors::{CommunityError, Result};

pub const MAX_COMMENT_LEN: usize = 2000;

/// Comment row joined with its author's name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub parent_id: Option<i64>,
    pub content: String,
    pub like_count: i64,
    pub flag_count: i64,
    pub is_hidden: bool,
    pub hidden_by: Option<i64>,
    pub hidden_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Root of this comment's thread
    pub fn thread_root(&self) -> i64 {
        self.parent_id.unwrap_or(self.id)
    }
}

/// Trim and bound comment text
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CommunityError::InvalidInput(
            "Comment cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(CommunityError::InvalidInput(format!(
            "Comment is limited to {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Threads are one level deep: a reply to a reply hangs off the root.
pub fn resolve_thread_parent(parent: &Comment, event_id: i64) -> Result<i64> {
    if parent.event_id != event_id {
        return Err(CommunityError::InvalidInput(format!(
            "Comment {} belongs to a different event",
            parent.id
        )));
    }
    Ok(parent.thread_root())
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub liked_by_me: bool,
    pub replies: Vec<CommentView>,
}

/// Attach replies (oldest first) to their top-level comments, keeping the
/// order of `roots`
pub fn build_threads(
    roots: Vec<Comment>,
    replies: Vec<Comment>,
    liked: &HashSet<i64>,
) -> Vec<CommentView> {
    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let mut children = by_parent.remove(&root.id).unwrap_or_default();
            children.sort_by_key(|c| (c.created_at, c.id));
            CommentView {
                liked_by_me: liked.contains(&root.id),
                replies: children
                    .into_iter()
                    .map(|c| CommentView {
                        liked_by_me: liked.contains(&c.id),
                        comment: c,
                        replies: Vec::new(),
                    })
                    .collect(),
                comment: root,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagCommentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Hide,
    Unhide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerateCommentRequest {
    pub action: ModerationAction,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn comment(id: i64, parent_id: Option<i64>, minutes: i64) -> Comment {
        Comment {
            id,
            event_id: 9,
            user_id: 1,
            author_name: "Asha Patel".to_string(),
            parent_id,
            content: format!("comment {}", id),
            like_count: 0,
            flag_count: 0,
            is_hidden: false,
            hidden_by: None,
            hidden_reason: None,
            created_at: Utc::now() + Duration::minutes(minutes),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_content() {
        assert_eq!(validate_content("  hello ").ok(), Some("hello".to_string()));
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn test_reply_to_reply_attaches_to_root() {
        let root = comment(1, None, 0);
        let reply = comment(2, Some(1), 1);
        assert_eq!(resolve_thread_parent(&root, 9).ok(), Some(1));
        assert_eq!(resolve_thread_parent(&reply, 9).ok(), Some(1));
        assert!(resolve_thread_parent(&root, 10).is_err());
    }

    #[test]
    fn test_build_threads() {
        let roots = vec![comment(5, None, 10), comment(1, None, 0)];
        let replies = vec![comment(7, Some(1), 3), comment(6, Some(1), 2), comment(8, Some(5), 11)];
        let liked: HashSet<i64> = [6, 5].into_iter().collect();

        let threads = build_threads(roots, replies, &liked);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, 5);
        assert!(threads[0].liked_by_me);
        assert_eq!(threads[0].replies.len(), 1);

        let ids: Vec<i64> = threads[1].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(ids, vec![6, 7]);
        assert!(threads[1].replies[0].liked_by_me);
        assert!(!threads[1].liked_by_me);
    }
}
