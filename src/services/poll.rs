//! Poll service implementation

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::database::DatabaseService;
use crate::models::admin::{actions, NewActivityLog};
use crate::models::pagination::{Page, PageParams};
use crate::models::permission::Permissions;
use crate::models::poll::{
    compute_results, validate_options, CreatePollRequest, Poll, PollDetail, PollFilter, UpdatePollRequest,
};
use crate::services::auth::AuthContext;
use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::{clean_optional, normalize_whitespace};
use crate::utils::logging::log_user_action;

#[derive(Clone)]
pub struct PollService {
    db: DatabaseService,
}

impl PollService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: PollFilter, params: PageParams) -> Result<Page<Poll>> {
        let (polls, total) = self.db.polls.list(&filter, Utc::now(), params).await?;
        Ok(Page::new(polls, total, params))
    }

    /// Poll with tallied options and the caller's ballot
    pub async fn get(&self, ctx: &AuthContext, poll_id: i64) -> Result<PollDetail> {
        let poll = self.db.polls.get(poll_id).await?;
        self.detail(ctx, poll).await
    }

    async fn detail(&self, ctx: &AuthContext, poll: Poll) -> Result<PollDetail> {
        let options = self.db.polls.options(poll.id).await?;
        let (options, total_votes) = compute_results(&options);
        let total_voters = self.db.polls.total_voters(poll.id).await?;
        let my_votes = self.db.polls.user_votes(poll.id, ctx.user_id()).await?;

        Ok(PollDetail {
            is_open: poll.is_open(Utc::now()),
            poll,
            options,
            total_votes,
            total_voters,
            has_voted: !my_votes.is_empty(),
            my_votes,
        })
    }

    pub async fn create(&self, ctx: &AuthContext, request: CreatePollRequest) -> Result<PollDetail> {
        ctx.require(Permissions::MANAGE_POLLS)?;

        let title = normalize_whitespace(&request.title);
        if title.is_empty() {
            return Err(CommunityError::InvalidInput("Title is required".to_string()));
        }
        if let Some(ends_at) = request.ends_at {
            if ends_at <= Utc::now() {
                return Err(CommunityError::InvalidInput(
                    "Poll end time must be in the future".to_string(),
                ));
            }
        }
        let labels = validate_options(&request.options)?;
        let description = clean_optional(request.description);

        let (poll, _) = self
            .db
            .polls
            .create(
                &title,
                description.as_deref(),
                request.allow_multiple,
                request.ends_at,
                &labels,
                ctx.user_id(),
            )
            .await?;

        info!(poll_id = poll.id, options = labels.len(), actor_id = ctx.user_id(), "Poll created");
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::POLL_CREATED, "poll", Some(poll.id))
                    .with_details(json!({ "title": poll.title, "options": labels })),
            )
            .await;

        self.detail(ctx, poll).await
    }

    /// Closed polls cannot be edited
    pub async fn update(&self, ctx: &AuthContext, poll_id: i64, mut request: UpdatePollRequest) -> Result<Poll> {
        ctx.require(Permissions::MANAGE_POLLS)?;
        let poll = self.db.polls.get(poll_id).await?;
        if poll.is_closed {
            return Err(CommunityError::InvalidStateTransition {
                from: "closed".to_string(),
                to: "updated".to_string(),
            });
        }

        if let Some(title) = request.title.as_deref() {
            let title = normalize_whitespace(title);
            if title.is_empty() {
                return Err(CommunityError::InvalidInput("Title is required".to_string()));
            }
            request.title = Some(title);
        }
        if let Some(ends_at) = request.ends_at {
            if ends_at <= Utc::now() {
                return Err(CommunityError::InvalidInput(
                    "Poll end time must be in the future".to_string(),
                ));
            }
        }

        let updated = self.db.polls.update(poll_id, request).await?;
        self.db
            .log_activity(NewActivityLog::new(Some(ctx.user_id()), actions::POLL_UPDATED, "poll", Some(poll_id)))
            .await;
        Ok(updated)
    }

    /// Close a poll; closing twice is a no-op
    pub async fn close(&self, ctx: &AuthContext, poll_id: i64) -> Result<Poll> {
        ctx.require(Permissions::MANAGE_POLLS)?;
        let poll = self.db.polls.get(poll_id).await?;
        if poll.is_closed {
            return Ok(poll);
        }

        let closed = self.db.polls.close(poll_id).await?;
        self.db
            .log_activity(NewActivityLog::new(Some(ctx.user_id()), actions::POLL_CLOSED, "poll", Some(poll_id)))
            .await;
        Ok(closed)
    }

    pub async fn delete(&self, ctx: &AuthContext, poll_id: i64) -> Result<()> {
        ctx.require(Permissions::MANAGE_POLLS)?;
        let poll = self.db.polls.get(poll_id).await?;

        self.db.polls.delete(poll_id).await?;
        self.db
            .log_activity(
                NewActivityLog::new(Some(ctx.user_id()), actions::POLL_DELETED, "poll", Some(poll_id))
                    .with_details(json!({ "title": poll.title })),
            )
            .await;
        Ok(())
    }

    pub async fn vote(&self, ctx: &AuthContext, poll_id: i64, option_ids: Vec<i64>) -> Result<PollDetail> {
        let recorded = self
            .db
            .polls
            .record_vote(poll_id, ctx.user_id(), &option_ids, Utc::now())
            .await?;
        log_user_action(ctx.user_id(), "poll_vote", Some(&format!("poll {} options {:?}", poll_id, recorded)));

        self.get(ctx, poll_id).await
    }
}
