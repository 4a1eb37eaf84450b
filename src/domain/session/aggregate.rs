//! SessionRecord aggregate.
//!
//! A record of one browsing visit. It owns the lifecycle state machine and
//! the activity counters; the caller-owned attribute bags are stored but
//! never interpreted.
//!
//! # Invariants
//!
//! - `session_id` never changes once the record exists
//! - status only moves ACTIVE -> {EXPIRED, TERMINATED}; terminal states are absorbing
//! - `last_activity_time` never decreases
//! - `end_time` and `duration_seconds` are set exactly once, on close,
//!   with `duration_seconds == end_time - start_time` in whole seconds

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, SessionStatus, Timestamp, UserId};

use super::change::{AttributeBag, ChangeOutcome, SessionChange};

/// Opaque caller-owned key/value bag.
pub type Attributes = HashMap<String, serde_json::Value>;

/// Everything needed to open a new session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub session_id: Option<SessionId>,
    pub user_id: UserId,
    pub user_agent: String,
    pub ip_address: String,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub referrer: Option<String>,
    pub initial_data: Attributes,
}

impl NewSession {
    /// Minimal create request: owner, id, user agent and address.
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        user_agent: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            session_id: Some(session_id),
            user_id,
            user_agent: user_agent.into(),
            ip_address: ip_address.into(),
            ..Default::default()
        }
    }

    pub fn with_device(
        mut self,
        device_type: Option<String>,
        browser: Option<String>,
        operating_system: Option<String>,
    ) -> Self {
        self.device_type = device_type;
        self.browser = browser;
        self.operating_system = operating_system;
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_initial_data(mut self, data: Attributes) -> Self {
        self.initial_data = data;
        self
    }
}

/// A tracked browsing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    session_id: SessionId,
    user_id: UserId,
    status: SessionStatus,

    start_time: Timestamp,
    last_activity_time: Timestamp,
    end_time: Option<Timestamp>,
    duration_seconds: Option<i64>,

    page_views: u64,
    clicks: u64,
    searches: u64,
    visited_pages: BTreeSet<String>,
    searched_terms: BTreeSet<String>,
    viewed_products: BTreeSet<String>,

    session_data: Attributes,
    ai_context: Attributes,
    recommendations: Attributes,
    user_preferences: Attributes,

    user_agent: String,
    ip_address: String,
    device_type: Option<String>,
    browser: Option<String>,
    operating_system: Option<String>,
    current_page: Option<String>,
    referrer: Option<String>,

    authentication_token: Option<String>,
    refresh_token: Option<String>,
    token_expiry_time: Option<Timestamp>,
    is_authenticated: bool,
}

impl SessionRecord {
    /// Open a new ACTIVE session at `now`.
    pub fn open(id: SessionId, request: NewSession, now: Timestamp) -> Self {
        Self {
            session_id: id,
            user_id: request.user_id,
            status: SessionStatus::Active,
            start_time: now,
            last_activity_time: now,
            end_time: None,
            duration_seconds: None,
            page_views: 0,
            clicks: 0,
            searches: 0,
            visited_pages: BTreeSet::new(),
            searched_terms: BTreeSet::new(),
            viewed_products: BTreeSet::new(),
            session_data: request.initial_data,
            ai_context: Attributes::new(),
            recommendations: Attributes::new(),
            user_preferences: Attributes::new(),
            user_agent: request.user_agent,
            ip_address: request.ip_address,
            device_type: request.device_type,
            browser: request.browser,
            operating_system: request.operating_system,
            current_page: None,
            referrer: request.referrer,
            authentication_token: None,
            refresh_token: None,
            token_expiry_time: None,
            is_authenticated: false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn last_activity_time(&self) -> Timestamp {
        self.last_activity_time
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.duration_seconds
    }

    pub fn page_views(&self) -> u64 {
        self.page_views
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn searches(&self) -> u64 {
        self.searches
    }

    pub fn visited_pages(&self) -> &BTreeSet<String> {
        &self.visited_pages
    }

    pub fn searched_terms(&self) -> &BTreeSet<String> {
        &self.searched_terms
    }

    pub fn viewed_products(&self) -> &BTreeSet<String> {
        &self.viewed_products
    }

    pub fn session_data(&self) -> &Attributes {
        &self.session_data
    }

    pub fn ai_context(&self) -> &Attributes {
        &self.ai_context
    }

    pub fn recommendations(&self) -> &Attributes {
        &self.recommendations
    }

    pub fn user_preferences(&self) -> &Attributes {
        &self.user_preferences
    }

    /// Returns the bag selected by `bag`.
    pub fn attributes(&self, bag: AttributeBag) -> &Attributes {
        match bag {
            AttributeBag::SessionData => &self.session_data,
            AttributeBag::AiContext => &self.ai_context,
            AttributeBag::Recommendations => &self.recommendations,
            AttributeBag::UserPreferences => &self.user_preferences,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    pub fn browser(&self) -> Option<&str> {
        self.browser.as_deref()
    }

    pub fn operating_system(&self) -> Option<&str> {
        self.operating_system.as_deref()
    }

    pub fn current_page(&self) -> Option<&str> {
        self.current_page.as_deref()
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn authentication_token(&self) -> Option<&str> {
        self.authentication_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn token_expiry_time(&self) -> Option<Timestamp> {
        self.token_expiry_time
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// True while ACTIVE and last active strictly before `cutoff`.
    pub fn is_idle_since(&self, cutoff: Timestamp) -> bool {
        self.is_active() && self.last_activity_time.is_before(&cutoff)
    }

    /// True iff a token is bound and `now` is strictly before its expiry.
    ///
    /// Independent of session status.
    pub fn token_valid_at(&self, now: Timestamp) -> bool {
        match self.token_expiry_time {
            Some(expiry) => self.authentication_token.is_some() && now.is_before(&expiry),
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a change at `now`.
    ///
    /// Non-closing changes also bump the idle timer. Closing changes on an
    /// already-closed record are no-ops; any other change on a closed record
    /// is refused.
    pub fn apply(&mut self, change: &SessionChange, now: Timestamp) -> ChangeOutcome {
        match change {
            SessionChange::Terminate => {
                if !self.is_active() {
                    return ChangeOutcome::Unchanged;
                }
                let end = if now.is_before(&self.start_time) {
                    self.start_time
                } else {
                    now
                };
                self.close(SessionStatus::Terminated, end);
                ChangeOutcome::Changed
            }
            SessionChange::Expire { idle_timeout } => {
                let cutoff = now.minus(*idle_timeout);
                if !self.is_idle_since(cutoff) {
                    return ChangeOutcome::Unchanged;
                }
                // End is when the idle window lapsed, not when the sweep ran.
                let end = self.last_activity_time.plus(*idle_timeout);
                self.close(SessionStatus::Expired, end);
                ChangeOutcome::Changed
            }
            _ if !self.is_active() => ChangeOutcome::Closed,
            mutation => {
                self.mutate(mutation);
                self.touch(now);
                ChangeOutcome::Changed
            }
        }
    }

    fn mutate(&mut self, change: &SessionChange) {
        match change {
            SessionChange::PageView { url } => {
                self.page_views += 1;
                self.visited_pages.insert(url.clone());
                self.current_page = Some(url.clone());
            }
            SessionChange::Click { .. } => {
                self.clicks += 1;
            }
            SessionChange::Search { term } => {
                self.searches += 1;
                self.searched_terms.insert(term.clone());
            }
            SessionChange::ProductView { product_id } => {
                self.viewed_products.insert(product_id.clone());
            }
            SessionChange::Context {
                current_page,
                referrer,
            } => {
                self.current_page = Some(current_page.clone());
                self.referrer = referrer.clone();
            }
            SessionChange::ReplaceAttributes { bag, values } => {
                let target = match bag {
                    AttributeBag::SessionData => &mut self.session_data,
                    AttributeBag::AiContext => &mut self.ai_context,
                    AttributeBag::Recommendations => &mut self.recommendations,
                    AttributeBag::UserPreferences => &mut self.user_preferences,
                };
                *target = values.clone();
            }
            SessionChange::BindTokens {
                authentication_token,
                refresh_token,
                expires_at,
            } => {
                self.authentication_token = Some(authentication_token.clone());
                self.refresh_token = Some(refresh_token.clone());
                self.token_expiry_time = Some(*expires_at);
                self.is_authenticated = true;
            }
            SessionChange::RefreshToken {
                authentication_token,
                expires_at,
            } => {
                self.authentication_token = Some(authentication_token.clone());
                self.token_expiry_time = Some(*expires_at);
            }
            SessionChange::Touch | SessionChange::Terminate | SessionChange::Expire { .. } => {}
        }
    }

    fn touch(&mut self, now: Timestamp) {
        if now.is_after(&self.last_activity_time) {
            self.last_activity_time = now;
        }
    }

    fn close(&mut self, status: SessionStatus, end: Timestamp) {
        self.status = status;
        self.end_time = Some(end);
        self.duration_seconds = Some(end.seconds_since(&self.start_time));
    }
}
