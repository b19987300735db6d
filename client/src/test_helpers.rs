//! In-process fake of the CRM backend for unit tests.
//!
//! `MockApi` issues tokens on login and resolves `/me` from whatever credential
//! the shared store holds at call time, the same way `HttpApi` does. Gates let a
//! test hold a call open to force a specific interleaving.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::net::api::*;
use crate::net::error::ApiError;
use crate::net::types::{Activity, Contact, Deal, Lead, LoginResponse, Profile, RegisterRequest, Registration};
use crate::state::session::SessionStore;
use crate::state::storage::{KeyValueStore, MemoryStore, TOKEN_KEY};

#[derive(Default)]
struct MockState {
    accounts: Vec<(Profile, String)>,
    tokens: HashMap<String, i64>,
    next_token: u64,
    calls: Vec<&'static str>,
    login_errors: VecDeque<ApiError>,
    profile_errors: VecDeque<ApiError>,
    register_error: Option<ApiError>,
    failing: HashSet<&'static str>,
    login_gates: VecDeque<Arc<Notify>>,
    profile_gates: VecDeque<Arc<Notify>>,
}

pub(crate) struct MockApi {
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<MockState>,
}

impl MockApi {
    pub(crate) fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage, state: Mutex::new(MockState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Register an account that can log in.
    pub(crate) fn with_account(self, email: &str, password: &str, first_name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = i64::try_from(state.accounts.len()).unwrap() + 1;
            state.accounts.push((make_profile(id, first_name, email), password.to_owned()));
        }
        self
    }

    /// Mint a valid token for an existing account without going through login.
    pub(crate) fn issue_token(&self, email: &str) -> String {
        let mut state = self.lock();
        let id = state
            .accounts
            .iter()
            .find(|(p, _)| p.email == email)
            .map(|(p, _)| p.id)
            .unwrap();
        state.next_token += 1;
        let token = format!("token-{}", state.next_token);
        state.tokens.insert(token.clone(), id);
        token
    }

    /// Make the next `login` call fail with `err` whatever the credentials.
    pub(crate) fn fail_next_login(&self, err: ApiError) {
        self.lock().login_errors.push_back(err);
    }

    /// Make the next `fetch_current_profile` call fail with `err`.
    pub(crate) fn fail_next_profile(&self, err: ApiError) {
        self.lock().profile_errors.push_back(err);
    }

    pub(crate) fn fail_register(&self, err: ApiError) {
        self.lock().register_error = Some(err);
    }

    /// Make the dashboard read at `path` fail.
    pub(crate) fn fail_section(&self, path: &'static str) {
        self.lock().failing.insert(path);
    }

    /// Hold the next login call until the returned gate is notified.
    pub(crate) fn gate_next_login(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().login_gates.push_back(gate.clone());
        gate
    }

    /// Hold the next profile call until the returned gate is notified.
    pub(crate) fn gate_next_profile(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().profile_gates.push_back(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub(crate) fn call_count(&self, path: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == path).count()
    }

    fn record(&self, path: &'static str) {
        self.lock().calls.push(path);
    }

    fn section<T>(&self, path: &'static str, value: T) -> Result<T, ApiError> {
        self.record(path);
        if self.lock().failing.contains(path) {
            return Err(ApiError::Server { status: 500, body: format!("{path} unavailable") });
        }
        Ok(value)
    }
}

async fn wait_gate(gate: Option<Arc<Notify>>) {
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

pub(crate) fn make_profile(id: i64, first_name: &str, email: &str) -> Profile {
    Profile {
        id,
        first_name: first_name.to_owned(),
        last_name: "Tester".to_owned(),
        email: email.to_owned(),
        role: Some("USER".to_owned()),
        created_at: None,
    }
}

pub(crate) fn make_lead(id: i64) -> Lead {
    Lead {
        id,
        first_name: Some(format!("Lead{id}")),
        last_name: None,
        email: None,
        phone: None,
        company: None,
        status: Some("New".to_owned()),
    }
}

pub(crate) fn make_deal(id: i64, value: f64) -> Deal {
    Deal {
        id,
        name: Some(format!("Deal {id}")),
        description: None,
        value: Some(value),
        stage: Some("PROPOSAL".to_owned()),
        probability: Some(50),
        close_date: None,
    }
}

pub(crate) fn make_activity(id: i64) -> Activity {
    Activity {
        id,
        kind: Some("CALL".to_owned()),
        subject: Some(format!("Follow up {id}")),
        notes: None,
        due_date: None,
        completed: false,
    }
}

pub(crate) fn make_contact(id: i64) -> Contact {
    Contact {
        id,
        first_name: Some(format!("Contact{id}")),
        last_name: None,
        email: None,
        phone: None,
        company: None,
        job_title: None,
    }
}

/// Shared store, mock backend with one account, and a session over both.
pub(crate) fn session_fixture() -> (MemoryStore, Arc<MockApi>, SessionStore) {
    let storage = MemoryStore::new();
    let api = Arc::new(MockApi::new(Arc::new(storage.clone())).with_account("ada@example.com", "secret", "Ada"));
    let session = SessionStore::new(api.clone(), Arc::new(storage.clone()));
    (storage, api, session)
}

#[async_trait::async_trait]
impl CrmApi for MockApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.record(LOGIN_PATH);
        let gate = self.lock().login_gates.pop_front();
        wait_gate(gate).await;

        let mut state = self.lock();
        if let Some(err) = state.login_errors.pop_front() {
            return Err(err);
        }
        let Some(profile) = state
            .accounts
            .iter()
            .find(|(p, pw)| p.email == email && pw == password)
            .map(|(p, _)| p.clone())
        else {
            return Err(ApiError::Auth("Bad credentials".to_owned()));
        };
        state.next_token += 1;
        let token = format!("token-{}", state.next_token);
        state.tokens.insert(token.clone(), profile.id);
        Ok(LoginResponse { token, id: Some(profile.id), email: Some(profile.email), role: profile.role })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<Registration, ApiError> {
        self.record(REGISTER_PATH);
        let mut state = self.lock();
        if let Some(err) = state.register_error.clone() {
            return Err(err);
        }
        if state.accounts.iter().any(|(p, _)| p.email == request.email) {
            return Err(ApiError::Conflict("Error: Email is already in use!".to_owned()));
        }
        let id = i64::try_from(state.accounts.len()).unwrap() + 1;
        let mut profile = make_profile(id, &request.first_name, &request.email);
        profile.last_name.clone_from(&request.last_name);
        state.accounts.push((profile, request.password.clone()));
        Ok(Registration::Acknowledged("User registered successfully!".to_owned()))
    }

    async fn fetch_current_profile(&self) -> Result<Profile, ApiError> {
        self.record(ME_PATH);
        let token = self.storage.get(TOKEN_KEY);
        let gate = self.lock().profile_gates.pop_front();
        wait_gate(gate).await;

        let mut state = self.lock();
        if let Some(err) = state.profile_errors.pop_front() {
            return Err(err);
        }
        let id = token
            .and_then(|t| state.tokens.get(&t).copied())
            .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".to_owned()))?;
        state
            .accounts
            .iter()
            .find(|(p, _)| p.id == id)
            .map(|(p, _)| p.clone())
            .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".to_owned()))
    }

    async fn leads(&self) -> Result<Vec<Lead>, ApiError> {
        self.section(LEADS_PATH, (1..=7).map(make_lead).collect())
    }

    async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.section(CONTACTS_PATH, (1..=3).map(make_contact).collect())
    }

    async fn deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.section(DEALS_PATH, vec![make_deal(1, 1000.0), make_deal(2, 3200.0)])
    }

    async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.section(ACTIVITIES_PATH, (1..=4).map(make_activity).collect())
    }

    async fn upcoming_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.section(UPCOMING_ACTIVITIES_PATH, vec![make_activity(10)])
    }

    async fn overdue_activities(&self) -> Result<Vec<Activity>, ApiError> {
        self.section(OVERDUE_ACTIVITIES_PATH, vec![make_activity(20), make_activity(21)])
    }

    async fn deals_closing_soon(&self) -> Result<Vec<Deal>, ApiError> {
        self.section(DEALS_CLOSING_SOON_PATH, vec![make_deal(2, 3200.0)])
    }

    async fn pipeline_value(&self) -> Result<f64, ApiError> {
        self.section(PIPELINE_VALUE_PATH, 4200.0)
    }
}
