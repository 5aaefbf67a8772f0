//! Shared portal state.
//!
//! # Responsibilities
//! - Hold the immutable configuration and contest window
//! - Hold the in-memory business state: teams, job queue, bench results,
//!   proxy nodes, operator messages
//! - Track dispatch counters for the debug vars endpoint
//!
//! # Design Decisions
//! - Business state is process-local; persistence is out of scope
//! - Locks are `std::sync` and never held across an await
//! - A panicking handler must not wedge the portal, so poisoned locks are
//!   recovered rather than propagated

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::config::schema::PortalConfig;
use crate::contest::{Clock, ContestPhase, ContestWindow};

pub type SharedState = Arc<PortalState>;

/// A registered team.
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    #[serde(skip)]
    pub password: String,
    pub instance_addr: String,
}

/// A queued benchmark job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Job {
    pub id: u64,
    pub team_id: u64,
    pub enqueued_at: DateTime<Utc>,
}

/// A completed benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub job_id: u64,
    pub team_id: u64,
    pub score: i64,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

/// One reverse-proxy node in front of the contest instances.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ProxyNode {
    pub address: String,
}

/// An operator notice shown on the index page.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

/// A row of the ranking.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub team_id: u64,
    pub team_name: String,
    pub best_score: i64,
    pub latest_score: i64,
    pub latest_at: DateTime<Utc>,
}

/// Why job admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRejection {
    /// The team already has a job queued or running.
    AlreadyActive,
}

#[derive(Debug, Default)]
struct JobQueue {
    jobs: VecDeque<Job>,
    /// Teams with a job queued or leased; cleared when a result arrives.
    active_teams: HashSet<u64>,
}

/// Dispatch counters, exposed at the debug vars endpoint.
#[derive(Debug, Default)]
pub struct PortalMetrics {
    pub requests: Counter,
    pub gate_rejections: Counter,
    pub business_errors: Counter,
    pub faults: Counter,
}

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl PortalMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.get(),
            gate_rejections: self.gate_rejections.get(),
            business_errors: self.business_errors.get(),
            faults: self.faults.get(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub gate_rejections: u64,
    pub business_errors: u64,
    pub faults: u64,
}

/// Everything a handler can reach, shared across requests via `Arc`.
#[derive(Debug)]
pub struct PortalState {
    pub config: PortalConfig,
    pub window: ContestWindow,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub metrics: PortalMetrics,

    clock: Clock,
    started_instant: Instant,
    next_job_id: AtomicU64,
    teams: RwLock<HashMap<u64, Team>>,
    queue: Mutex<JobQueue>,
    results: RwLock<Vec<BenchResult>>,
    proxies: RwLock<Vec<ProxyNode>>,
    messages: RwLock<Vec<Message>>,
}

impl PortalState {
    pub fn new(config: PortalConfig) -> Self {
        let window = ContestWindow::new(config.contest.starts_at_hour, config.contest.ends_at_hour);
        let teams = config
            .teams
            .iter()
            .map(|t| {
                (
                    t.id,
                    Team {
                        id: t.id,
                        name: t.name.clone(),
                        password: t.password.clone(),
                        instance_addr: t.instance_addr.clone(),
                    },
                )
            })
            .collect();

        Self {
            config,
            window,
            version: env!("CARGO_PKG_VERSION"),
            started_at: Utc::now(),
            metrics: PortalMetrics::default(),
            clock: Clock::System,
            started_instant: Instant::now(),
            next_job_id: AtomicU64::new(1),
            teams: RwLock::new(teams),
            queue: Mutex::new(JobQueue::default()),
            results: RwLock::new(Vec::new()),
            proxies: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Replace the phase clock. Tests pin a fixed instant here.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Re-derived from wall time on every call; never cached.
    pub fn phase(&self) -> ContestPhase {
        self.window.phase(self.now())
    }

    pub fn ranking_freeze_at(&self) -> DateTime<FixedOffset> {
        self.window.ranking_freeze_at(self.now())
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_instant.elapsed().as_secs()
    }

    // ── teams ──

    pub fn team(&self, id: u64) -> Option<Team> {
        read(&self.teams).get(&id).cloned()
    }

    pub fn authenticate(&self, id: u64, password: &str) -> Option<Team> {
        read(&self.teams)
            .get(&id)
            .filter(|team| team.password == password)
            .cloned()
    }

    /// Update mutable team fields. Returns false for an unknown team.
    pub fn update_team(&self, id: u64, name: Option<String>, instance_addr: Option<String>) -> bool {
        let mut teams = write(&self.teams);
        match teams.get_mut(&id) {
            Some(team) => {
                if let Some(name) = name {
                    team.name = name;
                }
                if let Some(instance_addr) = instance_addr {
                    team.instance_addr = instance_addr;
                }
                true
            }
            None => false,
        }
    }

    // ── job queue ──

    /// Admit a benchmark job for the team. One job per team at a time:
    /// admission is refused until the previous job's result arrives.
    pub fn enqueue_job(&self, team_id: u64) -> Result<Job, QueueRejection> {
        let mut queue = lock(&self.queue);
        if !queue.active_teams.insert(team_id) {
            return Err(QueueRejection::AlreadyActive);
        }

        let job = Job {
            id: self.next_job_id.fetch_add(1, Ordering::Relaxed),
            team_id,
            enqueued_at: self.now(),
        };
        queue.jobs.push_back(job.clone());
        Ok(job)
    }

    /// Lease the oldest queued job to a benchmark worker. The team stays
    /// active until its result is posted.
    pub fn lease_job(&self) -> Option<Job> {
        lock(&self.queue).jobs.pop_front()
    }

    /// Record a finished run and release the team's queue slot.
    pub fn record_result(&self, result: BenchResult) {
        lock(&self.queue).active_teams.remove(&result.team_id);
        write(&self.results).push(result);
    }

    pub fn queue_snapshot(&self) -> Vec<Job> {
        lock(&self.queue).jobs.iter().cloned().collect()
    }

    pub fn queue_depth(&self) -> usize {
        lock(&self.queue).jobs.len()
    }

    // ── leaderboard ──

    /// Ranking rows, best score first. With `frozen_at` set, results that
    /// completed after that instant are invisible.
    pub fn leaderboard(&self, frozen_at: Option<DateTime<Utc>>) -> Vec<LeaderboardEntry> {
        let results = read(&self.results);
        let teams = read(&self.teams);

        let mut by_team: HashMap<u64, LeaderboardEntry> = HashMap::new();
        for result in results.iter() {
            if let Some(frozen_at) = frozen_at {
                if result.completed_at > frozen_at {
                    continue;
                }
            }

            let team_name = teams
                .get(&result.team_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("team {}", result.team_id));

            let entry = by_team
                .entry(result.team_id)
                .or_insert_with(|| LeaderboardEntry {
                    team_id: result.team_id,
                    team_name,
                    best_score: result.score,
                    latest_score: result.score,
                    latest_at: result.completed_at,
                });
            entry.best_score = entry.best_score.max(result.score);
            if result.completed_at >= entry.latest_at {
                entry.latest_score = result.score;
                entry.latest_at = result.completed_at;
            }
        }

        let mut rows: Vec<_> = by_team.into_values().collect();
        rows.sort_by(|a, b| b.best_score.cmp(&a.best_score).then(a.team_id.cmp(&b.team_id)));
        rows
    }

    /// The ranking as the public sees it: frozen one hour before the end
    /// bound so the final stretch stays suspenseful.
    pub fn public_leaderboard(&self) -> Vec<LeaderboardEntry> {
        let frozen_at = self.ranking_freeze_at().with_timezone(&Utc);
        self.leaderboard(Some(frozen_at))
    }

    // ── proxies ──

    pub fn set_proxies(&self, nodes: Vec<ProxyNode>) {
        *write(&self.proxies) = nodes;
    }

    pub fn proxies(&self) -> Vec<ProxyNode> {
        read(&self.proxies).clone()
    }

    // ── messages ──

    pub fn messages(&self) -> Vec<Message> {
        read(&self.messages).clone()
    }

    pub fn post_message(&self, body: String) -> Message {
        let message = Message {
            body,
            posted_at: self.now(),
        };
        write(&self.messages).push(message.clone());
        message
    }
}

// Poison recovery: the state must stay usable after a handler panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TeamConfig;
    use chrono::TimeZone;

    fn state_with_teams() -> PortalState {
        let mut config = PortalConfig::default();
        config.teams = vec![
            TeamConfig {
                id: 1,
                name: "alpacas".to_string(),
                password: "grass".to_string(),
                instance_addr: "10.0.1.1".to_string(),
            },
            TeamConfig {
                id: 2,
                name: "llamas".to_string(),
                password: "hay".to_string(),
                instance_addr: "10.0.1.2".to_string(),
            },
        ];
        PortalState::new(config)
    }

    fn result(team_id: u64, score: i64, at_hour: u32) -> BenchResult {
        BenchResult {
            job_id: 0,
            team_id,
            score,
            passed: true,
            completed_at: Utc.with_ymd_and_hms(2026, 8, 6, at_hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn authentication_checks_the_password() {
        let state = state_with_teams();
        assert!(state.authenticate(1, "grass").is_some());
        assert!(state.authenticate(1, "straw").is_none());
        assert!(state.authenticate(9, "grass").is_none());
    }

    #[test]
    fn one_job_per_team_until_result_arrives() {
        let state = state_with_teams();

        let job = state.enqueue_job(1).unwrap();
        assert_eq!(state.enqueue_job(1), Err(QueueRejection::AlreadyActive));

        // Leasing the job does not release the slot.
        let leased = state.lease_job().unwrap();
        assert_eq!(leased.id, job.id);
        assert_eq!(state.enqueue_job(1), Err(QueueRejection::AlreadyActive));

        state.record_result(result(1, 1000, 5));
        assert!(state.enqueue_job(1).is_ok());
    }

    #[test]
    fn jobs_are_leased_in_fifo_order() {
        let state = state_with_teams();
        let first = state.enqueue_job(1).unwrap();
        let second = state.enqueue_job(2).unwrap();

        assert_eq!(state.lease_job().unwrap().id, first.id);
        assert_eq!(state.lease_job().unwrap().id, second.id);
        assert!(state.lease_job().is_none());
    }

    #[test]
    fn leaderboard_ranks_best_scores() {
        let state = state_with_teams();
        state.record_result(result(1, 500, 11));
        state.record_result(result(1, 1500, 12));
        state.record_result(result(2, 900, 13));

        let rows = state.leaderboard(None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, 1);
        assert_eq!(rows[0].best_score, 1500);
        assert_eq!(rows[1].team_id, 2);
    }

    #[test]
    fn frozen_leaderboard_hides_late_results() {
        let state = state_with_teams();
        state.record_result(result(1, 500, 11));
        state.record_result(result(1, 9000, 17));

        let frozen_at = Utc.with_ymd_and_hms(2026, 8, 6, 16, 0, 0).unwrap();
        let rows = state.leaderboard(Some(frozen_at));
        assert_eq!(rows[0].best_score, 500);

        let rows = state.leaderboard(None);
        assert_eq!(rows[0].best_score, 9000);
    }

    #[test]
    fn update_team_touches_only_given_fields() {
        let state = state_with_teams();
        assert!(state.update_team(1, None, Some("10.9.9.9".to_string())));

        let team = state.team(1).unwrap();
        assert_eq!(team.name, "alpacas");
        assert_eq!(team.instance_addr, "10.9.9.9");

        assert!(!state.update_team(42, Some("ghosts".to_string()), None));
    }
}
