//! Download orchestration: one session per remote resource.
//!
//! A session is created from a HEAD probe (or restored from a
//! [`SessionSnapshot`]), bound to a [`Client`] with [`DownloadSession::init`],
//! and then driven with [`start`](DownloadSession::start),
//! [`pause`](DownloadSession::pause) and [`wait`](DownloadSession::wait).
//! Every `start` launches one job: a driver task that spawns a fetcher per
//! incomplete slice and records the outcome in the session's [`RunState`].

use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::client;
use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result, StateError};
use crate::fetcher::{fetch_slice, FetchContext, RequestCustomizer};
use crate::planner;
use crate::probe;
use crate::slice::Slice;
use crate::state::{RunState, SessionSnapshot, SliceTask};
use crate::writer::SyncWriter;

type Slices = Arc<Vec<Arc<Slice>>>;

/// Handle to a download session. Clones share the same session.
#[derive(Clone)]
pub struct DownloadSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: DownloadConfig,
    content_length: u64,
    client: OnceLock<Client>,
    slices: OnceLock<Slices>,
    writer: Arc<SyncWriter>,
    control: Mutex<Control>,
    status: watch::Sender<JobStatus>,
}

/// Run state plus the handles of the job it describes. Only touched under
/// `SessionInner::control`.
struct Control {
    status: JobStatus,
    generation: u64,
    token: Option<CancellationToken>,
    driver: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct JobStatus {
    state: RunState,
    failure: Option<Arc<DownloadError>>,
}

impl JobStatus {
    fn new(state: RunState) -> Self {
        Self { state, failure: None }
    }
}

enum JobOutcome {
    Completed,
    Cancelled,
    Failed(DownloadError),
}

impl DownloadSession {
    /// Probes `config.url()` with a fresh client, which is dropped before
    /// this returns.
    pub async fn create(config: DownloadConfig) -> Result<Self> {
        let probe_client = client::default_client()?;
        let result = Self::create_with_client(&probe_client, config).await;
        drop(probe_client);
        result
    }

    /// Probes `config.url()` with `client`. The session is not bound to it;
    /// call [`init`](Self::init) before starting.
    pub async fn create_with_client(client: &Client, config: DownloadConfig) -> Result<Self> {
        let content_length = match probe::head(client, config.url()).await {
            Ok(length) => length,
            Err(e) => {
                warn!(url = %config.url(), error = %e, "preflight failed");
                return Err(e);
            }
        };
        info!(
            url = %config.url(),
            content_length,
            blocks = config.block_count(),
            path = %config.target_path().display(),
            "session created"
        );
        Ok(Self::from_parts(config, content_length, None))
    }

    /// Rebuilds a session, including slice progress, without touching the
    /// network.
    pub fn restore(snapshot: SessionSnapshot) -> Result<Self> {
        let config = DownloadConfig::new(&snapshot.url, &snapshot.target_path)?
            .with_block_count(snapshot.block_count)?
            .with_buffer_size(snapshot.buffer_size)?
            .with_durable(snapshot.durable);
        if snapshot.content_length == 0 {
            return Err(DownloadError::InvalidConfig("content length must be positive".into()));
        }

        let downloaded = snapshot.downloaded();
        let slices = if snapshot.tasks.is_empty() {
            None
        } else {
            planner::validate(snapshot.content_length, &snapshot.tasks)?;
            Some(to_slices(snapshot.tasks))
        };
        debug!(url = %config.url(), downloaded, "session restored");
        Ok(Self::from_parts(config, snapshot.content_length, slices))
    }

    fn from_parts(config: DownloadConfig, content_length: u64, slices: Option<Slices>) -> Self {
        let writer = Arc::new(SyncWriter::new(config.target_path(), config.durable()));
        let (status, _) = watch::channel(JobStatus::new(RunState::Idle));
        let inner = SessionInner {
            config,
            content_length,
            client: OnceLock::new(),
            slices: slices.map(OnceLock::from).unwrap_or_default(),
            writer,
            control: Mutex::new(Control {
                status: JobStatus::new(RunState::Idle),
                generation: 0,
                token: None,
                driver: None,
            }),
            status,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Binds the network client and plans the slices unless the session
    /// already has them. Fails without side effects on a second call.
    pub fn init(&self, client: Client) -> Result<()> {
        self.inner
            .client
            .set(client)
            .map_err(|_| StateError::AlreadyInitialized)?;
        let slices = self.inner.slices.get_or_init(|| {
            to_slices(planner::plan(self.inner.content_length, self.inner.config.block_count()))
        });
        debug!(slices = slices.len(), "session initialized");
        Ok(())
    }

    /// Starts downloading every incomplete slice. The job is cancelled when
    /// `scope` is. Must be called within a Tokio runtime.
    pub fn start(&self, scope: &CancellationToken) -> Result<()> {
        self.launch(scope, None)
    }

    /// Like [`start`](Self::start), applying `customize` to every slice request.
    pub fn start_with<F>(&self, scope: &CancellationToken, customize: F) -> Result<()>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync + 'static,
    {
        self.launch(scope, Some(Arc::new(customize)))
    }

    fn launch(&self, scope: &CancellationToken, customizer: Option<RequestCustomizer>) -> Result<()> {
        let inner = &self.inner;
        let (client, slices) = match (inner.client.get(), inner.slices.get()) {
            (Some(client), Some(slices)) => (client.clone(), Arc::clone(slices)),
            _ => return Err(StateError::NotInitialized.into()),
        };

        let mut control = inner.control.lock();
        if control.status.state == RunState::Running {
            return Err(StateError::AlreadyRunning.into());
        }

        control.generation += 1;
        let generation = control.generation;
        let token = scope.child_token();
        let ctx = Arc::new(FetchContext {
            client,
            url: inner.config.url().clone(),
            writer: Arc::clone(&inner.writer),
            buffer_size: inner.config.buffer_size(),
            customizer,
            token: token.clone(),
        });
        // The new driver waits for the previous one so a slice never has
        // two fetchers.
        let previous = control.driver.take();
        control.driver = Some(tokio::spawn(drive(
            Arc::clone(inner),
            generation,
            ctx,
            slices,
            previous,
        )));
        control.token = Some(token);
        inner.publish(&mut control, JobStatus::new(RunState::Running));

        info!(generation, downloaded = self.download_size(), "download started");
        Ok(())
    }

    /// Waits until the current job stops running and returns how it ended.
    pub async fn wait(&self) -> Result<RunState> {
        let mut receiver = self.inner.status.subscribe();
        if receiver.borrow().state == RunState::Idle {
            return Err(StateError::NotStarted.into());
        }

        let status = receiver
            .wait_for(|status| status.state != RunState::Running)
            .await
            .map_err(|_| StateError::NotStarted)?
            .clone();
        match status.failure {
            Some(cause) => Err(DownloadError::JobFailed(cause)),
            None => Ok(status.state),
        }
    }

    /// Cancels the running job. Once this returns no further write starts;
    /// a write already holding the writer lock still completes.
    pub fn pause(&self) -> Result<()> {
        if self.inner.client.get().is_none() {
            return Err(StateError::NotInitialized.into());
        }

        let mut control = self.inner.control.lock();
        let token = control.token.take().ok_or(StateError::NotRunning)?;
        token.cancel();
        self.inner.publish(&mut control, JobStatus::new(RunState::Cancelled));

        info!(generation = control.generation, downloaded = self.download_size(), "download paused");
        Ok(())
    }

    pub fn download_size(&self) -> u64 {
        self.inner
            .slices
            .get()
            .map(|slices| slices.iter().map(|slice| slice.downloaded()).sum())
            .unwrap_or(0)
    }

    pub fn progress(&self) -> f64 {
        self.download_size() as f64 / self.inner.content_length as f64
    }

    pub fn is_downloading(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn run_state(&self) -> RunState {
        self.inner.control.lock().status.state
    }

    pub fn url(&self) -> &Url {
        self.inner.config.url()
    }

    pub fn content_length(&self) -> u64 {
        self.inner.content_length
    }

    pub fn target_path(&self) -> &Path {
        self.inner.config.target_path()
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.inner.config
    }

    /// Current slice list; empty until the session is initialized or restored.
    pub fn tasks(&self) -> Vec<SliceTask> {
        self.inner
            .slices
            .get()
            .map(|slices| slices.iter().map(|slice| slice.to_task()).collect())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let config = &self.inner.config;
        SessionSnapshot {
            url: config.url().to_string(),
            content_length: self.inner.content_length,
            target_path: config.target_path().to_string_lossy().into_owned(),
            block_count: config.block_count(),
            buffer_size: config.buffer_size(),
            durable: config.durable(),
            tasks: self.tasks(),
        }
    }
}

impl SessionInner {
    fn publish(&self, control: &mut Control, status: JobStatus) {
        control.status = status.clone();
        self.status.send_replace(status);
    }

    /// Records the outcome of job `generation` unless it was already
    /// superseded by `pause` or a later `start`.
    fn finish(&self, generation: u64, outcome: JobOutcome) {
        let mut control = self.control.lock();
        if control.generation != generation || control.status.state != RunState::Running {
            debug!(generation, "ignoring outcome of a stopped job");
            return;
        }
        control.token = None;

        let status = match outcome {
            JobOutcome::Completed => {
                info!(generation, bytes = self.content_length, "download completed");
                JobStatus::new(RunState::Completed)
            }
            JobOutcome::Cancelled => {
                info!(generation, "download cancelled");
                JobStatus::new(RunState::Cancelled)
            }
            JobOutcome::Failed(e) => {
                warn!(generation, error = %e, "download failed");
                JobStatus {
                    state: RunState::Failed,
                    failure: Some(Arc::new(e)),
                }
            }
        };
        self.publish(&mut control, status);
    }
}

async fn drive(
    inner: Arc<SessionInner>,
    generation: u64,
    ctx: Arc<FetchContext>,
    slices: Slices,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }
    let outcome = run_job(&ctx, &slices).await;
    inner.finish(generation, outcome);
}

async fn run_job(ctx: &Arc<FetchContext>, slices: &Slices) -> JobOutcome {
    let mut fetchers = JoinSet::new();
    for slice in slices.iter().filter(|slice| !slice.is_complete()) {
        fetchers.spawn(fetch_slice(Arc::clone(ctx), Arc::clone(slice)));
    }
    debug!(pending = fetchers.len(), total = slices.len(), "fetchers spawned");

    loop {
        tokio::select! {
            biased;
            _ = ctx.token.cancelled() => {
                fetchers.shutdown().await;
                return JobOutcome::Cancelled;
            }
            next = fetchers.join_next() => match next {
                None => break,
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(e))) => {
                    fetchers.shutdown().await;
                    return JobOutcome::Failed(e);
                }
                Some(Err(e)) => {
                    fetchers.shutdown().await;
                    return JobOutcome::Failed(e.into());
                }
            },
        }
    }

    if ctx.token.is_cancelled() {
        return JobOutcome::Cancelled;
    }
    match slices.iter().find(|slice| !slice.is_complete()) {
        None => JobOutcome::Completed,
        Some(slice) => JobOutcome::Failed(DownloadError::InvalidResponse(format!(
            "slice {} stopped at {} of {} bytes",
            slice.index(),
            slice.downloaded(),
            slice.len()
        ))),
    }
}

fn to_slices(tasks: Vec<SliceTask>) -> Slices {
    Arc::new(
        tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| Arc::new(Slice::new(index, task)))
            .collect(),
    )
}
