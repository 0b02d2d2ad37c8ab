//! Media session reconciliation.
//!
//! [`MediaReconciler`] keeps a converged view of the host's media sessions
//! and of the selected session's snapshot. It combines three inputs:
//!
//! - a periodic full list fetch,
//! - push events (`media_info_updated`, `media_thumbnail_updated`,
//!   `media_info_cleared`),
//! - user actions (selection, play/pause, next, previous).
//!
//! State transitions live in the synchronous [`MediaView`]; this module only
//! schedules the I/O they ask for and publishes snapshot changes through a
//! `watch` channel.
//!
//! ```text
//! list fetch ─┐
//! push event ─┼──► MediaView ──► Plan ──► thumbnail fetch ──► MediaView
//! user action ┘        │
//!                      └──► watch::Sender<Option<Arc<MediaInfo>>>
//! ```

mod view;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use eazy_protocol::{MediaInfo, SkipDirection};
use eazy_runtime::{Result, ScheduledTask, Subscription};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

pub use view::{ListOutcome, MediaView, Plan, SkipPlan, ThumbnailTag};

use crate::facade::Controller;

/// Reconciler timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
	/// Period of the full session list fetch.
	pub refresh_interval: Duration,
	/// Wait before each bounded-poll attempt, the first included.
	pub poll_interval: Duration,
	/// Bounded-poll attempt budget.
	pub poll_attempts: u32,
	/// Settle delay before the poll schedule starts.
	pub poll_delay: Duration,
}

impl Default for ReconcilerConfig {
	fn default() -> Self {
		Self {
			refresh_interval: Duration::from_secs(2),
			poll_interval: Duration::from_secs(1),
			poll_attempts: 10,
			poll_delay: Duration::from_millis(300),
		}
	}
}

#[derive(Debug)]
enum MediaEvent {
	InfoUpdated(MediaInfo),
	ThumbnailUpdated,
	Cleared,
}

/// Keeps the selected media session converged with the host.
///
/// Cloning is cheap; clones share state. Background work (refresh timer,
/// event consumer, polls, thumbnail fetches) stops on [`shutdown`](Self::shutdown)
/// or when the last clone is dropped.
#[derive(Clone)]
pub struct MediaReconciler {
	inner: Arc<Inner>,
}

struct Inner {
	controller: Controller,
	config: ReconcilerConfig,
	view: Mutex<MediaView>,
	snapshot_tx: watch::Sender<Option<Arc<MediaInfo>>>,
	refresh_task: Mutex<Option<ScheduledTask>>,
	event_task: Mutex<Option<ScheduledTask>>,
	poll_task: Mutex<Option<ScheduledTask>>,
	thumbnail_tasks: Mutex<Vec<ScheduledTask>>,
	subscriptions: Mutex<Vec<Subscription>>,
	started: AtomicBool,
	stopped: AtomicBool,
}

impl MediaReconciler {
	pub fn new(controller: Controller, config: ReconcilerConfig) -> Self {
		let (snapshot_tx, _) = watch::channel(None);
		Self {
			inner: Arc::new(Inner {
				controller,
				config,
				view: Mutex::new(MediaView::new()),
				snapshot_tx,
				refresh_task: Mutex::new(None),
				event_task: Mutex::new(None),
				poll_task: Mutex::new(None),
				thumbnail_tasks: Mutex::new(Vec::new()),
				subscriptions: Mutex::new(Vec::new()),
				started: AtomicBool::new(false),
				stopped: AtomicBool::new(false),
			}),
		}
	}

	/// Subscribes to push events, runs the first list fetch and arms the
	/// refresh timer.
	///
	/// The timer keeps running when the first fetch fails; its error is
	/// returned for reporting. Calling `start` twice, or after
	/// [`shutdown`](Self::shutdown), does nothing.
	pub async fn start(&self) -> Result<()> {
		let inner = &self.inner;
		if inner.stopped.load(Ordering::SeqCst) || inner.started.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		inner.subscribe_events();
		let first = inner.refresh().await;

		let weak = Arc::downgrade(inner);
		let task = ScheduledTask::every("media-refresh", inner.config.refresh_interval, move || {
			let weak = Weak::clone(&weak);
			async move {
				if let Some(inner) = weak.upgrade() {
					let _ = inner.refresh().await;
				}
			}
		});
		*inner.refresh_task.lock() = Some(task);

		tracing::debug!(interval_ms = inner.config.refresh_interval.as_millis() as u64, "Media reconciler started");
		first
	}

	/// Fetches the full session list and reconciles against it.
	pub async fn refresh(&self) -> Result<()> {
		self.inner.refresh().await
	}

	/// Selected session snapshot.
	pub fn snapshot(&self) -> Option<Arc<MediaInfo>> {
		self.inner.view.lock().snapshot().cloned()
	}

	/// Sessions from the last successful list fetch.
	pub fn sessions(&self) -> Vec<MediaInfo> {
		self.inner.view.lock().sessions().to_vec()
	}

	pub fn selected_session_id(&self) -> Option<String> {
		self.inner.view.lock().selected_id().map(str::to_string)
	}

	/// Receiver that observes every snapshot change.
	pub fn watch(&self) -> watch::Receiver<Option<Arc<MediaInfo>>> {
		self.inner.snapshot_tx.subscribe()
	}

	pub fn controller(&self) -> &Controller {
		&self.inner.controller
	}

	/// Selects a known session. Returns false if `session_id` is not in the
	/// current list.
	pub fn select(&self, session_id: &str) -> bool {
		let plan = self.inner.view.lock().select(session_id);
		match plan {
			Some(plan) => {
				tracing::debug!(session = session_id, "Selected media session");
				self.inner.publish();
				self.inner.run_plan(plan);
				true
			}
			None => false,
		}
	}

	/// Toggles playback on the selected session, then polls for the new state.
	pub async fn play_pause(&self) -> Result<()> {
		let target = self.selected_session_id();
		self.inner.controller.media_play_pause(target.as_deref()).await?;
		self.inner.start_poll();
		Ok(())
	}

	pub async fn next(&self) -> Result<()> {
		self.skip(SkipDirection::Next).await
	}

	pub async fn previous(&self) -> Result<()> {
		self.skip(SkipDirection::Previous).await
	}

	/// Skips in `direction`, first moving the selection to a capable session
	/// when the selected one cannot skip that way.
	pub async fn skip(&self, direction: SkipDirection) -> Result<()> {
		let skip = self.inner.view.lock().plan_skip(direction);
		if skip.switched {
			self.inner.publish();
		}
		self.inner.run_plan(skip.plan);

		self.inner
			.controller
			.media_skip(direction, skip.target.as_deref())
			.await?;
		self.inner.start_poll();
		Ok(())
	}

	/// Returns true while a bounded poll is running.
	pub fn is_polling(&self) -> bool {
		self.inner
			.poll_task
			.lock()
			.as_ref()
			.is_some_and(|task| !task.is_finished())
	}

	/// Stops every timer, poll, fetch and subscription. Idempotent.
	pub fn shutdown(&self) {
		self.inner.shutdown();
	}
}

impl std::fmt::Debug for MediaReconciler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let view = self.inner.view.lock();
		f.debug_struct("MediaReconciler")
			.field("selected", &view.selected_id())
			.field("sessions", &view.sessions().len())
			.field("stopped", &self.inner.stopped.load(Ordering::SeqCst))
			.finish()
	}
}

impl Inner {
	fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::SeqCst)
	}

	async fn refresh(self: &Arc<Self>) -> Result<()> {
		match self.controller.get_all_media_sessions().await {
			Ok(list) => {
				let outcome = self.view.lock().apply_list(list);
				if outcome.list_changed {
					tracing::debug!(reanchored = outcome.reanchored, "Media session list changed");
				}
				self.publish();
				self.run_plan(outcome.plan);
				Ok(())
			}
			Err(e) => {
				tracing::warn!(error = %e, "Media session refresh failed");
				self.view.lock().on_list_error();
				self.publish();
				Err(e)
			}
		}
	}

	/// Pushes the current snapshot to watchers if its `Arc` changed.
	fn publish(&self) {
		let current = self.view.lock().snapshot().cloned();
		self.snapshot_tx.send_if_modified(|published| {
			let same = match (published.as_ref(), current.as_ref()) {
				(None, None) => true,
				(Some(a), Some(b)) => Arc::ptr_eq(a, b),
				_ => false,
			};
			if !same {
				*published = current;
			}
			!same
		});
	}

	fn run_plan(self: &Arc<Self>, plan: Plan) {
		if let Some(session_id) = plan.fetch_thumbnail {
			self.spawn_thumbnail_fetch(session_id);
		}
	}

	/// Fetches a thumbnail in the background.
	///
	/// Fetches are never cancelled individually: replies are matched by kind,
	/// so an abandoned request would hand its reply to the next one.
	fn spawn_thumbnail_fetch(self: &Arc<Self>, session_id: String) {
		if self.is_stopped() {
			return;
		}

		let weak = Arc::downgrade(self);
		let controller = self.controller.clone();
		let task = ScheduledTask::spawn("media-thumbnail", async move {
			let result = controller.get_media_thumbnail(Some(&session_id)).await;
			let Some(inner) = weak.upgrade() else {
				return;
			};
			match result {
				Ok(Some(thumbnail)) => {
					let applied = inner.view.lock().apply_thumbnail(&session_id, thumbnail);
					if applied {
						inner.publish();
					}
				}
				Ok(None) => tracing::debug!(session = %session_id, "No thumbnail available"),
				Err(e) => tracing::debug!(session = %session_id, error = %e, "Thumbnail fetch failed"),
			}
		});

		let mut tasks = self.thumbnail_tasks.lock();
		tasks.retain(|task| !task.is_finished());
		tasks.push(task);
	}

	/// Starts a bounded poll, replacing any poll already running.
	fn start_poll(self: &Arc<Self>) {
		if self.is_stopped() {
			return;
		}

		let weak = Arc::downgrade(self);
		let config = self.config.clone();
		let task = ScheduledTask::spawn("media-poll", async move {
			tokio::time::sleep(config.poll_delay).await;

			for attempt in 1..=config.poll_attempts {
				tokio::time::sleep(config.poll_interval).await;
				let Some(inner) = weak.upgrade() else {
					return;
				};

				let list = match inner.controller.get_all_media_sessions().await {
					Ok(list) => list,
					Err(e) => {
						tracing::debug!(attempt, error = %e, "Media poll fetch failed");
						continue;
					}
				};

				let settled = inner.view.lock().apply_poll(list);
				if let Some(plan) = settled {
					tracing::debug!(attempt, "Media poll settled");
					inner.publish();
					inner.run_plan(plan);
					return;
				}
			}

			tracing::debug!(attempts = config.poll_attempts, "Media poll exhausted");
		});

		let previous = self.poll_task.lock().replace(task);
		if let Some(previous) = previous {
			previous.cancel();
		}
	}

	fn subscribe_events(self: &Arc<Self>) {
		let (tx, mut rx) = mpsc::unbounded_channel();

		let info_tx = tx.clone();
		let thumbnail_tx = tx.clone();
		let subscriptions = vec![
			self.controller.on_media_info_updated(move |info| {
				let _ = info_tx.send(MediaEvent::InfoUpdated(info));
			}),
			self.controller.on_media_thumbnail_updated(move |_| {
				let _ = thumbnail_tx.send(MediaEvent::ThumbnailUpdated);
			}),
			self.controller.on_media_info_cleared(move || {
				let _ = tx.send(MediaEvent::Cleared);
			}),
		];
		*self.subscriptions.lock() = subscriptions;

		let weak = Arc::downgrade(self);
		let task = ScheduledTask::spawn("media-events", async move {
			while let Some(event) = rx.recv().await {
				let Some(inner) = weak.upgrade() else {
					break;
				};
				inner.handle_event(event).await;
			}
		});
		*self.event_task.lock() = Some(task);
	}

	async fn handle_event(self: &Arc<Self>, event: MediaEvent) {
		tracing::trace!(?event, "Media push event");
		match event {
			MediaEvent::InfoUpdated(info) => {
				let plan = self.view.lock().apply_push_info(info);
				self.publish();
				self.run_plan(plan);
			}
			MediaEvent::ThumbnailUpdated => {
				let _ = self.refresh().await;
			}
			MediaEvent::Cleared => {
				self.view.lock().clear_snapshot();
				self.publish();
			}
		}
	}

	fn shutdown(&self) {
		if self.stopped.swap(true, Ordering::SeqCst) {
			return;
		}

		self.subscriptions.lock().clear();
		for slot in [&self.refresh_task, &self.event_task, &self.poll_task] {
			let task = slot.lock().take();
			if let Some(task) = task {
				task.cancel();
			}
		}
		let fetches: Vec<ScheduledTask> = self.thumbnail_tasks.lock().drain(..).collect();
		for task in fetches {
			task.cancel();
		}
		tracing::debug!("Media reconciler stopped");
	}
}
