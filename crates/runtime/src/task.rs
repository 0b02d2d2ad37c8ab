//! Cancellable background tasks.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

/// Handle to a spawned background task (refresh timers, pollers, link
/// supervisors).
///
/// [`cancel`](Self::cancel) is synchronous and idempotent; dropping the handle
/// cancels the task as well.
pub struct ScheduledTask {
	name: &'static str,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
	/// Spawns `fut` on the current tokio runtime.
	pub fn spawn<F>(name: &'static str, fut: F) -> Self
	where
		F: Future<Output = ()> + Send + 'static,
	{
		tracing::trace!(task = name, "Spawning task");
		Self {
			name,
			handle: Mutex::new(Some(tokio::spawn(fut))),
		}
	}

	/// Runs `tick` every `period`, first firing one `period` after spawning.
	pub fn every<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		Self::spawn(name, async move {
			let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				tick().await;
			}
		})
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Aborts the task. Returns true if this call performed the cancellation.
	pub fn cancel(&self) -> bool {
		match self.handle.lock().take() {
			Some(handle) => {
				handle.abort();
				tracing::trace!(task = self.name, "Cancelled task");
				true
			}
			None => false,
		}
	}

	/// Returns true once the task completed or was cancelled.
	pub fn is_finished(&self) -> bool {
		self.handle.lock().as_ref().is_none_or(JoinHandle::is_finished)
	}
}

impl Drop for ScheduledTask {
	fn drop(&mut self) {
		self.cancel();
	}
}

impl std::fmt::Debug for ScheduledTask {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScheduledTask")
			.field("name", &self.name)
			.field("finished", &self.is_finished())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[tokio::test(start_paused = true)]
	async fn test_every_ticks_until_cancelled() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&ticks);
		let task = ScheduledTask::every("refresh", Duration::from_secs(2), move || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		});

		tokio::time::sleep(Duration::from_millis(6_500)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 3);

		assert!(task.cancel());
		assert!(!task.cancel());
		tokio::time::sleep(Duration::from_secs(10)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 3);
		assert!(task.is_finished());
	}

	#[tokio::test(start_paused = true)]
	async fn test_drop_cancels() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&ticks);
		let task = ScheduledTask::every("poll", Duration::from_secs(1), move || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		});
		drop(task);

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 0);
	}
}
