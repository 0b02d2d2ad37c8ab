//! Pure reconciliation state: known sessions, selection and snapshot.
//!
//! Every operation mutates the view synchronously and returns a [`Plan`]
//! describing the follow-up I/O (a thumbnail fetch). The async driver in the
//! parent module executes plans; nothing here awaits.

use std::sync::Arc;

use eazy_protocol::{MediaInfo, SkipDirection};

/// Marker of the last thumbnail fetch: session plus the display metadata it
/// was issued for. A fetch is skipped only when the marker is identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailTag {
	pub session_id: String,
	pub title: String,
	pub artist: String,
	pub album: String,
}

impl ThumbnailTag {
	pub fn of(info: &MediaInfo) -> Self {
		Self {
			session_id: info.session_id.clone(),
			title: info.title.clone(),
			artist: info.artist.clone(),
			album: info.album.clone(),
		}
	}
}

/// Follow-up work produced by a view transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Plan {
	/// Session whose thumbnail should be fetched.
	pub fetch_thumbnail: Option<String>,
}

impl Plan {
	pub fn none() -> Self {
		Self::default()
	}

	fn fetch(session_id: Option<String>) -> Self {
		Self {
			fetch_thumbnail: session_id,
		}
	}
}

/// Outcome of applying a full session list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ListOutcome {
	/// Session identity (id, app) differs from the previous list.
	pub list_changed: bool,
	/// Selection moved to a different session.
	pub reanchored: bool,
	pub plan: Plan,
}

/// Target chosen for a next/previous command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct SkipPlan {
	/// Session to address. `None` lets the host pick its current session.
	pub target: Option<String>,
	/// Selection was moved to a session that supports the direction.
	pub switched: bool,
	pub plan: Plan,
}

/// Converged view of the host's media sessions.
#[derive(Debug, Clone, Default)]
pub struct MediaView {
	sessions: Vec<MediaInfo>,
	selected_id: Option<String>,
	snapshot: Option<Arc<MediaInfo>>,
	thumbnail_tag: Option<ThumbnailTag>,
	list_signature: Option<Vec<(String, String)>>,
}

impl MediaView {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sessions(&self) -> &[MediaInfo] {
		&self.sessions
	}

	pub fn selected_id(&self) -> Option<&str> {
		self.selected_id.as_deref()
	}

	/// Last known state of the selected session.
	pub fn snapshot(&self) -> Option<&Arc<MediaInfo>> {
		self.snapshot.as_ref()
	}

	pub fn thumbnail_tag(&self) -> Option<&ThumbnailTag> {
		self.thumbnail_tag.as_ref()
	}

	fn find(&self, session_id: &str) -> Option<&MediaInfo> {
		self.sessions.iter().find(|s| s.session_id == session_id)
	}

	/// Reconciles against a freshly fetched full session list.
	pub fn apply_list(&mut self, list: Vec<MediaInfo>) -> ListOutcome {
		let signature: Vec<(String, String)> = list
			.iter()
			.map(|s| (s.session_id.clone(), s.app_name.clone()))
			.collect();
		let list_changed = self.list_signature.as_ref() != Some(&signature);
		self.list_signature = Some(signature);
		self.sessions = list;

		let Some(selected_id) = self.selected_id.clone() else {
			let plan = match self.sessions.first().cloned() {
				Some(first) => self.adopt(first),
				None => Plan::none(),
			};
			return ListOutcome {
				list_changed,
				reanchored: plan.fetch_thumbnail.is_some() || self.selected_id.is_some(),
				plan,
			};
		};

		match self.find(&selected_id).cloned() {
			Some(entry) => ListOutcome {
				list_changed,
				reanchored: false,
				plan: self.merge_selected(entry),
			},
			None => {
				let plan = match self.sessions.first().cloned() {
					Some(first) => {
						tracing::debug!(from = %selected_id, to = %first.session_id, "Selected session vanished, re-anchoring");
						self.adopt(first)
					}
					None => {
						tracing::debug!(from = %selected_id, "Selected session vanished, list empty");
						self.selected_id = None;
						self.snapshot = None;
						self.thumbnail_tag = None;
						Plan::none()
					}
				};
				ListOutcome {
					list_changed,
					reanchored: true,
					plan,
				}
			}
		}
	}

	/// A list fetch failed: forget sessions and snapshot, keep the selected id.
	pub fn on_list_error(&mut self) {
		self.sessions.clear();
		self.snapshot = None;
		self.list_signature = None;
		self.thumbnail_tag = None;
	}

	/// Applies a fetched thumbnail if it still targets the selected snapshot.
	pub fn apply_thumbnail(&mut self, session_id: &str, thumbnail: String) -> bool {
		let Some(current) = self.snapshot.as_ref() else {
			return false;
		};
		if current.session_id != session_id {
			tracing::debug!(target_session = session_id, current = %current.session_id, "Dropping stale thumbnail");
			return false;
		}
		if current.thumbnail.as_deref() == Some(thumbnail.as_str()) {
			return true;
		}

		let mut next = MediaInfo::clone(current);
		next.thumbnail = Some(thumbnail);
		self.snapshot = Some(Arc::new(next));
		true
	}

	/// `media_info_updated` push: refresh the known entry and, when it is the
	/// selected session, the snapshot.
	pub fn apply_push_info(&mut self, info: MediaInfo) -> Plan {
		if let Some(slot) = self.sessions.iter_mut().find(|s| s.session_id == info.session_id) {
			*slot = info.clone();
		}

		if self.selected_id.as_deref() == Some(info.session_id.as_str()) {
			self.merge_selected(info)
		} else {
			Plan::none()
		}
	}

	/// `media_info_cleared` push. The selected id survives.
	pub fn clear_snapshot(&mut self) {
		self.snapshot = None;
		self.thumbnail_tag = None;
	}

	/// User selection. Returns `None` for an unknown session. Always
	/// refetches the thumbnail, even when `session_id` is already selected.
	pub fn select(&mut self, session_id: &str) -> Option<Plan> {
		let entry = self.find(session_id)?.clone();
		self.thumbnail_tag = None;
		Some(self.adopt(entry))
	}

	/// Picks the session a next/previous command should address, moving the
	/// selection when the current one cannot go in `direction`.
	pub fn plan_skip(&mut self, direction: SkipDirection) -> SkipPlan {
		let Some(selected_id) = self.selected_id.clone() else {
			return SkipPlan {
				target: None,
				switched: false,
				plan: Plan::none(),
			};
		};

		let capable = match (&self.snapshot, self.find(&selected_id)) {
			(Some(snapshot), _) if snapshot.session_id == selected_id => snapshot.can_skip(direction),
			(_, Some(entry)) => entry.can_skip(direction),
			_ => true,
		};

		if !capable && self.sessions.len() > 1 {
			let fallback = self
				.sessions
				.iter()
				.find(|s| s.session_id != selected_id && s.can_skip(direction))
				.cloned();
			if let Some(fallback) = fallback {
				tracing::debug!(from = %selected_id, to = %fallback.session_id, ?direction, "Switching to a session that can skip");
				let target = fallback.session_id.clone();
				let plan = self.adopt(fallback);
				return SkipPlan {
					target: Some(target),
					switched: true,
					plan,
				};
			}
		}

		SkipPlan {
			target: Some(selected_id),
			switched: false,
			plan: Plan::none(),
		}
	}

	/// One bounded-poll pass. Returns the plan once the selected session shows
	/// metadata, `None` to keep polling.
	pub fn apply_poll(&mut self, list: Vec<MediaInfo>) -> Option<Plan> {
		let selected_id = self.selected_id.clone()?;
		let entry = list
			.iter()
			.find(|s| s.session_id == selected_id && s.has_metadata())
			.cloned()?;

		self.list_signature = Some(
			list.iter()
				.map(|s| (s.session_id.clone(), s.app_name.clone()))
				.collect(),
		);
		self.sessions = list;

		let changed = self
			.snapshot
			.as_ref()
			.is_none_or(|prev| prev.tracked_differs(&entry));
		if changed {
			self.replace_snapshot(entry.clone());
		}
		Some(Plan::fetch(self.request_thumbnail(&entry)))
	}

	/// Selects `entry` outright and requests its thumbnail. Re-adopting the
	/// snapshot's own session keeps its cover until the fetch lands.
	fn adopt(&mut self, mut entry: MediaInfo) -> Plan {
		self.selected_id = Some(entry.session_id.clone());
		let plan = Plan::fetch(self.request_thumbnail(&entry));
		if entry.thumbnail.is_none() {
			entry.thumbnail = self
				.snapshot
				.as_ref()
				.filter(|prev| prev.session_id == entry.session_id)
				.and_then(|prev| prev.thumbnail.clone());
		}
		self.snapshot = Some(Arc::new(entry));
		plan
	}

	/// Folds a fresh entry for the selected session into the snapshot.
	fn merge_selected(&mut self, entry: MediaInfo) -> Plan {
		let Some(prev) = self.snapshot.clone() else {
			let fetch = if entry.has_metadata() {
				self.request_thumbnail(&entry)
			} else {
				None
			};
			self.snapshot = Some(Arc::new(entry));
			return Plan::fetch(fetch);
		};

		if !prev.tracked_differs(&entry) {
			return Plan::none();
		}

		let fetch = if prev.display_differs(&entry) {
			self.request_thumbnail(&entry)
		} else {
			None
		};
		self.replace_snapshot(entry);
		Plan::fetch(fetch)
	}

	/// Swaps in `entry`, carrying the previous thumbnail over when the entry
	/// has none.
	fn replace_snapshot(&mut self, mut entry: MediaInfo) {
		if entry.thumbnail.is_none() {
			entry.thumbnail = self.snapshot.as_ref().and_then(|prev| prev.thumbnail.clone());
		}
		self.snapshot = Some(Arc::new(entry));
	}

	fn request_thumbnail(&mut self, entry: &MediaInfo) -> Option<String> {
		let tag = ThumbnailTag::of(entry);
		if self.thumbnail_tag.as_ref() == Some(&tag) {
			return None;
		}
		self.thumbnail_tag = Some(tag);
		Some(entry.session_id.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn media(id: &str, title: &str) -> MediaInfo {
		MediaInfo {
			session_id: id.into(),
			app_name: format!("{id}-app"),
			title: title.into(),
			artist: "Artist".into(),
			album: String::new(),
			is_playing: true,
			thumbnail: None,
			can_go_next: true,
			can_go_previous: true,
		}
	}

	fn fetch(id: &str) -> Plan {
		Plan {
			fetch_thumbnail: Some(id.into()),
		}
	}

	#[test]
	fn test_first_list_selects_head() {
		let mut view = MediaView::new();
		let outcome = view.apply_list(vec![media("A", "One"), media("B", "Two")]);

		assert!(outcome.list_changed);
		assert_eq!(outcome.plan, fetch("A"));
		assert_eq!(view.selected_id(), Some("A"));
		assert_eq!(view.snapshot().unwrap().title, "One");
	}

	#[test]
	fn test_unchanged_list_keeps_same_arc() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One")]);
		let before = Arc::clone(view.snapshot().unwrap());

		let outcome = view.apply_list(vec![media("A", "One")]);
		assert!(!outcome.list_changed);
		assert_eq!(outcome.plan, Plan::none());
		assert!(Arc::ptr_eq(&before, view.snapshot().unwrap()));
	}

	#[test]
	fn test_title_change_fetches_and_keeps_thumbnail() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One")]);
		assert!(view.apply_thumbnail("A", "T1".into()));

		let outcome = view.apply_list(vec![media("A", "Two")]);
		assert_eq!(outcome.plan, fetch("A"));
		let snapshot = view.snapshot().unwrap();
		assert_eq!(snapshot.title, "Two");
		assert_eq!(snapshot.thumbnail.as_deref(), Some("T1"));
	}

	#[test]
	fn test_flag_change_updates_without_fetch() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One")]);
		let before = Arc::clone(view.snapshot().unwrap());

		let mut paused = media("A", "One");
		paused.is_playing = false;
		let outcome = view.apply_list(vec![paused]);

		assert_eq!(outcome.plan, Plan::none());
		assert!(!outcome.list_changed);
		assert!(!Arc::ptr_eq(&before, view.snapshot().unwrap()));
		assert!(!view.snapshot().unwrap().is_playing);
	}

	#[test]
	fn test_vanished_selection_reanchors() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);

		let outcome = view.apply_list(vec![media("B", "Two")]);
		assert!(outcome.reanchored);
		assert!(outcome.list_changed);
		assert_eq!(outcome.plan, fetch("B"));
		assert_eq!(view.selected_id(), Some("B"));
		assert_eq!(view.snapshot().unwrap().session_id, "B");
	}

	#[test]
	fn test_empty_list_clears_selection() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One")]);

		let outcome = view.apply_list(Vec::new());
		assert!(outcome.reanchored);
		assert_eq!(view.selected_id(), None);
		assert!(view.snapshot().is_none());
	}

	#[test]
	fn test_list_error_keeps_selected_id() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		view.on_list_error();

		assert!(view.sessions().is_empty());
		assert!(view.snapshot().is_none());
		assert!(view.thumbnail_tag().is_none());
		assert_eq!(view.selected_id(), Some("A"));

		// Next successful pass re-adopts the same session with a fresh fetch.
		let outcome = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		assert!(outcome.list_changed);
		assert_eq!(outcome.plan, fetch("A"));
		assert_eq!(view.snapshot().unwrap().session_id, "A");
	}

	#[test]
	fn test_reselecting_current_session_refetches_and_keeps_thumbnail() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		assert!(view.apply_thumbnail("A", "T1".into()));

		assert_eq!(view.select("A"), Some(fetch("A")));
		assert_eq!(view.snapshot().unwrap().thumbnail.as_deref(), Some("T1"));

		let outcome = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		assert_eq!(outcome.plan, Plan::none());
		assert_eq!(view.snapshot().unwrap().thumbnail.as_deref(), Some("T1"));

		assert!(view.apply_thumbnail("A", "T2".into()));
		assert_eq!(view.snapshot().unwrap().thumbnail.as_deref(), Some("T2"));
	}

	#[test]
	fn test_selecting_other_session_drops_previous_thumbnail() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		assert!(view.apply_thumbnail("A", "T1".into()));

		assert_eq!(view.select("B"), Some(fetch("B")));
		assert!(view.snapshot().unwrap().thumbnail.is_none());
		assert_eq!(view.select("C"), None);
	}

	#[test]
	fn test_stale_thumbnail_is_dropped() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);
		let _ = view.select("B").unwrap();

		assert!(!view.apply_thumbnail("A", "late".into()));
		assert!(view.snapshot().unwrap().thumbnail.is_none());
		assert!(view.apply_thumbnail("B", "fresh".into()));
		assert_eq!(view.snapshot().unwrap().thumbnail.as_deref(), Some("fresh"));
	}

	#[test]
	fn test_duplicate_thumbnail_request_suppressed() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);

		assert_eq!(view.select("A"), Some(Plan::none()));
		assert_eq!(view.select("B"), Some(fetch("B")));
		assert_eq!(view.select("A"), Some(fetch("A")));
		assert_eq!(view.select("missing"), None);
	}

	#[test]
	fn test_skip_falls_back_to_capable_session() {
		let mut view = MediaView::new();
		let mut stuck = media("A", "One");
		stuck.can_go_next = false;
		let _ = view.apply_list(vec![stuck, media("B", "Two")]);

		let skip = view.plan_skip(SkipDirection::Next);
		assert_eq!(skip.target.as_deref(), Some("B"));
		assert!(skip.switched);
		assert_eq!(skip.plan, fetch("B"));
		assert_eq!(view.selected_id(), Some("B"));

		let skip = view.plan_skip(SkipDirection::Previous);
		assert_eq!(skip.target.as_deref(), Some("B"));
		assert!(!skip.switched);
	}

	#[test]
	fn test_skip_without_alternative_stays() {
		let mut view = MediaView::new();
		let mut stuck = media("A", "One");
		stuck.can_go_next = false;
		let _ = view.apply_list(vec![stuck]);

		let skip = view.plan_skip(SkipDirection::Next);
		assert_eq!(skip.target.as_deref(), Some("A"));
		assert!(!skip.switched);

		let mut empty = MediaView::new();
		assert_eq!(empty.plan_skip(SkipDirection::Next).target, None);
	}

	#[test]
	fn test_push_info_updates_entry_and_snapshot() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One"), media("B", "Two")]);

		assert_eq!(view.apply_push_info(media("B", "Three")), Plan::none());
		assert_eq!(view.sessions()[1].title, "Three");
		assert_eq!(view.snapshot().unwrap().title, "One");

		assert_eq!(view.apply_push_info(media("A", "Four")), fetch("A"));
		assert_eq!(view.snapshot().unwrap().title, "Four");
	}

	#[test]
	fn test_cleared_snapshot_readopted_on_next_list() {
		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "One")]);
		view.clear_snapshot();
		assert!(view.snapshot().is_none());
		assert_eq!(view.selected_id(), Some("A"));

		let outcome = view.apply_list(vec![media("A", "One")]);
		assert_eq!(outcome.plan, fetch("A"));
		assert_eq!(view.snapshot().unwrap().title, "One");

		let mut view = MediaView::new();
		let _ = view.apply_list(vec![media("A", "")]);
		view.clear_snapshot();
		let mut bare = media("A", "");
		bare.artist.clear();
		let outcome = view.apply_list(vec![bare]);
		assert_eq!(outcome.plan, Plan::none());
		assert!(view.snapshot().is_some());
	}

	#[test]
	fn test_poll_waits_for_metadata() {
		let mut view = MediaView::new();
		let mut bare = media("A", "");
		bare.artist.clear();
		let _ = view.apply_list(vec![bare.clone()]);
		assert!(view.apply_thumbnail("A", "T0".into()));

		assert_eq!(view.apply_poll(vec![bare]), None);

		let plan = view.apply_poll(vec![media("A", "Loaded")]).unwrap();
		assert_eq!(plan, fetch("A"));
		let snapshot = view.snapshot().unwrap();
		assert_eq!(snapshot.title, "Loaded");
		assert_eq!(snapshot.thumbnail.as_deref(), Some("T0"));
	}
}
