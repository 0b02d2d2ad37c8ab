//! Audio session filtering for list views.

use std::fmt;
use std::str::FromStr;

use eazy_protocol::AudioSession;
use serde::Serialize;

/// Bucket a session list is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SessionFilter {
	#[default]
	All,
	/// Audible: not muted and volume above zero.
	Active,
	/// Silent: muted or volume at zero.
	Muted,
}

impl SessionFilter {
	pub fn matches(self, session: &AudioSession) -> bool {
		match self {
			SessionFilter::All => true,
			SessionFilter::Active => is_audible(session),
			SessionFilter::Muted => !is_audible(session),
		}
	}
}

impl FromStr for SessionFilter {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"all" => Ok(SessionFilter::All),
			"active" => Ok(SessionFilter::Active),
			"muted" => Ok(SessionFilter::Muted),
			other => Err(format!("unknown filter '{other}' (expected all, active or muted)")),
		}
	}
}

impl fmt::Display for SessionFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionFilter::All => f.write_str("all"),
			SessionFilter::Active => f.write_str("active"),
			SessionFilter::Muted => f.write_str("muted"),
		}
	}
}

fn is_audible(session: &AudioSession) -> bool {
	!session.is_muted && session.volume > 0.0
}

/// Per-bucket session counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionCounts {
	pub all: usize,
	pub active: usize,
	pub muted: usize,
}

impl SessionCounts {
	pub fn of(sessions: &[AudioSession]) -> Self {
		let active = sessions.iter().filter(|s| is_audible(s)).count();
		Self {
			all: sessions.len(),
			active,
			muted: sessions.len() - active,
		}
	}
}

/// Sessions in `filter` whose name contains `query` (case-insensitive),
/// sorted by name case-insensitively.
pub fn filter_sessions<'a>(sessions: &'a [AudioSession], filter: SessionFilter, query: &str) -> Vec<&'a AudioSession> {
	let needle = query.to_lowercase();
	let mut matched: Vec<&AudioSession> = sessions
		.iter()
		.filter(|session| filter.matches(session))
		.filter(|session| session.name.to_lowercase().contains(&needle))
		.collect();
	matched.sort_by_cached_key(|session| session.name.to_lowercase());
	matched
}

/// Linear `0.0..=1.0` volume as a rounded percentage.
pub fn volume_percent(volume: f32) -> u8 {
	(volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Percentage back to linear volume.
pub fn volume_from_percent(percent: u8) -> f32 {
	f32::from(percent.min(100)) / 100.0
}
