//! Parses catalog bytes into a format-agnostic [`Catalog`].
//!
//! Two wire formats are recognized:
//! - **standard**: `{"tracks": [{"trackName": ..., "type": ..., "priority": ...}, ...]}`
//! - **HANG**: `{"<kind>": {"priority": ..., "renditions": {"<trackName>": {...}}}, ...}`, e.g.
//!   `{"video": {"priority": 2, "renditions": {"720p": {...}}}}`
//!
//! A document is treated as standard format if its top-level object has a `tracks` key whose
//! value is a JSON array; otherwise every top-level key is treated as a HANG media kind.
use std::collections::HashMap;

use serde::Deserialize;

use crate::model::{AvailableTrack, Catalog};
use crate::Error;

/// Parse catalog bytes, auto-detecting the wire format.
pub fn parse(bytes: &[u8]) -> Result<Catalog, Error> {
	let value: serde_json::Value = serde_json::from_slice(bytes)?;

	match value.get("tracks").and_then(|v| v.as_array()) {
		Some(_) => parse_standard(value),
		None => parse_hang(value),
	}
}

/// Serialize a catalog in the standard format. This crate always publishes standard-format
/// catalogs; HANG format is only accepted when consuming a peer's catalog.
pub fn serialize(catalog: &Catalog) -> Vec<u8> {
	#[derive(serde::Serialize)]
	struct Entry<'a> {
		#[serde(rename = "trackName")]
		track_name: &'a str,
		#[serde(rename = "type")]
		kind: &'a str,
		priority: u8,
	}

	let mut tracks: Vec<_> = catalog
		.tracks
		.values()
		.map(|t| Entry {
			track_name: &t.name,
			kind: &t.kind,
			priority: t.priority,
		})
		.collect();
	tracks.sort_by(|a, b| a.track_name.cmp(b.track_name));

	serde_json::to_vec(&serde_json::json!({ "tracks": tracks })).expect("catalog serializes to valid json")
}

#[derive(Deserialize)]
struct StandardCatalog {
	tracks: Vec<StandardEntry>,
}

#[derive(Deserialize)]
struct StandardEntry {
	#[serde(rename = "trackName")]
	track_name: Option<String>,
	#[serde(rename = "type")]
	kind: Option<String>,
	priority: Option<u8>,
}

fn parse_standard(value: serde_json::Value) -> Result<Catalog, Error> {
	let parsed: StandardCatalog = serde_json::from_value(value)?;

	let tracks = parsed
		.tracks
		.into_iter()
		.filter_map(|entry| match (entry.track_name, entry.kind, entry.priority) {
			(Some(name), Some(kind), Some(priority)) => Some(AvailableTrack { name, kind, priority }),
			_ => {
				tracing::warn!("skipping standard catalog entry missing trackName/type/priority");
				None
			}
		})
		.collect();

	Ok(tracks)
}

#[derive(Deserialize)]
struct HangEntry {
	#[serde(default)]
	priority: u8,
	#[serde(default)]
	renditions: HashMap<String, serde_json::Value>,
}

fn parse_hang(value: serde_json::Value) -> Result<Catalog, Error> {
	let kinds: HashMap<String, HangEntry> = serde_json::from_value(value)?;

	let mut tracks = Vec::new();
	for (kind, entry) in kinds {
		if entry.renditions.is_empty() {
			// No explicit renditions: the kind name itself is the only track on offer.
			tracks.push(AvailableTrack {
				name: kind.clone(),
				kind,
				priority: 1,
			});
			continue;
		}

		for name in entry.renditions.into_keys() {
			tracks.push(AvailableTrack {
				name,
				kind: kind.clone(),
				priority: entry.priority,
			});
		}
	}

	Ok(tracks.into_iter().collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn standard_format_parses() {
		let json = br#"{"tracks":[{"trackName":"video","type":"video","priority":2},{"trackName":"audio","type":"audio","priority":1}]}"#;
		let catalog = parse(json).unwrap();
		assert_eq!(catalog.len(), 2);
		assert_eq!(catalog.get("video").unwrap().priority, 2);
	}

	#[test]
	fn standard_format_skips_incomplete_entries() {
		let json = br#"{"tracks":[{"trackName":"video"},{"trackName":"audio","type":"audio","priority":1}]}"#;
		let catalog = parse(json).unwrap();
		assert_eq!(catalog.len(), 1);
		assert!(catalog.get("audio").is_some());
	}

	#[test]
	fn hang_format_with_renditions() {
		let json = br#"{"video":{"priority":2,"renditions":{"720p":{"codec":"avc1"},"1080p":{"codec":"avc1"}}}}"#;
		let catalog = parse(json).unwrap();
		assert_eq!(catalog.len(), 2);
		assert_eq!(catalog.get("720p").unwrap().kind, "video");
		assert_eq!(catalog.get("720p").unwrap().priority, 2);
	}

	#[test]
	fn hang_format_without_renditions_falls_back_to_kind() {
		let json = br#"{"audio":{}}"#;
		let catalog = parse(json).unwrap();
		assert_eq!(catalog.len(), 1);
		let track = catalog.get("audio").unwrap();
		assert_eq!(track.kind, "audio");
		assert_eq!(track.priority, 1);
	}
}
