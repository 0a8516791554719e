//! The event catalogue (§3, §4.1 of the design).
//!
//! Immutable, process-wide, sorted sequence of [`Event`] records built
//! once at startup from a [`CatalogueLoader`]. Shared read-only data
//! allows arbitrary concurrent readers with no locking — every
//! [`Catalogue`] method takes `&self`.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{CatalogueError, CatalogueResult};

/// A single timestamped market event.
///
/// `id` is assigned by [`Catalogue::load`] in catalogue order (1-based)
/// and is therefore dense and monotonic with position — callers must
/// not assume any relationship between `id` and the source row order
/// beyond "matches catalogue order after the timestamp sort".
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Monotonically increasing positive integer, unique within the catalogue.
    pub id: u64,
    /// Integer milliseconds on the synthetic market timeline.
    pub timestamp_millis: i64,
    /// Opaque domain payload (symbol, price, size, ...), preserved bit-stable.
    pub payload: serde_json::Value,
}

/// Wire form: `{"id": <int>, "timestamp": <int-millis>, ...domain fields}`
/// (spec §6's stable event schema) — `payload`'s keys are merged into the
/// envelope rather than nested, so the domain fields ride alongside `id`
/// and `timestamp` at the top level. Fails (via `ser::Error`) if `payload`
/// is not a JSON object, since there is nowhere to merge non-object fields.
impl Serialize for Event {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let payload = self.payload.as_object().ok_or_else(|| {
            serde::ser::Error::custom("event payload must be a JSON object to flatten")
        })?;

        let mut map = serializer.serialize_map(Some(2 + payload.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("timestamp", &self.timestamp_millis)?;
        for (key, value) in payload {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A single raw row produced by a [`CatalogueLoader`], prior to id assignment.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub timestamp_millis: i64,
    pub payload: serde_json::Value,
}

/// Source of catalogue rows, consumed exactly once by [`Catalogue::load`].
///
/// File/tabular parsing (BOM handling, field decoding) is deliberately
/// kept out of this crate — implementations of this trait live at the
/// transport layer (e.g. a CSV-backed loader).
pub trait CatalogueLoader {
    /// Returns the next row, or `None` when the source is exhausted.
    fn next_row(&mut self) -> Option<CatalogueResult<RawRow>>;
}

/// Immutable, sorted, process-wide sequence of events.
///
/// Built exactly once via [`Catalogue::load`]; never mutated afterward.
#[derive(Debug)]
pub struct Catalogue {
    events: Vec<Event>,
}

impl Catalogue {
    /// Materialize a catalogue from a loader.
    ///
    /// Rows are collected, stably sorted by `timestamp_millis` ascending
    /// (stability preserves source order as the tiebreak), then assigned
    /// `id = 1..=N` in that order. Fails with [`CatalogueError::Empty`]
    /// if the loader produces no rows, or propagates the loader's error.
    pub fn load(loader: &mut dyn CatalogueLoader) -> CatalogueResult<Self> {
        let mut rows = Vec::new();
        while let Some(row) = loader.next_row() {
            rows.push(row?);
        }

        if rows.is_empty() {
            return Err(CatalogueError::Empty);
        }

        rows.sort_by_key(|r| r.timestamp_millis);

        let events = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| Event {
                id: i as u64 + 1,
                timestamp_millis: row.timestamp_millis,
                payload: row.payload,
            })
            .collect::<Vec<_>>();

        tracing::info!(count = events.len(), "catalogue loaded");

        Ok(Catalogue { events })
    }

    /// Number of events in the catalogue.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalogue holds no events. Never true for a successfully
    /// [`load`](Self::load)ed catalogue.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at position `i` (0-based). Panics if out of bounds — callers
    /// are expected to respect `0 <= i < len()`, matching the cursor
    /// invariant maintained by [`crate::session::Session`].
    pub fn at(&self, i: usize) -> &Event {
        &self.events[i]
    }

    /// Timestamp of the first event.
    pub fn first_timestamp(&self) -> i64 {
        self.events[0].timestamp_millis
    }

    /// Timestamp of the last event.
    pub fn last_timestamp(&self) -> i64 {
        self.events[self.events.len() - 1].timestamp_millis
    }

    /// First index `i` such that `at(i).timestamp_millis >= t`, or `len()`
    /// if every event is before `t`.
    pub fn lower_bound_by_timestamp(&self, t: i64) -> usize {
        self.events.partition_point(|e| e.timestamp_millis < t)
    }

    /// Position of the event with the given id.
    ///
    /// Ids are dense and assigned in catalogue order by [`load`](Self::load),
    /// so `id - 1` is the position directly; this is still validated
    /// against bounds and the stored id (rather than assumed) so the
    /// contract holds even if a future loader stops guaranteeing density.
    pub fn index_by_id(&self, id: u64) -> CatalogueResult<usize> {
        let idx = self
            .events
            .binary_search_by_key(&id, |e| e.id)
            .map_err(|_| CatalogueError::UnknownEvent(id))?;
        Ok(idx)
    }
}
