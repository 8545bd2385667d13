//! Store Module - in-memory resource records
//!
//! The reference collaborator for the bus: resource handlers mutate records
//! here, then call `emit_change`, and `sync_changes` pulls full-state
//! snapshots back out through the `SnapshotProvider` seam.

mod records;

pub use records::ResourceStore;
