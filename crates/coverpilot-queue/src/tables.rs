//! redb table definitions for the intent queue.
//!
//! Both tables use the client token (hyphenated UUID) as key and a
//! JSON-serialized record as value.

use redb::TableDefinition;

/// Live messages (queued, leased, or awaiting redelivery).
pub const INTENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("intents");

/// Messages that exhausted their deliveries or could not be parsed.
pub const DEAD_LETTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("dead_letters");
