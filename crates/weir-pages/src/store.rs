//! Request-scoped key/value store with two partitions.
//!
//! Every key lives in exactly one partition. New keys land in the server
//! partition; [`Store::transfer_to_client`] moves keys into the client
//! partition, whose entries are serialized into outbound client state.
//! Reads and writes go through one unified view regardless of partition.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Header carrying the client partition's manifest in both directions.
pub const STORE_HEADER: &str = "x-weir-store";

/// Marks a manifest value that must be decrypted server-side.
pub const ENCRYPTED_PREFIX: &str = "__weir_enc:";

/// Marks a plain string manifest value that starts with one of the
/// prefixes. Stripped once when the manifest is read.
pub const ESCAPED_PREFIX: &str = "__weir_raw:";

/// Undoes the escaping of a top-level manifest value.
pub fn unescape_manifest_value(value: Value) -> Value {
	match value {
		Value::String(s) if s.starts_with(ESCAPED_PREFIX) => Value::String(s[ESCAPED_PREFIX.len()..].to_string()),
		other => other,
	}
}

/// Which side of the wire may see an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
	/// Never leaves the process.
	Server,
	/// Sent to the client with each response.
	Client,
}

/// Options for [`Store::transfer_to_client_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
	/// Encrypt the values before they leave the server.
	pub encrypt: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
	value: Value,
	partition: Partition,
	sensitive: bool,
}

/// The store.
#[derive(Debug, Clone, Default)]
pub struct Store {
	entries: IndexMap<String, Entry>,
	/// Keys marked for transfer before they were set, with their
	/// sensitivity.
	pending_transfer: HashMap<String, bool>,
}

impl Store {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key).map(|e| &e.value)
	}

	/// Typed read; `None` when absent or of another shape.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Sets `key` in the partition that holds it, or in the server
	/// partition when the key is new and was not marked for transfer.
	/// Returns the previous value.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		let key = key.into();
		let value = value.into();
		if let Some(entry) = self.entries.get_mut(&key) {
			return Some(std::mem::replace(&mut entry.value, value));
		}
		let entry = match self.pending_transfer.remove(&key) {
			Some(sensitive) => Entry {
				value,
				partition: Partition::Client,
				sensitive,
			},
			None => Entry {
				value,
				partition: Partition::Server,
				sensitive: false,
			},
		};
		self.entries.insert(key, entry);
		None
	}

	/// Removes `key` from whichever partition holds it.
	pub fn delete(&mut self, key: &str) -> Option<Value> {
		self.pending_transfer.remove(key);
		self.entries.shift_remove(key).map(|e| e.value)
	}

	/// Moves `keys` into the client partition. Keys not set yet are moved
	/// as soon as they are.
	pub fn transfer_to_client<K: AsRef<str>>(&mut self, keys: &[K]) {
		self.transfer_to_client_with(keys, TransferOptions::default());
	}

	/// Like [`transfer_to_client`](Self::transfer_to_client), optionally
	/// marking the keys sensitive so their values travel encrypted.
	pub fn transfer_to_client_with<K: AsRef<str>>(&mut self, keys: &[K], options: TransferOptions) {
		for key in keys {
			let key = key.as_ref();
			match self.entries.get_mut(key) {
				Some(entry) => {
					entry.partition = Partition::Client;
					entry.sensitive |= options.encrypt;
				}
				None => {
					let marked = self.pending_transfer.entry(key.to_string()).or_default();
					*marked |= options.encrypt;
				}
			}
		}
	}

	pub fn partition_of(&self, key: &str) -> Option<Partition> {
		self.entries.get(key).map(|e| e.partition)
	}

	pub fn is_sensitive(&self, key: &str) -> bool {
		self.entries.get(key).is_some_and(|e| e.sensitive)
	}

	/// Client partition entries in insertion order: key, value, sensitive.
	pub fn client_entries(&self) -> impl Iterator<Item = (&str, &Value, bool)> {
		self.entries
			.iter()
			.filter(|(_, e)| e.partition == Partition::Client)
			.map(|(k, e)| (k.as_str(), &e.value, e.sensitive))
	}

	pub fn keys_in(&self, partition: Partition) -> Vec<&str> {
		self.entries
			.iter()
			.filter(|(_, e)| e.partition == partition)
			.map(|(k, _)| k.as_str())
			.collect()
	}

	/// Places a value received from the client into the client partition,
	/// replacing any server-side entry of the same key.
	pub(crate) fn hydrate_client(&mut self, key: String, value: Value, sensitive: bool) {
		self.pending_transfer.remove(&key);
		self.entries.insert(
			key,
			Entry {
				value,
				partition: Partition::Client,
				sensitive,
			},
		);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
