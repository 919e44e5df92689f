//! Store transfer between server and client.
//!
//! The client partition travels as a manifest: a JSON array of
//! `[key, value]` pairs. Values of sensitive keys are replaced by a string
//! made of [`ENCRYPTED_PREFIX`] and base64 of `nonce || ciphertext`
//! (AES-256-GCM, key = SHA-256 of the configured secret). Encrypted values
//! are only ever decrypted here, on the server. Plain strings that already
//! start with either prefix are sent behind [`ESCAPED_PREFIX`].
//!
//! In responses and requests the manifest rides in the [`STORE_HEADER`]
//! header, percent-encoded. In documents it is embedded as a JSON script.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use weir_conf::StoreSecret;

use crate::store::Store;

pub use crate::store::{ENCRYPTED_PREFIX, ESCAPED_PREFIX, STORE_HEADER};

const NONCE_LEN: usize = 12;

/// Errors raised while encoding or decoding a manifest.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
	#[error("invalid store manifest: {0}")]
	Json(#[from] serde_json::Error),

	#[error("store header is not valid percent-encoding: {0}")]
	Encoding(String),

	#[error("manifest entry {0} is not a [key, value] pair")]
	Malformed(usize),

	#[error("store key `{key}` is sensitive but no store secret is configured")]
	MissingSecret { key: String },

	#[error("could not encrypt store key `{key}`")]
	Encrypt { key: String },

	#[error("could not decrypt store key `{key}`")]
	Decrypt { key: String },
}

/// Encodes and decodes store manifests.
#[derive(Clone)]
pub struct StoreTransfer {
	cipher: Option<Aes256Gcm>,
}

impl StoreTransfer {
	/// Without a secret, sensitive entries can be neither sent nor read.
	pub fn new(secret: Option<&StoreSecret>) -> Self {
		let cipher = secret.map(|secret| {
			let key = Sha256::digest(secret.expose().as_bytes());
			Aes256Gcm::new(&key)
		});
		Self { cipher }
	}

	/// Client partition as `[key, value]` pairs, sensitive values encrypted.
	pub fn manifest(&self, store: &Store) -> Result<Vec<(String, Value)>, TransferError> {
		store
			.client_entries()
			.map(|(key, value, sensitive)| {
				let value = if sensitive {
					Value::String(self.encrypt(key, value)?)
				} else {
					escape(value)
				};
				Ok((key.to_string(), value))
			})
			.collect()
	}

	/// Manifest as JSON, for embedding in a document.
	pub fn outbound_json(&self, store: &Store) -> Result<String, TransferError> {
		Ok(serde_json::to_string(&self.manifest(store)?)?)
	}

	/// Manifest as a header value.
	pub fn outbound(&self, store: &Store) -> Result<String, TransferError> {
		Ok(urlencoding::encode(&self.outbound_json(store)?).into_owned())
	}

	/// Populates the client partition of `store` from a header value.
	pub fn inbound(&self, header: &str, store: &mut Store) -> Result<(), TransferError> {
		let json =
			urlencoding::decode(header).map_err(|e| TransferError::Encoding(e.to_string()))?;
		self.inbound_json(&json, store)
	}

	/// Populates the client partition of `store` from manifest JSON.
	///
	/// Nothing is written unless every entry decodes.
	pub fn inbound_json(&self, json: &str, store: &mut Store) -> Result<(), TransferError> {
		let entries: Vec<Value> = serde_json::from_str(json)?;
		let mut decoded = Vec::with_capacity(entries.len());
		for (index, entry) in entries.into_iter().enumerate() {
			let Value::Array(mut pair) = entry else {
				return Err(TransferError::Malformed(index));
			};
			if pair.len() != 2 {
				return Err(TransferError::Malformed(index));
			}
			let value = pair.pop().unwrap_or(Value::Null);
			let Some(Value::String(key)) = pair.pop() else {
				return Err(TransferError::Malformed(index));
			};
			match value {
				Value::String(s) if s.starts_with(ESCAPED_PREFIX) => {
					decoded.push((key, Value::String(s[ESCAPED_PREFIX.len()..].to_string()), false));
				}
				Value::String(s) if s.starts_with(ENCRYPTED_PREFIX) => {
					let plain = self.decrypt(&key, &s[ENCRYPTED_PREFIX.len()..])?;
					decoded.push((key, plain, true));
				}
				other => decoded.push((key, other, false)),
			}
		}
		for (key, value, sensitive) in decoded {
			store.hydrate_client(key, value, sensitive);
		}
		Ok(())
	}

	fn encrypt(&self, key: &str, value: &Value) -> Result<String, TransferError> {
		let cipher = self
			.cipher
			.as_ref()
			.ok_or_else(|| TransferError::MissingSecret { key: key.to_string() })?;
		let plain = serde_json::to_vec(value)?;

		let mut nonce_bytes = [0u8; NONCE_LEN];
		rand::thread_rng().fill_bytes(&mut nonce_bytes);
		let ciphertext = cipher
			.encrypt(Nonce::from_slice(&nonce_bytes), plain.as_slice())
			.map_err(|_| TransferError::Encrypt { key: key.to_string() })?;

		let mut sealed = nonce_bytes.to_vec();
		sealed.extend_from_slice(&ciphertext);
		Ok(format!("{ENCRYPTED_PREFIX}{}", STANDARD.encode(sealed)))
	}

	fn decrypt(&self, key: &str, encoded: &str) -> Result<Value, TransferError> {
		let cipher = self
			.cipher
			.as_ref()
			.ok_or_else(|| TransferError::MissingSecret { key: key.to_string() })?;
		let failed = || TransferError::Decrypt { key: key.to_string() };

		let sealed = STANDARD.decode(encoded).map_err(|_| failed())?;
		if sealed.len() < NONCE_LEN {
			return Err(failed());
		}
		let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
		let plain = cipher
			.decrypt(Nonce::from_slice(nonce), ciphertext)
			.map_err(|_| failed())?;
		serde_json::from_slice(&plain).map_err(|_| failed())
	}
}

fn escape(value: &Value) -> Value {
	match value {
		Value::String(s) if s.starts_with(ENCRYPTED_PREFIX) || s.starts_with(ESCAPED_PREFIX) => {
			Value::String(format!("{ESCAPED_PREFIX}{s}"))
		}
		other => other.clone(),
	}
}

impl std::fmt::Debug for StoreTransfer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StoreTransfer")
			.field("encryption", &self.cipher.is_some())
			.finish()
	}
}
