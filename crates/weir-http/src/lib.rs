//! HTTP primitives shared by the weir runtime.
//!
//! [`Request`] is the inbound side handed to page and action handlers.
//! Handlers answer with a [`Reply`], which is either a fully buffered
//! [`Response`] or a [`StreamingResponse`] whose body is produced chunk by
//! chunk. [`Reply::into_http`] converts either form into an
//! [`http::Response`] that hyper can serve.

mod reply;
mod request;
mod response;

pub use hyper::body::Body as HttpBody;
pub use reply::{BoxError, Reply, ReplyBody};
pub use request::{Request, RequestBuilder};
pub use response::{Response, StreamBody, StreamingResponse};

/// Errors raised while building requests or responses.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A body could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(String),

	/// A header name or value was rejected.
	#[error("invalid header `{name}`")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},

	/// The request URI did not parse.
	#[error("invalid uri: {0}")]
	InvalidUri(String),

	/// The request body grew past the read limit.
	#[error("request body exceeds {limit} bytes")]
	BodyTooLarge {
		/// Limit in bytes.
		limit: usize,
	},

	/// The request body could not be read.
	#[error("could not read request body: {0}")]
	Body(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
