use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody as FrameStream};
use hyper::body::Frame;
use hyper::{HeaderMap, StatusCode};

use crate::{Response, StreamBody, StreamingResponse};

/// Boxed error carried by streaming bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type produced by [`Reply::into_http`].
pub type ReplyBody = UnsyncBoxBody<Bytes, BoxError>;

/// What a handler answers with: a buffered response or a byte stream.
pub enum Reply {
	Full(Response),
	Streaming(StreamingResponse<StreamBody>),
}

impl Reply {
	pub fn status(&self) -> StatusCode {
		match self {
			Reply::Full(r) => r.status,
			Reply::Streaming(r) => r.status,
		}
	}

	pub fn headers(&self) -> &HeaderMap {
		match self {
			Reply::Full(r) => &r.headers,
			Reply::Streaming(r) => &r.headers,
		}
	}

	/// Returns the header value as a string, if present and valid UTF-8.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers().get(name).and_then(|v| v.to_str().ok())
	}

	pub fn is_streaming(&self) -> bool {
		matches!(self, Reply::Streaming(_))
	}

	/// Drains the body into memory.
	///
	/// A streaming body that fails midway returns the error; bytes read so
	/// far are discarded.
	pub async fn into_body_bytes(self) -> Result<Bytes, BoxError> {
		match self {
			Reply::Full(r) => Ok(r.body),
			Reply::Streaming(r) => {
				let mut stream = r.into_stream();
				let mut buf = BytesMut::new();
				while let Some(chunk) = stream.next().await {
					buf.extend_from_slice(&chunk?);
				}
				Ok(buf.freeze())
			}
		}
	}

	/// Converts into an [`http::Response`] servable by hyper.
	pub fn into_http(self) -> http::Response<ReplyBody> {
		let (status, headers, body) = match self {
			Reply::Full(r) => {
				let body = Full::new(r.body)
					.map_err(|never| -> BoxError { match never {} })
					.boxed_unsync();
				(r.status, r.headers, body)
			}
			Reply::Streaming(r) => {
				let status = r.status;
				let headers = r.headers.clone();
				let frames = r.into_stream().map(|chunk| chunk.map(Frame::data));
				(status, headers, FrameStream::new(frames).boxed_unsync())
			}
		};
		let mut response = http::Response::new(body);
		*response.status_mut() = status;
		*response.headers_mut() = headers;
		response
	}
}

impl From<Response> for Reply {
	fn from(response: Response) -> Self {
		Reply::Full(response)
	}
}

impl From<StreamingResponse<StreamBody>> for Reply {
	fn from(response: StreamingResponse<StreamBody>) -> Self {
		Reply::Streaming(response)
	}
}

impl std::fmt::Debug for Reply {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Reply::Full(r) => f.debug_tuple("Full").field(r).finish(),
			Reply::Streaming(r) => f.debug_tuple("Streaming").field(r).finish(),
		}
	}
}
