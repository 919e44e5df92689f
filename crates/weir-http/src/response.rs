use bytes::Bytes;
use futures::stream::Stream;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;
use std::pin::Pin;

use crate::Error;

/// Buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

/// Streaming HTTP response.
pub struct StreamingResponse<S> {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub stream: S,
}

/// Boxed chunk stream carried by streaming replies.
pub type StreamBody =
	Pin<Box<dyn Stream<Item = Result<Bytes, Box<dyn std::error::Error + Send + Sync>>> + Send>>;

impl Response {
	/// Empty response with `status`.
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// `200 OK`.
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// `400 Bad Request`.
	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	/// `404 Not Found`.
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Create a Response with HTTP 413 Payload Too Large status
	pub fn payload_too_large() -> Self {
		Self::new(StatusCode::PAYLOAD_TOO_LARGE)
	}

	/// `500 Internal Server Error`.
	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// Create a 302 Found redirect to `location`.
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::found("/login");
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.headers.get("location").unwrap(), "/login");
	/// ```
	pub fn found(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::FOUND).with_location(location.as_ref())
	}

	/// Set the response body
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::Response;
	/// use bytes::Bytes;
	///
	/// let response = Response::ok().with_body("Hello, World!");
	/// assert_eq!(response.body, Bytes::from("Hello, World!"));
	/// ```
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Add a custom header to the response.
	///
	/// Invalid names or values are skipped.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Add a Location header to the response
	pub fn with_location(mut self, location: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(location) {
			self.headers.insert(header::LOCATION, value);
		}
		self
	}

	/// Set the Content-Type header
	pub fn with_content_type(mut self, media_type: &'static str) -> Self {
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static(media_type));
		self
	}

	/// Serializes `data` as the body and marks it `application/json`.
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::Response;
	/// use serde_json::json;
	///
	/// let data = json!({"message": "Hello, World!"});
	/// let response = Response::ok().with_json(&data).unwrap();
	///
	/// assert_eq!(
	///     response.headers.get("content-type").unwrap().to_str().unwrap(),
	///     "application/json"
	/// );
	/// ```
	pub fn with_json<T: Serialize>(mut self, data: &T) -> crate::Result<Self> {
		let json = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
		self.body = Bytes::from(json);
		Ok(self.with_content_type("application/json"))
	}

	/// Returns the header value as a string, if present and valid UTF-8.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}
}

impl From<Error> for Response {
	fn from(error: Error) -> Self {
		Response::internal_server_error().with_body(error.to_string())
	}
}

impl<S> StreamingResponse<S>
where
	S: Stream<Item = Result<Bytes, Box<dyn std::error::Error + Send + Sync>>> + Send + 'static,
{
	/// Streams `stream` with status `200 OK`.
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::StreamingResponse;
	/// use hyper::StatusCode;
	/// use futures::stream;
	/// use bytes::Bytes;
	///
	/// let data = vec![Ok(Bytes::from("chunk1")), Ok(Bytes::from("chunk2"))];
	/// let stream = stream::iter(data);
	/// let response = StreamingResponse::new(stream);
	///
	/// assert_eq!(response.status, StatusCode::OK);
	/// ```
	pub fn new(stream: S) -> Self {
		Self {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			stream,
		}
	}

	/// Set the status code
	pub fn status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Inserts a typed header.
	pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(key, value);
		self
	}

	/// Add a header from string parts, skipping invalid ones.
	pub fn with_header(self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => self.header(name, value),
			_ => self,
		}
	}

	/// Sets `content-type`.
	pub fn media_type(self, media_type: &str) -> Self {
		self.header(
			header::CONTENT_TYPE,
			HeaderValue::from_str(media_type)
				.unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
		)
	}
}

impl<S> StreamingResponse<S> {
	/// The chunk stream, without status and headers.
	pub fn into_stream(self) -> S {
		self.stream
	}
}

impl<S> std::fmt::Debug for StreamingResponse<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamingResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::{StreamExt, stream};
	use rstest::rstest;

	#[rstest]
	fn test_with_header_skips_invalid_value() {
		// Arrange
		let response = Response::ok();

		// Act
		let response = response
			.with_header("x-valid", "yes")
			.with_header("x-invalid", "line\nbreak");

		// Assert
		assert_eq!(response.header_str("x-valid"), Some("yes"));
		assert!(response.headers.get("x-invalid").is_none());
	}

	#[rstest]
	fn test_error_converts_to_500() {
		// Arrange
		let error = Error::Serialization("bad".to_string());

		// Act
		let response = Response::from(error);

		// Assert
		assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(response.body, Bytes::from("serialization error: bad"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_streaming_response_preserves_chunk_order() {
		// Arrange
		let chunks: Vec<Result<Bytes, Box<dyn std::error::Error + Send + Sync>>> =
			vec![Ok(Bytes::from("a")), Ok(Bytes::from("b"))];
		let response = StreamingResponse::new(stream::iter(chunks)).media_type("text/html");

		// Act
		let collected: Vec<Bytes> = response
			.into_stream()
			.filter_map(|c| async move { c.ok() })
			.collect()
			.await;

		// Assert
		assert_eq!(collected, vec![Bytes::from("a"), Bytes::from("b")]);
	}
}
