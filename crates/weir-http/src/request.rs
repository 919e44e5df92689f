use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri};
use serde::Serialize;

use crate::{BoxError, Error};

/// Inbound HTTP request with a fully read body.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Request {
	/// Starts a [`RequestBuilder`].
	///
	/// # Examples
	///
	/// ```
	/// use weir_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/cart?step=2")
	///     .header("x-weir-action", "a1_1")
	///     .build()
	///     .unwrap();
	/// assert_eq!(request.path(), "/cart");
	/// assert_eq!(request.header_str("x-weir-action"), Some("a1_1"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Reads an incoming request, buffering at most `limit` body bytes.
	///
	/// Reading stops with [`Error::BodyTooLarge`] as soon as the body grows
	/// past the limit, whatever its declared length.
	pub async fn from_http<B>(request: http::Request<B>, limit: usize) -> crate::Result<Request>
	where
		B: Body,
		B::Error: Into<BoxError>,
	{
		let (parts, body) = request.into_parts();
		let collected = Limited::new(body, limit).collect().await.map_err(|error| {
			if error.is::<LengthLimitError>() {
				Error::BodyTooLarge { limit }
			} else {
				Error::Body(error.to_string())
			}
		})?;
		Ok(Request {
			method: parts.method,
			uri: parts.uri,
			headers: parts.headers,
			body: collected.to_bytes(),
		})
	}

	/// Request path without the query string.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Returns the header value as a string, if present and valid UTF-8.
	pub fn header_str(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Media type of the body without parameters, lower-cased.
	pub fn content_type(&self) -> Option<String> {
		self.header_str("content-type").map(|ct| {
			ct.split(';')
				.next()
				.unwrap_or_default()
				.trim()
				.to_ascii_lowercase()
		})
	}
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	headers: HeaderMap,
	body: Bytes,
	invalid_header: Option<String>,
}

impl RequestBuilder {
	/// Sets the method. Defaults to `GET`.
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	/// Sets the request URI. Defaults to `/`.
	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	/// Adds a header. An invalid pair makes [`build`](Self::build) fail.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.insert(name, value);
			}
			_ => self.invalid_header = Some(name.to_string()),
		}
		self
	}

	/// Replaces all headers.
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Serializes `data` as the JSON body and sets the content type.
	pub fn json<T: Serialize>(self, data: &T) -> crate::Result<Self> {
		let body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
		Ok(self.header("content-type", "application/json").body(body))
	}

	/// Builds the request.
	pub fn build(self) -> crate::Result<Request> {
		if let Some(name) = self.invalid_header {
			return Err(Error::InvalidHeader { name });
		}
		let uri = self
			.uri
			.as_deref()
			.unwrap_or("/")
			.parse::<Uri>()
			.map_err(|e| Error::InvalidUri(e.to_string()))?;
		Ok(Request {
			method: self.method.unwrap_or(Method::GET),
			uri,
			headers: self.headers,
			body: self.body,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("application/json", "application/json")]
	#[case("application/x-www-form-urlencoded; charset=UTF-8", "application/x-www-form-urlencoded")]
	#[case("Text/HTML", "text/html")]
	fn test_content_type_strips_parameters(#[case] raw: &str, #[case] expected: &str) {
		// Arrange
		let request = Request::builder()
			.header("content-type", raw)
			.build()
			.unwrap();

		// Act
		let content_type = request.content_type();

		// Assert
		assert_eq!(content_type.as_deref(), Some(expected));
	}

	#[rstest]
	#[case(8, true)]
	#[case(64, false)]
	#[tokio::test]
	async fn test_from_http_enforces_body_limit(#[case] limit: usize, #[case] rejected: bool) {
		// Arrange
		let incoming = http::Request::post("/_weir/action")
			.header("content-type", "application/json")
			.body(http_body_util::Full::new(Bytes::from_static(br#"{"actionId":"cart.add"}"#)))
			.unwrap();

		// Act
		let result = Request::from_http(incoming, limit).await;

		// Assert
		if rejected {
			assert!(matches!(result, Err(Error::BodyTooLarge { limit: 8 })));
		} else {
			let request = result.unwrap();
			assert_eq!(request.path(), "/_weir/action");
			assert_eq!(request.body, Bytes::from_static(br#"{"actionId":"cart.add"}"#));
		}
	}

	#[rstest]
	fn test_invalid_header_fails_build() {
		// Arrange
		let builder = Request::builder().header("bad header", "v");

		// Act
		let result = builder.build();

		// Assert
		assert!(matches!(result, Err(Error::InvalidHeader { name }) if name == "bad header"));
	}
}
