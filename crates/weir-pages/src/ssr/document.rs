//! HTML document shell around a streamed render.
//!
//! ```text
//! <!DOCTYPE html><html lang=".."><head>..</head><body><div id="app">
//!   ROOT
//! </div>
//! LATE SUSPENSE PAYLOADS
//! <script type="application/json" id="weir-actions">..</script>
//! <script type="application/json" id="weir-store">..</script>
//! </body></html>
//! ```

use crate::actions::binding::BINDINGS_SCRIPT_ID;
use crate::component::html_escape;

/// Id of the script element embedding the client store manifest.
pub const STORE_SCRIPT_ID: &str = "weir-store";

/// Static parts of a full document.
#[derive(Debug, Clone)]
pub struct DocumentShell {
	lang: String,
	title: Option<String>,
	head: Vec<String>,
	app_root_id: String,
}

impl Default for DocumentShell {
	fn default() -> Self {
		Self {
			lang: "en".to_string(),
			title: None,
			head: Vec::new(),
			app_root_id: "app".to_string(),
		}
	}
}

impl DocumentShell {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the `lang` attribute of the `html` element.
	pub fn lang(mut self, lang: impl Into<String>) -> Self {
		self.lang = lang.into();
		self
	}

	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Appends raw markup to `<head>`. Not escaped.
	pub fn head_html(mut self, markup: impl Into<String>) -> Self {
		self.head.push(markup.into());
		self
	}

	/// Sets the id of the element wrapping the rendered root.
	pub fn app_root(mut self, id: impl Into<String>) -> Self {
		self.app_root_id = id.into();
		self
	}

	pub fn app_root_id(&self) -> &str {
		&self.app_root_id
	}

	/// Everything up to and including the opening root element.
	pub(crate) fn open(&self) -> String {
		let mut html = String::with_capacity(256);
		html.push_str("<!DOCTYPE html>\n");
		html.push_str(&format!("<html lang=\"{}\">\n", html_escape(&self.lang)));
		html.push_str("<head>\n");
		html.push_str("<meta charset=\"UTF-8\">\n");
		html.push_str(
			"<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
		);
		if let Some(title) = &self.title {
			html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
		}
		for markup in &self.head {
			html.push_str(markup);
			html.push('\n');
		}
		html.push_str("</head>\n");
		html.push_str("<body>\n");
		html.push_str(&format!("<div id=\"{}\">", html_escape(&self.app_root_id)));
		html
	}

	pub(crate) fn close_root(&self) -> &'static str {
		"</div>\n"
	}

	/// Data scripts and the closing tags.
	pub(crate) fn close(&self, bindings_json: Option<&str>, store_json: &str) -> String {
		let mut html = String::new();
		if let Some(json) = bindings_json {
			html.push_str(&bindings_script(json));
		}
		html.push_str(&json_script(STORE_SCRIPT_ID, store_json));
		html.push_str("</body>\n</html>");
		html
	}
}

/// Script element embedding a binding table.
pub(crate) fn bindings_script(json: &str) -> String {
	json_script(BINDINGS_SCRIPT_ID, json)
}

fn json_script(id: &str, json: &str) -> String {
	format!(
		"<script type=\"application/json\" id=\"{id}\">{}</script>\n",
		escape_json_for_script(json)
	)
}

/// Keeps `</script>` inside JSON from closing the script element.
pub fn escape_json_for_script(json: &str) -> String {
	json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_open_escapes_and_ends_in_root() {
		// Arrange
		let shell = DocumentShell::new()
			.lang("de")
			.title("A & B")
			.app_root("root");

		// Act
		let open = shell.open();

		// Assert
		assert!(open.starts_with("<!DOCTYPE html>\n<html lang=\"de\">"));
		assert!(open.contains("<title>A &amp; B</title>"));
		assert!(open.ends_with("<body>\n<div id=\"root\">"));
	}

	#[rstest]
	fn test_close_orders_scripts() {
		// Arrange
		let shell = DocumentShell::new();

		// Act
		let close = shell.close(Some("{}"), "[[\"k\",\"</script>\"]]");

		// Assert
		let actions = close.find("id=\"weir-actions\"").unwrap();
		let store = close.find("id=\"weir-store\"").unwrap();
		assert!(actions < store);
		assert!(close.contains("<\\/script>"));
		assert!(close.ends_with("</body>\n</html>"));
	}

	#[rstest]
	fn test_close_without_bindings() {
		// Act
		let close = DocumentShell::new().close(None, "[]");

		// Assert
		assert!(!close.contains(BINDINGS_SCRIPT_ID));
	}
}
