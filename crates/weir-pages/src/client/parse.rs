//! Markup to [`MemoryDom`].
//!
//! Covers what the renderer emits: doctype, comments, void elements,
//! raw-text `script`/`style`, `template`, quoted and bare attributes and
//! the entities produced by escaping. Unmatched close tags are ignored;
//! elements left open at the end are closed implicitly.

use super::dom::{MemoryDom, NodeId};
use crate::component::VOID_ELEMENTS;

/// Errors raised while parsing markup.
#[non_exhaustive]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("unterminated {what} starting at byte {offset}")]
	Unterminated { what: &'static str, offset: usize },

	#[error("invalid tag at byte {0}")]
	InvalidTag(usize),
}

/// Parses a document or fragment into a new [`MemoryDom`], appended
/// under the document node.
pub fn parse_html(markup: &str) -> Result<MemoryDom, ParseError> {
	let mut dom = MemoryDom::new();
	let root = dom.document();
	parse_into(&mut dom, root, markup)?;
	Ok(dom)
}

/// Parses `markup` and appends the result to `parent`.
pub fn parse_into(dom: &mut MemoryDom, parent: NodeId, markup: &str) -> Result<(), ParseError> {
	let mut stack = vec![parent];
	let mut pos = 0;
	let bytes = markup.as_bytes();

	while pos < markup.len() {
		let current = *stack.last().unwrap_or(&parent);
		if bytes[pos] != b'<' {
			let end = markup[pos..].find('<').map_or(markup.len(), |i| pos + i);
			let text = dom.create_text(decode_entities(&markup[pos..end]));
			dom.append_child(current, text);
			pos = end;
			continue;
		}

		let rest = &markup[pos..];
		if let Some(body) = rest.strip_prefix("<!--") {
			let end = body.find("-->").ok_or(ParseError::Unterminated {
				what: "comment",
				offset: pos,
			})?;
			let comment = dom.create_comment(&body[..end]);
			dom.append_child(current, comment);
			pos += 4 + end + 3;
		} else if rest.starts_with("<!") {
			let end = rest.find('>').ok_or(ParseError::Unterminated {
				what: "doctype",
				offset: pos,
			})?;
			let inner = rest[2..end].trim();
			let name = inner
				.split_once(char::is_whitespace)
				.map_or("html", |(_, name)| name.trim());
			let doctype = dom.create_doctype(name);
			dom.append_child(current, doctype);
			pos += end + 1;
		} else if let Some(body) = rest.strip_prefix("</") {
			let end = body.find('>').ok_or(ParseError::Unterminated {
				what: "close tag",
				offset: pos,
			})?;
			let name = body[..end].trim().to_ascii_lowercase();
			if let Some(depth) = stack
				.iter()
				.rposition(|n| *n != parent && dom.tag(*n) == Some(name.as_str()))
			{
				stack.truncate(depth);
			}
			pos += 2 + end + 1;
		} else {
			let (tag, attrs, self_closing, consumed) = open_tag(rest, pos)?;
			let element = dom.create_element(tag.clone());
			for (name, value) in attrs {
				dom.set_attribute(element, &name, &value);
			}
			dom.append_child(current, element);
			pos += consumed;

			if matches!(tag.as_str(), "script" | "style") {
				let close = format!("</{tag}");
				let body = &markup[pos..];
				let end = find_ignore_case(body, &close).ok_or(ParseError::Unterminated {
					what: "raw text element",
					offset: pos,
				})?;
				if end > 0 {
					let text = dom.create_text(&body[..end]);
					dom.append_child(element, text);
				}
				let after = &body[end..];
				pos += end + after.find('>').map_or(after.len(), |i| i + 1);
			} else if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
				stack.push(element);
			}
		}
	}
	Ok(())
}

type OpenTag = (String, Vec<(String, String)>, bool, usize);

fn open_tag(rest: &str, offset: usize) -> Result<OpenTag, ParseError> {
	let bytes = rest.as_bytes();
	let mut i = 1;
	while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
		i += 1;
	}
	let tag = rest[1..i].to_ascii_lowercase();
	if tag.is_empty() {
		return Err(ParseError::InvalidTag(offset));
	}

	let mut attrs = Vec::new();
	loop {
		while i < bytes.len() && bytes[i].is_ascii_whitespace() {
			i += 1;
		}
		match bytes.get(i) {
			None => {
				return Err(ParseError::Unterminated {
					what: "tag",
					offset,
				});
			}
			Some(b'>') => return Ok((tag, attrs, false, i + 1)),
			Some(b'/') if bytes.get(i + 1) == Some(&b'>') => return Ok((tag, attrs, true, i + 2)),
			Some(b'/') => i += 1,
			Some(_) => {
				let start = i;
				while i < bytes.len()
					&& !bytes[i].is_ascii_whitespace()
					&& !matches!(bytes[i], b'=' | b'>' | b'/')
				{
					i += 1;
				}
				let name = rest[start..i].to_ascii_lowercase();
				let mut value = String::new();
				if bytes.get(i) == Some(&b'=') {
					i += 1;
					match bytes.get(i) {
						Some(&quote) if quote == b'"' || quote == b'\'' => {
							let close = rest[i + 1..].find(quote as char).ok_or(
								ParseError::Unterminated {
									what: "attribute value",
									offset: offset + i,
								},
							)?;
							value = decode_entities(&rest[i + 1..i + 1 + close]);
							i += close + 2;
						}
						_ => {
							let start = i;
							while i < bytes.len()
								&& !bytes[i].is_ascii_whitespace()
								&& bytes[i] != b'>'
								&& !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
							{
								i += 1;
							}
							value = decode_entities(&rest[start..i]);
						}
					}
				}
				attrs.push((name, value));
			}
		}
	}
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
	let needle = needle.as_bytes();
	haystack
		.as_bytes()
		.windows(needle.len())
		.position(|w| w.eq_ignore_ascii_case(needle))
}

/// Decodes the entities produced by escaping; others are left as-is.
pub fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}
	const ENTITIES: &[(&str, char)] = &[
		("&amp;", '&'),
		("&lt;", '<'),
		("&gt;", '>'),
		("&quot;", '"'),
		("&#x27;", '\''),
		("&#39;", '\''),
	];
	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(at) = rest.find('&') {
		out.push_str(&rest[..at]);
		rest = &rest[at..];
		match ENTITIES.iter().find(|(name, _)| rest.starts_with(name)) {
			Some((name, c)) => {
				out.push(*c);
				rest = &rest[name.len()..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}
