//! Response body decoding
//!
//! JSON is parsed structurally, XML and plain text are folded into an
//! equivalent key-value tree. Anything else decodes to an empty object.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use super::types::FetchError;

/// Body format selected from the `Content-Type` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Xml,
    Text,
    Unsupported,
}

impl BodyFormat {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime.is_empty() || mime == "text/plain" {
            BodyFormat::Text
        } else if mime == "application/json" || mime.ends_with("+json") {
            BodyFormat::Json
        } else if mime == "application/xml" || mime == "text/xml" || mime.ends_with("+xml") {
            BodyFormat::Xml
        } else {
            BodyFormat::Unsupported
        }
    }
}

/// Decode a body according to its content type
pub fn decode_body(url: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<Value, FetchError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Object(Map::new()));
    }

    match BodyFormat::from_content_type(content_type) {
        BodyFormat::Json => serde_json::from_slice(bytes).map_err(|e| FetchError::Permanent {
            status: None,
            message: format!("malformed JSON from {}: {}", url, e),
            body: Some(String::from_utf8_lossy(bytes).into_owned()),
        }),
        BodyFormat::Xml => {
            let text = String::from_utf8_lossy(bytes);
            xml_to_value(&text).map_err(|e| FetchError::Permanent {
                status: None,
                message: format!("malformed XML from {}: {}", url, e),
                body: Some(text.into_owned()),
            })
        }
        BodyFormat::Text => Ok(text_to_value(&String::from_utf8_lossy(bytes))),
        BodyFormat::Unsupported => {
            log::error!(
                "Cannot decode response from {}: unsupported content type {:?}",
                url,
                content_type
            );
            Ok(Value::Object(Map::new()))
        }
    }
}

// ============================================================================
// XML
// ============================================================================

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut children = Map::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            children.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self { name, children, text: String::new() })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert("#text".to_string(), Value::String(text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

/// Repeated keys collapse into an array
fn insert_child(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// Convert an XML document into a JSON tree keyed by element name
pub fn xml_to_value(xml: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = Map::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| "unbalanced closing tag".to_string())?;
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None => insert_child(&mut root, name, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }

    Ok(Value::Object(root))
}

// ============================================================================
// PLAIN TEXT
// ============================================================================

/// `key: value` / `key=value` lines into an object, `{"text": ..}` otherwise
pub fn text_to_value(text: &str) -> Value {
    let mut map = Map::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let split = line.find(|c: char| c == ':' || c == '=').map(|idx| line.split_at(idx));
        if let Some((key, rest)) = split {
            let key = key.trim();
            if !key.is_empty() && !key.contains(' ') {
                insert_child(&mut map, key.to_string(), Value::String(rest[1..].trim().to_string()));
            }
        }
    }

    if map.is_empty() {
        let mut map = Map::new();
        map.insert("text".to_string(), Value::String(text.trim().to_string()));
        return Value::Object(map);
    }

    Value::Object(map)
}

// ============================================================================
// TESTS
// ============================================================================
