//! Request body encoding.
//!
//! # Design
//! The caller picks the strategy; nothing here inspects a payload to guess
//! one. JSON bodies suggest `content-type: application/json`. Multipart
//! bodies carry a random boundary and therefore own their content-type; the
//! dispatcher rejects a caller-supplied content-type for them.
//!
//! A `Form` is a list of input controls. Deriving a multipart container from
//! it keeps only controls with a declared name, the same rule browsers apply
//! when submitting a form.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EncodeError;
use crate::http::Headers;

pub const CONTENT_TYPE: &str = "content-type";
pub const APPLICATION_JSON: &str = "application/json";

/// Which encoding a body was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Multipart,
}

/// Encoding strategy chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    Multipart,
}

/// A transmissible body plus the headers that describe it.
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub kind: ContentKind,
    pub payload: Bytes,
    pub headers: Headers,
}

impl EncodedBody {
    /// Serialize `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncodeError> {
        let payload = serde_json::to_vec(value).map_err(|e| EncodeError(e.to_string()))?;
        let mut headers = Headers::new();
        headers.set(CONTENT_TYPE, APPLICATION_JSON);
        Ok(Self {
            kind: ContentKind::Json,
            payload: payload.into(),
            headers,
        })
    }

    pub fn multipart(form: &MultipartForm) -> Self {
        let mut headers = Headers::new();
        headers.set(CONTENT_TYPE, form.content_type());
        Self {
            kind: ContentKind::Multipart,
            payload: form.to_bytes(),
            headers,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)
    }
}

/// Encode a flat field mapping with the given strategy.
///
/// For multipart, scalar values become text parts (`null` becomes an empty
/// string); arrays and objects have no text form and are rejected.
pub fn encode(strategy: Encoding, fields: &Map<String, Value>) -> Result<EncodedBody, EncodeError> {
    match strategy {
        Encoding::Json => EncodedBody::json(fields),
        Encoding::Multipart => {
            let mut form = MultipartForm::new();
            for (name, value) in fields {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => String::new(),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(EncodeError(format!(
                            "field `{name}` is not representable as a form value"
                        )))
                    }
                };
                form = form.text(name.as_str(), text);
            }
            Ok(EncodedBody::multipart(&form))
        }
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A `multipart/form-data` container.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("----postsFormBoundary{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Build a container from every named control in `form`. Unnamed
    /// controls are skipped without error.
    pub fn from_form(form: &Form) -> Self {
        let mut multipart = Self::new();
        for control in &form.controls {
            let Some(name) = control.name.as_deref() else {
                continue;
            };
            multipart = match &control.value {
                ControlValue::Text(text) => multipart.text(name, text.as_str()),
                ControlValue::File {
                    filename,
                    content_type,
                    data,
                } => multipart.file(name, filename.as_str(), content_type.clone(), data.clone()),
            };
        }
        multipart
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type,
            data: data.into(),
        });
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            buf.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", escape(&part.name));
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape(filename)));
            }
            buf.put_slice(disposition.as_bytes());
            buf.put_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                buf.put_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            } else if part.filename.is_some() {
                buf.put_slice(b"Content-Type: application/octet-stream\r\n");
            }
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        buf.freeze()
    }
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Current value of an input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    File {
        filename: String,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// An input control as seen by form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControl {
    pub name: Option<String>,
    pub value: ControlValue,
}

impl FormControl {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: ControlValue::Text(value.into()),
        }
    }

    /// A control without a declared name.
    pub fn unnamed(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: ControlValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            value: ControlValue::File {
                filename: filename.into(),
                content_type,
                data: data.into(),
            },
        }
    }
}

/// Structured snapshot of a form's controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pub controls: Vec<FormControl>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(mut self, control: FormControl) -> Self {
        self.controls.push(control);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("value has no JSON form"))
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn json_body_suggests_content_type() {
        let body = encode(Encoding::Json, &fields(json!({"title": "t", "userId": 1}))).unwrap();
        assert_eq!(body.kind, ContentKind::Json);
        assert_eq!(body.content_type(), Some("application/json"));
        let parsed: Value = serde_json::from_slice(&body.payload).unwrap();
        assert_eq!(parsed, json!({"title": "t", "userId": 1}));
    }

    #[test]
    fn json_rejects_unrepresentable_values() {
        let err = EncodedBody::json(&Unrepresentable).unwrap_err();
        assert!(err.0.contains("no JSON form"));
    }

    #[test]
    fn multipart_layout_matches_form_data() {
        let form = MultipartForm::with_boundary("XYZ")
            .text("title", "hello")
            .file("attachment", "a.txt", Some("text/plain".to_string()), &b"abc"[..]);
        let body = EncodedBody::multipart(&form);
        assert_eq!(body.kind, ContentKind::Multipart);
        assert_eq!(body.content_type(), Some("multipart/form-data; boundary=XYZ"));

        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            hello\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"attachment\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            abc\r\n\
            --XYZ--\r\n";
        assert_eq!(std::str::from_utf8(&body.payload).unwrap(), expected);
    }

    #[test]
    fn multipart_escapes_quotes_and_newlines_in_names() {
        let form = MultipartForm::with_boundary("B").text("a\"b\nc", "v");
        let text = String::from_utf8(form.to_bytes().to_vec()).unwrap();
        assert!(text.contains("name=\"a%22b%0Ac\""));
    }

    #[test]
    fn boundaries_are_unique_per_form() {
        assert_ne!(MultipartForm::new().boundary(), MultipartForm::new().boundary());
    }

    #[test]
    fn multipart_fields_become_text_parts() {
        let body = encode(
            Encoding::Multipart,
            &fields(json!({"title": "t", "body": "c", "userId": 7, "draft": false})),
        )
        .unwrap();
        let text = String::from_utf8(body.payload.to_vec()).unwrap();
        assert!(text.contains("name=\"userId\"\r\n\r\n7\r\n"));
        assert!(text.contains("name=\"draft\"\r\n\r\nfalse\r\n"));
    }

    #[test]
    fn multipart_rejects_nested_values() {
        let err = encode(Encoding::Multipart, &fields(json!({"tags": ["a", "b"]}))).unwrap_err();
        assert!(err.0.contains("tags"));
    }

    #[test]
    fn form_derivation_skips_unnamed_controls() {
        let form = Form::new()
            .control(FormControl::text("title", "t"))
            .control(FormControl::unnamed("ignored"))
            .control(FormControl::text("body", "c"));
        let multipart = MultipartForm::from_form(&form).text("userId", "3");

        let names: Vec<&str> = multipart.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["title", "body", "userId"]);
        let text = String::from_utf8(multipart.to_bytes().to_vec()).unwrap();
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn form_derivation_keeps_file_controls() {
        let form = Form::new().control(FormControl::file("upload", "notes.bin", None, vec![0u8, 1, 2]));
        let multipart = MultipartForm::from_form(&form);
        let part = &multipart.parts()[0];
        assert_eq!(part.filename.as_deref(), Some("notes.bin"));
        assert_eq!(&part.data[..], &[0u8, 1, 2]);

        let bytes = multipart.to_bytes();
        let needle = b"Content-Type: application/octet-stream";
        assert!(bytes.windows(needle.len()).any(|w| w == needle));
    }
}
