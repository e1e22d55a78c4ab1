//! Bus messages produced by the media graph, and the parsers the event
//! dispatcher applies to them.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::graph::GraphState;
use crate::{PipelineError, Result, FRAGMENT_LOCATION, FRAGMENT_RUNNING_TIME};

/// A message observed on the graph's bus.
#[derive(Debug, Clone)]
pub enum BusMessage {
    /// End of stream reached: muxers are flushed, the graph can stop.
    Eos,
    /// An element reported an error.
    Error(ErrorMessage),
    /// An element changed state.
    StateChanged {
        /// Name of the element the transition happened on.
        source: String,
        new_state: GraphState,
    },
    /// An element posted a custom structure.
    Element(ElementMessage),
    /// Anything else; logged and ignored.
    Other(String),
}

/// Payload of a bus error message.
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    /// Name of the element that errored.
    pub source: String,
    /// Human-readable error message.
    pub message: String,
    /// Debug string in the canonical
    /// `/GstPipeline:pipeline/GstBin:<bin>/<element>:<name>:<msg>` format.
    pub debug: String,
}

/// A typed field of an element structure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    UInt(u64),
}

/// A named structure carried by an element message.
#[derive(Debug, Clone)]
pub struct ElementMessage {
    pub name: String,
    pub fields: HashMap<String, FieldValue>,
}

impl ElementMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_str(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), FieldValue::Str(value.into()));
        self
    }

    pub fn with_uint(mut self, key: impl Into<String>, value: u64) -> Self {
        self.fields.insert(key.into(), FieldValue::UInt(value));
        self
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn uint(&self, key: &str) -> Option<u64> {
        match self.fields.get(key) {
            Some(FieldValue::UInt(v)) => Some(*v),
            _ => None,
        }
    }

    /// Fragment-opened notification, as the splitting muxer posts it.
    pub fn fragment_opened(location: impl Into<String>, running_time: u64) -> Self {
        Self::new(crate::FRAGMENT_OPENED_MESSAGE)
            .with_str(FRAGMENT_LOCATION, location)
            .with_uint(FRAGMENT_RUNNING_TIME, running_time)
    }

    /// Fragment-closed notification, as the splitting muxer posts it.
    pub fn fragment_closed(location: impl Into<String>, running_time: u64) -> Self {
        Self::new(crate::FRAGMENT_CLOSED_MESSAGE)
            .with_str(FRAGMENT_LOCATION, location)
            .with_uint(FRAGMENT_RUNNING_TIME, running_time)
    }
}

/// Extract `(location, running_time)` from a fragment structure.
pub(crate) fn segment_params(msg: &ElementMessage) -> Result<(String, i64)> {
    let location = msg
        .string(FRAGMENT_LOCATION)
        .ok_or_else(|| {
            PipelineError::MalformedMessage(format!(
                "'{}' missing string field '{}'",
                msg.name, FRAGMENT_LOCATION
            ))
        })?
        .to_string();

    let running_time = msg.uint(FRAGMENT_RUNNING_TIME).ok_or_else(|| {
        PipelineError::MalformedMessage(format!(
            "'{}' missing uint field '{}'",
            msg.name, FRAGMENT_RUNNING_TIME
        ))
    })?;

    Ok((location, running_time as i64))
}

// Debug info comes in the following format:
// file.c(line): method_name (): /GstPipeline:pipeline/GstBin:bin_name/GstElement:element_name:\nError message
static DEBUG_RE: OnceLock<Regex> = OnceLock::new();

fn debug_regex() -> &'static Regex {
    DEBUG_RE.get_or_init(|| {
        Regex::new(r"(?s)(.*?)GstPipeline:pipeline/GstBin:(.*?)/(.*?):([^:]*)(:\n)?(.*)")
            .expect("debug regex is valid")
    })
}

/// Parse `(element, name, message)` out of an error's debug string.
/// Returns `None` when the string does not follow the canonical format.
pub(crate) fn parse_debug_info(debug: &str) -> Option<(String, String, String)> {
    let caps = debug_regex().captures(debug)?;
    Some((
        caps.get(3).map(|m| m.as_str().to_string())?,
        caps.get(4).map(|m| m.as_str().to_string())?,
        caps.get(6).map(|m| m.as_str().to_string()).unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_debug_info() {
        let debug = "gstrtmp2sink.c(123): connect (): \
                     /GstPipeline:pipeline/GstBin:output/GstRtmp2Sink:sink_0:\n\
                     Could not connect to server";
        let (element, name, message) = parse_debug_info(debug).unwrap();
        assert_eq!(element, "GstRtmp2Sink");
        assert_eq!(name, "sink_0");
        assert_eq!(message, "Could not connect to server");
    }

    #[test]
    fn test_parse_debug_info_without_message() {
        let debug = "/GstPipeline:pipeline/GstBin:input/GstV4l2Src:camera";
        let (element, name, message) = parse_debug_info(debug).unwrap();
        assert_eq!(element, "GstV4l2Src");
        assert_eq!(name, "camera");
        assert!(message.is_empty());
    }

    #[test]
    fn test_parse_debug_info_rejects_other_formats() {
        assert!(parse_debug_info("not a pipeline path").is_none());
    }

    #[test]
    fn test_segment_params() {
        let msg = ElementMessage::fragment_closed("/tmp/seg_3.ts", 18_000_000_000);
        let (location, t) = segment_params(&msg).unwrap();
        assert_eq!(location, "/tmp/seg_3.ts");
        assert_eq!(t, 18_000_000_000);
    }

    #[test]
    fn test_segment_params_missing_field() {
        let msg = ElementMessage::new(crate::FRAGMENT_CLOSED_MESSAGE)
            .with_str(FRAGMENT_LOCATION, "/tmp/seg_0.ts");
        assert!(matches!(
            segment_params(&msg),
            Err(PipelineError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_segment_params_wrong_type() {
        let msg = ElementMessage::new(crate::FRAGMENT_CLOSED_MESSAGE)
            .with_uint(FRAGMENT_LOCATION, 7)
            .with_uint(FRAGMENT_RUNNING_TIME, 7);
        assert!(segment_params(&msg).is_err());
    }
}
