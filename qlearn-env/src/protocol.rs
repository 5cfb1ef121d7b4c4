//! Wire format of the environment collaborator
//!
//! Requests are bare action labels. Each response is a single object,
//! either JSON or a Python dict literal such as
//! `{'estado': '000000110', 'recompensa': -14}`.

use qlearn_core::{RLError, Result, Reward, Step, StepInfo};
use serde::Deserialize;

/// Default upper bound for one response object
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4096;

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(alias = "estado")]
    state: String,
    #[serde(alias = "recompensa")]
    reward: f64,
    #[serde(default, alias = "terminal")]
    done: bool,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Decode one framed response into a [`Step`]
///
/// The payload is normalised from Python literal syntax and then parsed
/// once. Anything that does not yield a state string and a finite reward
/// is a [`RLError::MalformedResponse`].
pub fn decode_response(payload: &[u8]) -> Result<Step> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| RLError::malformed_response(payload, format!("not UTF-8: {e}")))?;

    let response: WireResponse = serde_json::from_str(&normalize_literal(text))
        .map_err(|e| RLError::malformed_response(payload, e.to_string()))?;

    if !response.reward.is_finite() {
        return Err(RLError::malformed_response(payload, "reward is not finite"));
    }

    Ok(Step {
        state: response.state,
        reward: Reward::new(response.reward),
        done: response.done,
        info: StepInfo {
            fields: response.extra,
        },
    })
}

/// Rewrite Python literal syntax as JSON
///
/// Single-quoted strings become double-quoted, and the bare words `True`,
/// `False` and `None` become `true`, `false` and `null`. Valid JSON passes
/// through unchanged.
pub fn normalize_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push('"');
                copy_string(&mut chars, &mut out, c);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            other => out.push(other),
        }
    }
    out
}

fn copy_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
    quote: char,
) {
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(escaped) => {
                    out.push('\\');
                    out.push(escaped);
                }
                None => out.push('\\'),
            },
            '"' if quote == '\'' => out.push_str("\\\""),
            c if c == quote => {
                out.push('"');
                return;
            }
            c => out.push(c),
        }
    }
}

/// Splits a byte stream into top-level `{...}` objects
///
/// Braces inside quoted strings do not count. Bytes after a complete
/// object stay buffered for the next call.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    max_frame_bytes: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameBuffer {
    /// Create an empty buffer accepting objects up to `max_frame_bytes`
    #[must_use]
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as a frame
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Take the next complete object, if one has arrived
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut depth = 0usize;
        let mut start = 0usize;
        let mut quote: Option<u8> = None;
        let mut escaped = false;
        let mut end = None;
        let mut failure = None;

        for (i, &byte) in self.pending.iter().enumerate() {
            if depth > 0 && i - start >= self.max_frame_bytes {
                failure = Some(format!("response exceeds {} bytes", self.max_frame_bytes));
                break;
            }

            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == q {
                    quote = None;
                }
                continue;
            }

            match byte {
                b'{' => {
                    if depth == 0 {
                        start = i;
                    }
                    depth += 1;
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                b'"' | b'\'' if depth > 0 => quote = Some(byte),
                b if depth == 0 && !b.is_ascii_whitespace() => {
                    failure = Some("unexpected bytes outside a response object".to_string());
                    break;
                }
                _ => {}
            }
        }

        if let Some(reason) = failure {
            return Err(self.reject(reason));
        }

        match end {
            Some(end) => {
                let frame = self.pending[start..=end].to_vec();
                self.pending.drain(..=end);
                Ok(Some(frame))
            }
            None => {
                if depth == 0 {
                    // whitespace only
                    self.pending.clear();
                }
                Ok(None)
            }
        }
    }

    fn reject(&mut self, reason: impl Into<String>) -> RLError {
        let error = RLError::malformed_response(&self.pending, reason);
        self.pending.clear();
        error
    }
}
