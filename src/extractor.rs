//! Token decoding and line clustering
//!
//! This module turns the upstream extractor's raw text runs into plain
//! positioned tokens and groups them into horizontal lines for layout
//! reconstruction.

use serde::{Deserialize, Serialize};

/// A document as produced by the upstream PDF-to-geometry extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(alias = "Pages")]
    pub pages: Vec<RawPage>,
}

/// One page of raw text runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(alias = "Width")]
    pub width: f32,
    #[serde(alias = "Height", default)]
    pub height: f32,
    #[serde(alias = "Texts", default)]
    pub tokens: Vec<RawTextRun>,
}

/// A positioned text run whose fragments are percent-encoded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTextRun {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub w: f32,
    #[serde(alias = "R", default)]
    pub runs: Vec<RawFragment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFragment {
    #[serde(alias = "T")]
    pub text: String,
}

/// A decoded text token with position information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Decoded text content
    pub text: String,
    /// X position (page units)
    pub x: f32,
    /// Y position (page units, grows downwards)
    pub y: f32,
    /// Width of the run
    pub width: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
        }
    }

    /// Trimmed text, used for all pattern matching
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Outcome of decoding one raw run
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Percent-decoding succeeded
    Clean(Token),
    /// Decoding failed; the token keeps the raw text
    Fallback(Token),
    /// The decoded text was all whitespace
    Blank,
}

/// A line of text (tokens sharing an approximate y position)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub tokens: Vec<Token>,
    /// Y of the first token assigned to the line
    pub y: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Decode one raw run into a token
pub fn decode_run(run: &RawTextRun) -> Decoded {
    let raw: String = run.runs.iter().map(|f| f.text.as_str()).collect();

    let (text, clean) = match urlencoding::decode(&raw) {
        Ok(text) => (text.into_owned(), true),
        Err(_) => (raw.clone(), false),
    };

    if text.trim().is_empty() {
        return Decoded::Blank;
    }

    let token = Token::new(text, run.x, run.y, run.w);
    if clean {
        Decoded::Clean(token)
    } else {
        Decoded::Fallback(token)
    }
}

/// Decode every run on a page, dropping blank ones.
///
/// Returns the tokens plus the raw text of runs that fell back to their
/// undecoded form.
pub fn decode_page(page: &RawPage) -> (Vec<Token>, Vec<String>) {
    let mut tokens = Vec::with_capacity(page.tokens.len());
    let mut fallbacks = Vec::new();

    for run in &page.tokens {
        match decode_run(run) {
            Decoded::Clean(token) => tokens.push(token),
            Decoded::Fallback(token) => {
                log::warn!("Could not percent-decode {:?}, keeping raw text", token.text);
                fallbacks.push(token.text.clone());
                tokens.push(token);
            }
            Decoded::Blank => {}
        }
    }

    (tokens, fallbacks)
}

/// Group tokens into lines, top to bottom.
///
/// Single greedy pass over tokens sorted by (y, x). A new line starts when a
/// token's y differs from the first token of the current line by at least
/// `y_tolerance`; the tolerance is anchored to that first token so long
/// near-horizontal runs cannot drift.
pub fn group_into_lines(mut tokens: Vec<Token>, y_tolerance: f32) -> Vec<TextLine> {
    if tokens.is_empty() {
        return Vec::new();
    }

    tokens.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();

    for token in tokens {
        let starts_new = lines
            .last()
            .map_or(true, |line| (token.y - line.y).abs() >= y_tolerance);

        if starts_new {
            let y = token.y;
            lines.push(TextLine {
                tokens: vec![token],
                y,
            });
        } else if let Some(line) = lines.last_mut() {
            line.tokens.push(token);
        }
    }

    // Sort tokens within each line by X position (left to right)
    for line in &mut lines {
        line.tokens.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    lines
}
