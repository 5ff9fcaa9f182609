use super::markup::StyledSegment;
use crate::error::LayoutResult;
use crate::pdf::font::{FontMetrics, units_to_points};

/// A span of text drawn with one font at one position. Runs coming out of
/// the line breaker carry `x` relative to the line start and `y == 0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub emphasized: bool,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualLine {
    pub runs: Vec<Run>,
    pub width: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct FontPair<'a> {
    pub regular: &'a FontMetrics,
    pub emphasized: &'a FontMetrics,
}

impl<'a> FontPair<'a> {
    pub fn get(&self, emphasized: bool) -> &'a FontMetrics {
        if emphasized {
            self.emphasized
        } else {
            self.regular
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece<'s> {
    text: &'s str,
    emphasized: bool,
    segment: usize,
}

/// A word and the whitespace in front of it, each split into pieces by the
/// segment they came from.
#[derive(Debug, Default)]
struct Word<'s> {
    gap: Vec<Piece<'s>>,
    pieces: Vec<Piece<'s>>,
}

/// Greedy word wrap over styled segments.
pub struct LineBreaker<'a> {
    fonts: FontPair<'a>,
    font_size: f32,
    max_width: f32,
}

impl<'a> LineBreaker<'a> {
    pub fn new(fonts: FontPair<'a>, font_size: f32, max_width: f32) -> Self {
        Self {
            fonts,
            font_size,
            max_width,
        }
    }

    /// Wraps one paragraph. A word is never split: when it is wider than
    /// the line on its own it gets a line to itself and overflows.
    ///
    /// Whitespace between two words on the same line is kept as written and
    /// stays in the segment it came from, so every run is a substring of a
    /// single segment. Whitespace at a break is dropped.
    pub fn break_segments(&self, segments: &[StyledSegment]) -> LayoutResult<Vec<VisualLine>> {
        let mut lines = Vec::new();
        let mut line = LineBuilder::default();

        for word in split_words(segments) {
            let word_units = self.units(&word.pieces)?;
            if line.is_empty() {
                line.push(&word.pieces, word_units);
                continue;
            }
            let gap_units = self.units(&word.gap)?;
            let candidate = line.units + gap_units + word_units;
            if units_to_points(candidate, self.font_size) > self.max_width {
                lines.push(self.finish(std::mem::take(&mut line))?);
            } else {
                line.push(&word.gap, gap_units);
            }
            line.push(&word.pieces, word_units);
        }
        if !line.is_empty() {
            lines.push(self.finish(line)?);
        }
        Ok(lines)
    }

    fn units(&self, pieces: &[Piece<'_>]) -> LayoutResult<u32> {
        let mut units = 0;
        for piece in pieces {
            units += self.fonts.get(piece.emphasized).units_of_text(piece.text)?;
        }
        Ok(units)
    }

    fn finish(&self, line: LineBuilder) -> LayoutResult<VisualLine> {
        let mut runs = Vec::with_capacity(line.runs.len());
        let mut x = 0.0;
        for pending in line.runs {
            let width = self
                .fonts
                .get(pending.emphasized)
                .width_of_text(&pending.text, self.font_size)?;
            runs.push(Run {
                text: pending.text,
                emphasized: pending.emphasized,
                x,
                y: 0.0,
            });
            x += width;
        }
        Ok(VisualLine {
            runs,
            width: units_to_points(line.units, self.font_size),
        })
    }
}

struct PendingRun {
    text: String,
    emphasized: bool,
    segment: usize,
}

#[derive(Default)]
struct LineBuilder {
    runs: Vec<PendingRun>,
    units: u32,
}

impl LineBuilder {
    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Appends `pieces`, extending the last run while they come from the
    /// same segment.
    fn push(&mut self, pieces: &[Piece<'_>], units: u32) {
        for piece in pieces {
            match self.runs.last_mut() {
                Some(run) if run.segment == piece.segment => run.text.push_str(piece.text),
                _ => self.runs.push(PendingRun {
                    text: piece.text.to_string(),
                    emphasized: piece.emphasized,
                    segment: piece.segment,
                }),
            }
        }
        self.units += units;
    }
}

/// Splits segments into words at whitespace. Text from neighbouring segments
/// that is not separated by whitespace stays in one word, so `foo**bar**` is
/// a single two-piece word. Trailing whitespace is dropped.
fn split_words(segments: &[StyledSegment]) -> Vec<Word<'_>> {
    let mut words = Vec::new();
    let mut word = Word::default();
    for (segment, styled) in segments.iter().enumerate() {
        for (blank, text) in spans(&styled.text) {
            let piece = Piece {
                text,
                emphasized: styled.emphasized,
                segment,
            };
            if !blank {
                word.pieces.push(piece);
                continue;
            }
            if !word.pieces.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            word.gap.push(piece);
        }
    }
    if !word.pieces.is_empty() {
        words.push(word);
    }
    words
}

/// Alternating runs of whitespace and non-whitespace, flagged `true` for
/// whitespace.
fn spans(text: &str) -> Vec<(bool, &str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut current = None;
    for (idx, ch) in text.char_indices() {
        let blank = ch.is_whitespace();
        match current {
            Some(kind) if kind == blank => {}
            Some(kind) => {
                spans.push((kind, &text[start..idx]));
                start = idx;
                current = Some(blank);
            }
            None => current = Some(blank),
        }
    }
    if let Some(kind) = current {
        spans.push((kind, &text[start..]));
    }
    spans
}
