use crate::geometry::{PixelRect, UserRect};

/// One character with its box in page device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextGlyph {
    pub ch: char,
    pub bbox: UserRect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    glyphs: Vec<TextGlyph>,
    bbox: UserRect,
}

impl TextLine {
    fn push(&mut self, glyph: TextGlyph) {
        self.bbox = if self.glyphs.is_empty() {
            glyph.bbox
        } else {
            self.bbox.union(&glyph.bbox)
        };
        self.glyphs.push(glyph);
    }

    fn accepts(&self, glyph: &TextGlyph) -> bool {
        let center = (glyph.bbox.y_min + glyph.bbox.y_max) / 2.0;
        self.glyphs.is_empty() || (center >= self.bbox.y_min && center <= self.bbox.y_max)
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|glyph| glyph.ch).collect()
    }
}

/// Reading-order position used to compare matches with anchors: a line index
/// (fractional between lines) followed by a horizontal coordinate.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct ReadingPos(f64, f64);

/// Where a search starts or stops on a page, in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Last match returned by this page.
    LastMatch,
    Point { x: f64, y: f64 },
}

/// Bounds of a page search. The start is exclusive, the stop inclusive;
/// `None` means the corresponding edge of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SearchRange {
    pub start: Option<Anchor>,
    pub stop: Option<Anchor>,
}

/// Extracted text of a page grouped into lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPage {
    lines: Vec<TextLine>,
    last_match: Option<(ReadingPos, UserRect)>,
}

impl TextPage {
    /// Groups glyphs into lines. A newline glyph, or a glyph whose vertical
    /// center falls outside the current line, starts a new line. Other control
    /// characters are dropped.
    pub fn from_glyphs(glyphs: impl IntoIterator<Item = TextGlyph>) -> Self {
        let mut lines = Vec::new();
        let mut current = TextLine::default();
        for glyph in glyphs {
            if glyph.ch == '\n' {
                if !current.glyphs.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                continue;
            }
            if glyph.ch.is_control() {
                continue;
            }
            if !current.accepts(&glyph) {
                lines.push(std::mem::take(&mut current));
            }
            current.push(glyph);
        }
        if !current.glyphs.is_empty() {
            lines.push(current);
        }
        Self {
            lines,
            last_match: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    fn reading_pos(&self, x: f64, y: f64) -> ReadingPos {
        for (index, line) in self.lines.iter().enumerate() {
            if y >= line.bbox.y_min && y < line.bbox.y_max {
                return ReadingPos(index as f64, x);
            }
            if (line.bbox.y_min + line.bbox.y_max) / 2.0 > y {
                return ReadingPos(index as f64 - 0.5, x);
            }
        }
        ReadingPos(self.lines.len() as f64 - 0.5, x)
    }

    fn resolve(&self, anchor: Anchor) -> Option<ReadingPos> {
        match anchor {
            Anchor::LastMatch => self.last_match.map(|(pos, _)| pos),
            Anchor::Point { x, y } => Some(self.reading_pos(x, y)),
        }
    }

    fn matches<'a>(
        &'a self,
        needle: &'a [char],
        case_sensitive: bool,
    ) -> impl Iterator<Item = (ReadingPos, UserRect)> + 'a {
        self.lines
            .iter()
            .enumerate()
            .flat_map(move |(index, line)| {
                let glyphs = &line.glyphs;
                let count = if needle.is_empty() || glyphs.len() < needle.len() {
                    0
                } else {
                    glyphs.len() - needle.len() + 1
                };
                (0..count).filter_map(move |start| {
                    let window = &glyphs[start..start + needle.len()];
                    let hit = window
                        .iter()
                        .zip(needle)
                        .all(|(glyph, wanted)| chars_equal(glyph.ch, *wanted, case_sensitive));
                    hit.then(|| {
                        let bbox = window
                            .iter()
                            .skip(1)
                            .fold(window[0].bbox, |acc, glyph| acc.union(&glyph.bbox));
                        (ReadingPos(index as f64, bbox.x_min), bbox)
                    })
                })
            })
    }

    /// Finds the next (or previous, when `backward`) occurrence of `needle`
    /// within `range`, returning its box in device space. A `LastMatch` start
    /// without a previous match searches from the page edge.
    pub fn find(
        &mut self,
        needle: &[char],
        range: SearchRange,
        case_sensitive: bool,
        backward: bool,
    ) -> Option<UserRect> {
        let start = range.start.and_then(|anchor| self.resolve(anchor));
        let stop = match range.stop {
            Some(anchor) => Some(self.resolve(anchor)?),
            None => None,
        };
        let found = {
            let candidates = self.matches(needle, case_sensitive).filter(|(pos, _)| {
                if backward {
                    start.map_or(true, |s| *pos < s) && stop.map_or(true, |s| *pos >= s)
                } else {
                    start.map_or(true, |s| *pos > s) && stop.map_or(true, |s| *pos <= s)
                }
            });
            if backward {
                candidates.last()
            } else {
                candidates.into_iter().next()
            }
        };
        if let Some(hit) = found {
            self.last_match = Some(hit);
        }
        found.map(|(_, bbox)| bbox)
    }

    /// Text whose glyph centers fall inside `rect`, one line per row.
    pub fn text_in(&self, rect: PixelRect) -> String {
        let rect = rect.normalized();
        let bounds = UserRect::new(
            rect.x_min as f64,
            rect.y_min as f64,
            rect.x_max as f64,
            rect.y_max as f64,
        );
        let mut out = Vec::new();
        for line in &self.lines {
            let selected: String = line
                .glyphs
                .iter()
                .filter(|glyph| {
                    let cx = (glyph.bbox.x_min + glyph.bbox.x_max) / 2.0;
                    let cy = (glyph.bbox.y_min + glyph.bbox.y_max) / 2.0;
                    bounds.contains(cx, cy)
                })
                .map(|glyph| glyph.ch)
                .collect();
            if !selected.is_empty() {
                out.push(selected);
            }
        }
        out.join("\n")
    }
}

fn chars_equal(a: char, b: char, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a == b || a.to_lowercase().eq(b.to_lowercase())
    }
}

/// Lays out `lines` as fixed-pitch glyphs, `pitch` pixels wide and `height`
/// pixels tall, starting at `(x, y)`. Handy for backends without per-glyph
/// metrics and for tests.
pub fn monospace_glyphs(lines: &[&str], x: f64, y: f64, pitch: f64, height: f64) -> Vec<TextGlyph> {
    let mut glyphs = Vec::new();
    for (row, line) in lines.iter().enumerate() {
        let top = y + row as f64 * height * 2.0;
        for (col, ch) in line.chars().enumerate() {
            let left = x + col as f64 * pitch;
            glyphs.push(TextGlyph {
                ch,
                bbox: UserRect::new(left, top, left + pitch, top + height),
            });
        }
        glyphs.push(TextGlyph {
            ch: '\n',
            bbox: UserRect::default(),
        });
    }
    glyphs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> TextPage {
        TextPage::from_glyphs(monospace_glyphs(
            &["alpha beta alpha", "gamma ALPHA"],
            10.0,
            10.0,
            5.0,
            10.0,
        ))
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn glyphs_are_grouped_into_lines() {
        let page = page();
        assert_eq!(page.lines().len(), 2);
        assert_eq!(page.lines()[1].text(), "gamma ALPHA");
    }

    #[test]
    fn forward_search_walks_matches_in_reading_order() {
        let mut page = page();
        let needle = chars("alpha");
        let first = page
            .find(&needle, SearchRange::default(), false, false)
            .unwrap();
        assert_eq!(first.x_min, 10.0);
        let range = SearchRange {
            start: Some(Anchor::LastMatch),
            stop: None,
        };
        let second = page.find(&needle, range, false, false).unwrap();
        assert_eq!(second.x_min, 10.0 + 11.0 * 5.0);
        let third = page.find(&needle, range, false, false).unwrap();
        assert_eq!((third.x_min, third.y_min), (10.0 + 6.0 * 5.0, 30.0));
        assert!(page.find(&needle, range, false, false).is_none());
    }

    #[test]
    fn case_sensitive_search_skips_other_case() {
        let mut page = page();
        let range = SearchRange {
            start: Some(Anchor::Point { x: 70.0, y: 15.0 }),
            stop: None,
        };
        assert!(page.find(&chars("alpha"), range, true, false).is_none());
    }

    #[test]
    fn backward_search_with_inclusive_stop() {
        let mut page = page();
        let needle = chars("alpha");
        let range = SearchRange {
            start: Some(Anchor::Point { x: 64.0, y: 15.0 }),
            stop: None,
        };
        let hit = page.find(&needle, range, false, true).unwrap();
        assert_eq!(hit.x_min, 10.0);

        let wrapped = SearchRange {
            start: None,
            stop: Some(Anchor::Point { x: 64.0, y: 15.0 }),
        };
        let hit = page.find(&needle, wrapped, false, true).unwrap();
        assert_eq!(hit.y_min, 30.0);
    }

    #[test]
    fn text_in_rect_uses_glyph_centers() {
        let page = page();
        let text = page.text_in(PixelRect::new(10, 10, 35, 45));
        assert_eq!(text, "alpha\ngamma");
    }
}
