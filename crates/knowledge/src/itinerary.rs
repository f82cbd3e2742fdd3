//! Parsing of generated itineraries into day blocks and time slots.
//!
//! Generated text is only loosely structured, so parsing never fails: missing
//! structure yields fewer blocks or slots. Text without any `Day N` marker
//! becomes a single implicit `Day 1` block.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Peekable;
use std::sync::LazyLock;

/// Label of the implicit block used when no day marker is present.
pub const DEFAULT_DAY_LABEL: &str = "Day 1";

// Group 1 is the marker. It must not follow a Latin letter ("Sunday 8"),
// but may follow CJK text or punctuation.
static DAY_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(Day\s*\d+[^\n]*)").expect("valid regex")
});

// One slot per line; an empty slot never borrows the next line.
static TIME_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*-[ \t]*(上午|下午|晚上|(?i:morning|afternoon|evening))[ \t]*[：:][ \t]*([^\n]+)",
    )
    .expect("valid regex")
});

/// Part of the day a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "上午" | "morning" => Some(Self::Morning),
            "下午" | "afternoon" => Some(Self::Afternoon),
            "晚上" | "evening" => Some(Self::Evening),
            _ => None,
        }
    }

    /// Chinese label used in generated text.
    pub fn label_zh(&self) -> &'static str {
        match self {
            Self::Morning => "上午",
            Self::Afternoon => "下午",
            Self::Evening => "晚上",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        };
        f.write_str(name)
    }
}

/// One timed entry of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: TimeOfDay,
    pub text: String,
}

/// A borrowed day block: its heading and full text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySegment<'a> {
    /// Trimmed marker line, e.g. `Day 2：老城漫步`
    pub label: &'a str,

    /// Marker line plus body, trimmed
    pub text: &'a str,
}

impl<'a> DaySegment<'a> {
    pub fn slots(&self) -> TimeSlots<'a> {
        time_slots(self.text)
    }
}

/// Lazy iterator over the day blocks of a text.
pub struct DaySegments<'a> {
    text: &'a str,
    markers: Peekable<regex::CaptureMatches<'static, 'a>>,
    fallback_pending: bool,
}

impl<'a> Iterator for DaySegments<'a> {
    type Item = DaySegment<'a>;

    fn next(&mut self) -> Option<DaySegment<'a>> {
        if self.fallback_pending {
            self.fallback_pending = false;
            return Some(DaySegment {
                label: DEFAULT_DAY_LABEL,
                text: self.text,
            });
        }

        let marker = self.markers.next()?.get(1)?;
        let end = self
            .markers
            .peek()
            .and_then(|next| next.get(1))
            .map(|next| next.start())
            .unwrap_or(self.text.len());

        Some(DaySegment {
            label: marker.as_str().trim(),
            text: self.text[marker.start()..end].trim(),
        })
    }
}

/// Split `text` at `Day N` markers.
///
/// Text before the first marker belongs to no block. Without any marker the
/// whole input is yielded once as `Day 1`.
pub fn day_segments(text: &str) -> DaySegments<'_> {
    DaySegments {
        text,
        markers: DAY_MARKER.captures_iter(text).peekable(),
        fallback_pending: !DAY_MARKER.is_match(text),
    }
}

/// Lazy iterator over `- 上午：...` style lines.
pub struct TimeSlots<'a> {
    captures: regex::CaptureMatches<'static, 'a>,
}

impl<'a> Iterator for TimeSlots<'a> {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<TimeSlot> {
        for caps in self.captures.by_ref() {
            let time = caps.get(1).and_then(|m| TimeOfDay::from_label(m.as_str()));
            let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if let Some(time) = time {
                if !text.is_empty() {
                    return Some(TimeSlot {
                        time,
                        text: text.to_string(),
                    });
                }
            }
        }
        None
    }
}

/// Extract time slots from a block of text, in order.
pub fn time_slots(text: &str) -> TimeSlots<'_> {
    TimeSlots {
        captures: TIME_SLOT.captures_iter(text),
    }
}

/// An owned day block with its slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBlock {
    pub label: String,
    pub text: String,
    pub slots: Vec<TimeSlot>,
}

/// A slot that can be saved as a favorite downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCandidate {
    pub day_label: String,
    pub time: TimeOfDay,
    pub text: String,
}

/// A parsed itinerary; always has at least one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub days: Vec<DayBlock>,
}

impl Itinerary {
    /// Slots of every day that has any; days without slots are skipped.
    pub fn favorite_candidates(&self) -> Vec<FavoriteCandidate> {
        self.days
            .iter()
            .filter(|day| !day.slots.is_empty())
            .flat_map(|day| {
                day.slots.iter().map(move |slot| FavoriteCandidate {
                    day_label: day.label.clone(),
                    time: slot.time,
                    text: slot.text.clone(),
                })
            })
            .collect()
    }
}

/// Parse generated text into day blocks and their time slots.
pub fn parse_itinerary(text: &str) -> Itinerary {
    let days = day_segments(text)
        .map(|segment| DayBlock {
            label: segment.label.to_string(),
            text: segment.text.to_string(),
            slots: segment.slots().collect(),
        })
        .collect();

    Itinerary { days }
}
