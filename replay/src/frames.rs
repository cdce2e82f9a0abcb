//! JSON-lines frame records read by and written from the replay tool

use serde::{Deserialize, Serialize};
use sorttrack::FrameResult;
use std::io::{BufRead, Write};

/// One input line: the detector output for a single frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionFrame {
    /// Rows of [x1, y1, x2, y2]; malformed rows are left to the tracker to reject
    #[serde(default)]
    pub detections: Vec<Vec<f32>>,
}

/// One output line
#[derive(Debug, Clone, Serialize)]
pub struct TrackFrame {
    pub frame: u32,
    pub tracks: Vec<TrackRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackRecord {
    pub id: u32,
    pub bbox: [f32; 4],
}

impl From<&FrameResult> for TrackFrame {
    fn from(result: &FrameResult) -> Self {
        Self {
            frame: result.frame,
            tracks: result
                .tracks
                .iter()
                .map(|t| TrackRecord {
                    id: t.id,
                    bbox: t.bbox.to_bounds(),
                })
                .collect(),
            rejected: result.rejected.clone(),
            errors: result.errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Reads one `DetectionFrame` per non-blank line
///
/// A line that is not valid JSON still counts as a frame: it comes back as
/// an empty frame together with the parse error, so frame numbering stays
/// aligned with the input.
pub struct FrameReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = std::io::Result<(DetectionFrame, Option<String>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = match serde_json::from_str::<DetectionFrame>(&line) {
                Ok(frame) => (frame, None),
                Err(e) => (
                    DetectionFrame::default(),
                    Some(format!("line {}: {}", self.line_no, e)),
                ),
            };
            return Some(Ok(parsed));
        }
    }
}

/// Write one frame as a JSON line
pub fn write_frame<W: Write>(writer: &mut W, frame: &TrackFrame) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, frame)?;
    writer.write_all(b"\n")?;
    Ok(())
}
