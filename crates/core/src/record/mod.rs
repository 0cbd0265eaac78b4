use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{Result, SceneSnapshot};

/// One drawn frame as written to a pose trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub time: f64,
    #[serde(flatten)]
    pub scene: SceneSnapshot,
}

/// Streams [`FrameRecord`]s as JSON lines.
#[derive(Debug)]
pub struct Recorder<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> Recorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn record(&mut self, record: &FrameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glam::Vec3;

    use super::*;

    #[test]
    fn writes_one_line_per_frame() {
        let mut recorder = Recorder::new(Vec::new());
        for frame in 0..3 {
            recorder
                .record(&FrameRecord {
                    frame,
                    time: frame as f64 * 0.5,
                    scene: SceneSnapshot {
                        rotation: Vec3::ZERO,
                        weights: HashMap::from([("blink".to_string(), 0.0)]),
                    },
                })
                .unwrap();
        }
        assert_eq!(recorder.frames(), 3);

        let text = String::from_utf8(recorder.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let last: FrameRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last.frame, 2);
        assert_eq!(last.time, 1.0);
    }
}
