//! Inbound lip-sync messages and the outbound chat submission.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use serde::{Deserialize, Serialize};

use crate::{AvatarError, Result, VisemeSequence};

/// One pushed response: the speech audio and its lip-sync track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LipSyncMessage {
    pub audio_url: String,
    /// JSON-encoded array of `{ "mouth_open": bool, "time": seconds }`.
    pub lip_sync: String,
}

impl LipSyncMessage {
    pub fn new(audio_url: impl Into<String>, sequence: &VisemeSequence) -> Result<Self> {
        Ok(Self {
            audio_url: audio_url.into(),
            lip_sync: sequence.to_json()?,
        })
    }

    /// Decoded lip-sync track. A malformed payload decodes as empty.
    pub fn sequence(&self) -> VisemeSequence {
        VisemeSequence::parse_lenient(&self.lip_sync)
    }
}

/// Push subscription delivering [`LipSyncMessage`]s. Polled once per tick.
pub trait MessageFeed {
    /// Next message available at playback time `now`, if any.
    fn poll(&mut self, now: f64) -> Option<LipSyncMessage>;
}

/// Feed backed by an in-process channel. The sending half can live on any
/// thread.
#[derive(Debug)]
pub struct ChannelFeed {
    receiver: Receiver<LipSyncMessage>,
    closed: bool,
}

impl ChannelFeed {
    pub fn new() -> (Sender<LipSyncMessage>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver,
                closed: false,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl MessageFeed for ChannelFeed {
    fn poll(&mut self, _now: f64) -> Option<LipSyncMessage> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    tracing::info!("message feed disconnected");
                    self.closed = true;
                }
                None
            }
        }
    }
}

/// A message released once playback time reaches `at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub at: f64,
    #[serde(flatten)]
    pub message: LipSyncMessage,
}

/// Replays a fixed script of messages for headless runs.
#[derive(Debug, Default, Clone)]
pub struct ScriptedFeed {
    pending: VecDeque<ScheduledMessage>,
}

impl ScriptedFeed {
    pub fn new(mut script: Vec<ScheduledMessage>) -> Self {
        script.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            pending: script.into(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let script: Vec<ScheduledMessage> = serde_json::from_str(text)?;
        Ok(Self::new(script))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl MessageFeed for ScriptedFeed {
    fn poll(&mut self, now: f64) -> Option<LipSyncMessage> {
        match self.pending.front() {
            Some(next) if next.at <= now => self.pending.pop_front().map(|entry| entry.message),
            _ => None,
        }
    }
}

/// Request body of the outbound submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message: String,
}

/// Fire-and-forget transport for user text. No response is consumed.
pub trait CommandSink {
    fn submit(&mut self, message: &OutboundMessage) -> Result<()>;
}

/// Writes each submission as one JSON line.
#[derive(Debug)]
pub struct JsonLineSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for JsonLineSink<W> {
    fn submit(&mut self, message: &OutboundMessage) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(AvatarError::from)
    }
}

/// Sends `input` unless it is blank. Returns whether anything was sent.
pub fn submit_message(sink: &mut impl CommandSink, input: &str) -> Result<bool> {
    let text = input.trim();
    if text.is_empty() {
        tracing::debug!("suppressing empty submission");
        return Ok(false);
    }
    sink.submit(&OutboundMessage {
        message: text.to_string(),
    })?;
    Ok(true)
}
