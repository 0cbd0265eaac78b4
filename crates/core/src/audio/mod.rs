use std::sync::{Arc, Mutex, MutexGuard};

use crate::{AvatarError, Result};

/// External element that plays the speech audio for a message. Its
/// timeline runs independently of the viseme alarm.
pub trait AudioOutput {
    fn play(&mut self, url: &str) -> Result<()>;
}

/// Audio output that only logs the hand-off.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAudio;

impl AudioOutput for LoggingAudio {
    fn play(&mut self, url: &str) -> Result<()> {
        tracing::info!(url, "audio playback requested");
        Ok(())
    }
}

/// Thread-safe audio output that remembers every URL it was handed.
/// Clones share the same history.
#[derive(Debug, Default, Clone)]
pub struct SharedAudio {
    played: Arc<Mutex<Vec<String>>>,
}

impl SharedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs handed over so far, oldest first.
    pub fn played(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.clone())
    }

    /// The URL currently playing, if any.
    pub fn current(&self) -> Result<Option<String>> {
        Ok(self.lock()?.last().cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<String>>> {
        self.played
            .lock()
            .map_err(|_| AvatarError::msg("audio history has been poisoned"))
    }
}

impl AudioOutput for SharedAudio {
    fn play(&mut self, url: &str) -> Result<()> {
        self.lock()?.push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_history() {
        let audio = SharedAudio::new();
        let mut handle = audio.clone();
        handle.play("https://example.com/a.mp3").unwrap();
        handle.play("https://example.com/b.mp3").unwrap();

        assert_eq!(audio.played().unwrap().len(), 2);
        assert_eq!(
            audio.current().unwrap().as_deref(),
            Some("https://example.com/b.mp3")
        );
    }
}
