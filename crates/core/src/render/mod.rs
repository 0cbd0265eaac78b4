//! The render loop: the single continuous driver of the avatar.

use crate::mapping::{self, MouthContribution, BLINK};
use crate::viseme::{MOUTH_CLOSED, MOUTH_OPEN, SMILE};
use crate::{
    AppConfig, AudioOutput, AvatarError, AvatarModel, FrameClock, FrameRecord, IdleMotion,
    LipSyncMessage, MeshHandle, MessageFeed, MouthWeights, PlaybackClock, Result, VisemePlayer,
};

/// Draw target for the avatar.
pub trait Renderer {
    fn draw(&mut self, model: &AvatarModel, face: MeshHandle) -> Result<()>;
}

/// Headless renderer that keeps the most recent drawn state.
#[derive(Debug, Default)]
pub struct RenderGraph {
    draws: u64,
    last: Option<crate::SceneSnapshot>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn last(&self) -> Option<&crate::SceneSnapshot> {
        self.last.as_ref()
    }
}

impl Renderer for RenderGraph {
    fn draw(&mut self, model: &AvatarModel, face: MeshHandle) -> Result<()> {
        self.last = Some(model.snapshot(face)?);
        self.draws += 1;
        Ok(())
    }
}

/// Everything the running loop mutates, owned in one place.
#[derive(Debug)]
pub struct AvatarContext {
    pub model: AvatarModel,
    pub face: MeshHandle,
    pub idle: IdleMotion,
    pub player: VisemePlayer,
    pub clock: PlaybackClock,
    blink_enabled: bool,
}

impl AvatarContext {
    fn new(model: AvatarModel, config: &AppConfig) -> Result<Self> {
        let face = model.resolve_mesh(&config.model.face_mesh)?;
        let mesh = model.mesh(face)?;

        for channel in [BLINK, MOUTH_OPEN, MOUTH_CLOSED, SMILE] {
            if !mesh.has_target(channel) {
                tracing::warn!(
                    mesh = mesh.name(),
                    channel,
                    "morph target missing, channel skipped"
                );
            }
        }

        let initial = MouthWeights {
            open: mesh.weight(MOUTH_OPEN).unwrap_or(0.0),
            closed: mesh.weight(MOUTH_CLOSED).unwrap_or(0.0),
            smile: mesh.weight(SMILE).unwrap_or(0.0),
        };
        let blink_enabled = mesh.has_target(BLINK);

        Ok(Self {
            idle: IdleMotion::new(config.idle.clone()),
            player: VisemePlayer::with_weights(config.lip_sync.clone(), initial),
            clock: PlaybackClock::default(),
            model,
            face,
            blink_enabled,
        })
    }

    pub fn now(&self) -> f64 {
        self.clock.time_seconds
    }
}

enum LoopState {
    Unloaded,
    Running(Box<AvatarContext>),
}

/// Drives the avatar from `Unloaded` to `Running`, then ticks forever.
pub struct RenderLoop<R: Renderer> {
    config: AppConfig,
    state: LoopState,
    renderer: R,
    frames: u64,
}

impl<R: Renderer> RenderLoop<R> {
    pub fn new(config: AppConfig, renderer: R) -> Self {
        Self {
            config,
            state: LoopState::Unloaded,
            renderer,
            frames: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running(_))
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn context(&self) -> Option<&AvatarContext> {
        match &self.state {
            LoopState::Running(context) => Some(context),
            LoopState::Unloaded => None,
        }
    }

    /// Takes ownership of the loaded model and starts running. Happens at
    /// most once.
    pub fn load(&mut self, model: AvatarModel) -> Result<()> {
        if self.is_running() {
            return Err(AvatarError::AlreadyRunning);
        }
        let context = AvatarContext::new(model, &self.config)?;
        tracing::info!(
            model = %context.model.name,
            face = %self.config.model.face_mesh,
            "avatar loaded, render loop running"
        );
        self.state = LoopState::Running(Box::new(context));
        Ok(())
    }

    /// Hands the audio off and replaces the active lip-sync sequence.
    /// Messages that arrive before the model is loaded are dropped.
    pub fn handle_message(
        &mut self,
        message: &LipSyncMessage,
        audio: &mut impl AudioOutput,
    ) -> Result<bool> {
        let LoopState::Running(context) = &mut self.state else {
            tracing::warn!(url = %message.audio_url, "dropping message received before load");
            return Ok(false);
        };

        audio.play(&message.audio_url)?;
        let sequence = message.sequence();
        tracing::info!(frames = sequence.len(), at = context.now(), "new lip-sync sequence");
        let now = context.now();
        context.player.load(sequence, now);
        Ok(true)
    }

    /// Advances time by `delta` and draws one frame.
    pub fn tick(&mut self, delta: f32) -> Result<FrameRecord> {
        let LoopState::Running(context) = &mut self.state else {
            return Err(AvatarError::NotLoaded);
        };
        let delta = delta.max(0.0);
        context.clock.advance(delta);
        self.draw_frame(delta)
    }

    /// Like [`RenderLoop::tick`], delivering any feed messages that are due
    /// after time has advanced.
    pub fn tick_with(
        &mut self,
        delta: f32,
        feed: &mut impl MessageFeed,
        audio: &mut impl AudioOutput,
    ) -> Result<FrameRecord> {
        let LoopState::Running(context) = &mut self.state else {
            return Err(AvatarError::NotLoaded);
        };
        let delta = delta.max(0.0);
        context.clock.advance(delta);
        let now = context.now();

        while let Some(message) = feed.poll(now) {
            self.handle_message(&message, audio)?;
        }
        self.draw_frame(delta)
    }

    /// Runs `frames` ticks from `clock`, passing each drawn frame to
    /// `on_frame`.
    pub fn run(
        &mut self,
        frames: u64,
        clock: &mut impl FrameClock,
        feed: &mut impl MessageFeed,
        audio: &mut impl AudioOutput,
        mut on_frame: impl FnMut(&FrameRecord) -> Result<()>,
    ) -> Result<()> {
        for _ in 0..frames {
            let record = self.tick_with(clock.delta(), feed, audio)?;
            on_frame(&record)?;
        }
        Ok(())
    }

    fn draw_frame(&mut self, delta: f32) -> Result<FrameRecord> {
        let LoopState::Running(context) = &mut self.state else {
            return Err(AvatarError::NotLoaded);
        };
        let now = context.now();

        context.player.poll(now);
        let idle = context.idle.tick(delta, context.blink_enabled);
        context.player.smooth();

        let mouth = MouthContribution {
            tilt: context.player.tilt(),
            mouth: context.player.mouth(),
        };
        let pose = mapping::compose(&idle, &mouth);
        context.model.apply_pose(context.face, &pose)?;
        self.renderer.draw(&context.model, context.face)?;

        let record = FrameRecord {
            frame: self.frames,
            time: now,
            scene: context.model.snapshot(context.face)?,
        };
        self.frames += 1;
        Ok(record)
    }
}
