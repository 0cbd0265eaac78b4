//! Core library for the lip-sync avatar.
//!
//! A single render loop drives a morph-target avatar from two sources:
//! procedural idle motion generated locally, and lip-sync tracks pushed
//! alongside speech audio. Each subsystem lives in its own module and the
//! loop composes their output into one pose per tick.

pub mod analysis;
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod feed;
pub mod idle;
pub mod mapping;
pub mod record;
pub mod render;
pub mod scene;
pub mod timeline;
pub mod viseme;

pub use analysis::{generate_lip_sync, rms_envelope};
pub use assets::{AssetStore, AvatarAsset, MeshAsset};
pub use audio::{AudioOutput, LoggingAudio, SharedAudio};
pub use config::{
    AnalysisConfig, AppConfig, IdleConfig, LipSyncConfig, ModelConfig, RenderConfig, TimingMode,
};
pub use error::{AvatarError, Result};
pub use feed::{
    submit_message, ChannelFeed, CommandSink, JsonLineSink, LipSyncMessage, MessageFeed,
    OutboundMessage, ScheduledMessage, ScriptedFeed,
};
pub use idle::{compute_idle_pose, IdleMotion, IdlePose, IdleState};
pub use mapping::{compose, MouthContribution, Pose, WeightUpdate};
pub use record::{FrameRecord, Recorder};
pub use render::{AvatarContext, RenderGraph, RenderLoop, Renderer};
pub use scene::{AvatarModel, MeshHandle, MorphMesh, SceneSnapshot};
pub use timeline::{Alarm, FixedStepClock, FrameClock, PlaybackClock, SystemClock, Ticket};
pub use viseme::{
    Advance, MouthWeights, PlaybackState, VisemeFrame, VisemePlayer, VisemeSequence,
};
