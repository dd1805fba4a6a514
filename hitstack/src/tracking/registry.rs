//! The tracker handle and its process-wide default
//!
//! A [`Registry`] owns everything recording needs: one tracker per channel,
//! the shared frame cache and the platform collaborators. Most programs use
//! the lazily built default through the free functions at the bottom of this
//! file; tests and embedders can build their own handle, or [`install`] one as
//! the default before anything records.
//!
//! Every recording entry point calls the channel layer directly. Stack
//! capture skips a fixed number of frames, so an extra wrapper in between
//! would show up in every recorded stack.

use super::channel::{capture_backtrace, ChannelTracker};
use crate::config::{Config, LineBackend};
use crate::domain::{ChannelId, FramePointers, CHANNEL_COUNT};
use crate::platform::{BacktraceUnwinder, DlModuleLookup, ModuleLookup, Unwinder};
use crate::report::StackFrames;
use crate::symbolization::{
    Addr2lineTool, DisabledLineSource, DwarfLineSource, FrameCache, LineResolver, LineSource,
};
use log::{error, info};
use std::sync::OnceLock;

pub struct Registry {
    config: Config,
    channels: Vec<ChannelTracker>,
    cache: FrameCache,
    unwinder: Box<dyn Unwinder>,
}

impl Registry {
    /// Registry for the current process with the configured line backend
    #[must_use]
    pub fn new(config: Config) -> Self {
        let line_source: Box<dyn LineSource> = match config.line_backend {
            LineBackend::Addr2line => Box::new(Addr2lineTool::new(config.addr2line_path.clone())),
            LineBackend::Dwarf => Box::new(DwarfLineSource::new()),
            LineBackend::Off => Box::new(DisabledLineSource),
        };
        info!("Line resolution backend: {}", line_source.name());

        Self::with_platform(
            config,
            Box::new(BacktraceUnwinder),
            Box::new(DlModuleLookup),
            line_source,
        )
    }

    /// Registry with explicit collaborators
    #[must_use]
    pub fn with_platform(
        config: Config,
        unwinder: Box<dyn Unwinder>,
        loader: Box<dyn ModuleLookup>,
        line_source: Box<dyn LineSource>,
    ) -> Self {
        let lines = LineResolver::new(line_source, config.batch_size, config.unwind_inline);
        let channels = (0..CHANNEL_COUNT)
            .map(|id| ChannelTracker::new(ChannelId(u8::try_from(id).unwrap_or(u8::MAX))))
            .collect();

        Self { config, channels, cache: FrameCache::new(loader, lines), unwinder }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn frame_cache(&self) -> &FrameCache {
        &self.cache
    }

    #[must_use]
    pub fn channel(&self, channel: ChannelId) -> &ChannelTracker {
        &self.channels[channel.index()]
    }

    /// Number of distinct stacks recorded on a channel
    #[must_use]
    pub fn stack_count(&self, channel: impl Into<ChannelId>) -> usize {
        self.channel(channel.into()).len()
    }

    /// Count one hit for the caller's stack with weight 1
    ///
    /// When this call is the last thing a function does, an optimised build
    /// may turn it into a jump and that function's frame will be missing from
    /// the recorded stack.
    #[inline(never)]
    pub fn record(&self, channel: impl Into<ChannelId>) {
        let channel = self.channel(channel.into());
        if let Err(err) = channel.record(self.unwinder.as_ref(), self.config.max_frames, 1) {
            error!("{}: stack capture failed: {err}", channel.id());
        }
    }

    /// Count one hit for the caller's stack with the given weight
    #[inline(never)]
    pub fn record_with_score(&self, channel: impl Into<ChannelId>, score: i64) {
        let channel = self.channel(channel.into());
        if let Err(err) = channel.record(self.unwinder.as_ref(), self.config.max_frames, score) {
            error!("{}: stack capture failed: {err}", channel.id());
        }
    }

    /// Count one hit for a stack captured earlier with [`Registry::get_backtrace`]
    pub fn record_stack(&self, channel: impl Into<ChannelId>, stack: &FramePointers, score: i64) {
        self.channel(channel.into()).record_stack(stack.clone(), score);
    }

    /// The caller's stack, for recording later from somewhere else
    #[inline(never)]
    #[must_use]
    pub fn get_backtrace(&self) -> Option<FramePointers> {
        match capture_backtrace(self.unwinder.as_ref(), self.config.max_frames) {
            Ok(stack) => Some(stack),
            Err(err) => {
                error!("Backtrace capture failed: {err}");
                None
            }
        }
    }

    /// Resolved report rows for a channel, most hit first
    #[must_use]
    pub fn dump(&self, channel: impl Into<ChannelId>) -> Vec<StackFrames> {
        self.channel(channel.into()).dump(&self.cache, self.unwinder.as_ref())
    }
}

/// Global registry, initialized on first access.
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get the process-wide registry, building it from the environment on first
/// use.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry::new(Config::from_env()))
}

/// Make `registry` the process-wide default.
///
/// # Errors
/// Gives the registry back if a default already exists, either installed
/// earlier or built by a previous call to [`registry`].
pub fn install(registry: Registry) -> Result<(), Registry> {
    REGISTRY.set(registry)
}

/// Count one hit for the caller's stack on `channel`
///
/// Like [`Registry::record`], a call in tail position may lose the calling
/// function's frame in optimised builds.
#[inline(never)]
pub fn record(channel: impl Into<ChannelId>) {
    let registry = registry();
    let channel = registry.channel(channel.into());
    if let Err(err) = channel.record(registry.unwinder.as_ref(), registry.config.max_frames, 1) {
        error!("{}: stack capture failed: {err}", channel.id());
    }
}

/// Count one hit with weight `score` for the caller's stack on `channel`
#[inline(never)]
pub fn record_with_score(channel: impl Into<ChannelId>, score: i64) {
    let registry = registry();
    let channel = registry.channel(channel.into());
    let max_frames = registry.config.max_frames;
    if let Err(err) = channel.record(registry.unwinder.as_ref(), max_frames, score) {
        error!("{}: stack capture failed: {err}", channel.id());
    }
}

/// Count one hit for a previously captured stack
pub fn record_stack(channel: impl Into<ChannelId>, stack: &FramePointers, score: i64) {
    registry().record_stack(channel, stack, score);
}

/// Capture the caller's stack without recording it
#[inline(never)]
#[must_use]
pub fn get_backtrace() -> Option<FramePointers> {
    let registry = registry();
    match capture_backtrace(registry.unwinder.as_ref(), registry.config.max_frames) {
        Ok(stack) => Some(stack),
        Err(err) => {
            error!("Backtrace capture failed: {err}");
            None
        }
    }
}

/// Resolved report rows for `channel`, most hit first
#[must_use]
pub fn dump(channel: impl Into<ChannelId>) -> Vec<StackFrames> {
    registry().dump(channel)
}
