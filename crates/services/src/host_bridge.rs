//! Host-page side of the quiz: injects the embedded context, relays playback
//! telemetry into it and applies its visibility directives to the video.

use std::future::Future;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use retain_core::model::{PlaybackTelemetry, VideoDuration};
use retain_core::protocol::VisibilityDirective;

use crate::channel::{self, EmbedEndpoint, HostEndpoint};
use crate::config::BridgeConfig;

/// Playback state read off the page's video element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSnapshot {
    pub current_time: f64,
    /// `0.0` or non-finite while the player has not loaded metadata.
    pub duration: f64,
    pub paused: bool,
    pub ended: bool,
}

/// The host document as seen by the bridge.
///
/// Implementations own the embedded context once `mount_embed` hands them its
/// endpoint, and tear it down on `unmount_embed`.
pub trait HostPage {
    fn url(&self) -> String;
    fn is_ad_playing(&self) -> bool;
    /// `None` until the page has a video element.
    fn video(&self) -> Option<VideoSnapshot>;
    fn play(&mut self);
    fn pause(&mut self);
    fn mount_embed(&mut self, origin: &str, endpoint: EmbedEndpoint);
    fn set_embed_visible(&mut self, visible: bool);
    fn unmount_embed(&mut self);
}

pub struct HostBridge<P> {
    page: P,
    config: BridgeConfig,
    endpoint: Option<HostEndpoint>,
    current_url: String,
    navigated_at: Instant,
    injected: bool,
    embed_visible: bool,
}

impl<P: HostPage> HostBridge<P> {
    /// `now` starts the injection debounce for the page's current URL.
    #[must_use]
    pub fn new(page: P, config: BridgeConfig, now: Instant) -> Self {
        let current_url = page.url();
        Self {
            page,
            config,
            endpoint: None,
            current_url,
            navigated_at: now,
            injected: false,
            embed_visible: false,
        }
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.injected
    }

    #[must_use]
    pub fn is_embed_visible(&self) -> bool {
        self.embed_visible
    }

    /// Detect navigation. Returns `true` when the URL changed.
    ///
    /// A new URL tears the embed down and re-arms injection after a fresh
    /// debounce.
    pub fn observe_url(&mut self, now: Instant) -> bool {
        let url = self.page.url();
        if url == self.current_url {
            return false;
        }

        info!(from = %self.current_url, to = %url, "host page navigated");
        if self.injected {
            self.page.unmount_embed();
        }
        self.endpoint = None;
        self.injected = false;
        self.embed_visible = false;
        self.current_url = url;
        self.navigated_at = now;
        true
    }

    /// Mount the embedded quiz if the page is ready for it.
    ///
    /// Returns `true` only on the call that actually injects.
    pub fn try_inject(&mut self, now: Instant) -> bool {
        if self.injected {
            return false;
        }
        if now.saturating_duration_since(self.navigated_at) < self.config.inject_debounce {
            return false;
        }
        if self.page.video().is_none() {
            debug!("no video element yet; waiting to inject");
            return false;
        }
        if self.page.is_ad_playing() {
            debug!("ad playing; waiting to inject");
            return false;
        }

        let (host, embed) = channel::pair();
        self.page.mount_embed(&self.config.embed_origin, embed);
        self.endpoint = Some(host);
        self.injected = true;
        self.embed_visible = true;
        info!(url = %self.current_url, origin = %self.config.embed_origin, "quiz injected");
        true
    }

    /// Send one round of playback telemetry to the embedded quiz.
    pub fn relay_telemetry(&mut self) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        let Some(video) = self.page.video() else {
            return;
        };

        let telemetry = PlaybackTelemetry {
            url: self.page.url(),
            current_time: video.current_time,
            duration: VideoDuration::from_secs(video.duration),
            ended: video.ended,
        };
        for message in telemetry.messages() {
            if let Err(err) = endpoint.post(&message) {
                debug!(%err, "telemetry dropped");
                return;
            }
        }
    }

    /// Apply a directive from the quiz to the video and the embed.
    ///
    /// Playback is only toggled when the video is in the opposite state, so a
    /// repeated directive is a no-op.
    pub fn on_visibility_directive(&mut self, directive: VisibilityDirective) {
        let video = self.page.video();
        match directive {
            VisibilityDirective::Active => {
                if video.is_some_and(|video| !video.paused) {
                    self.page.pause();
                }
                self.set_embed_visible(true);
            }
            VisibilityDirective::Inactive => {
                if video.is_some_and(|video| video.paused && !video.ended) {
                    self.page.play();
                }
                self.set_embed_visible(false);
            }
        }
    }

    fn set_embed_visible(&mut self, visible: bool) {
        if !self.injected || self.embed_visible == visible {
            return;
        }
        self.page.set_embed_visible(visible);
        self.embed_visible = visible;
    }

    /// Apply every queued directive in arrival order. Returns how many were applied.
    pub fn drain_directives(&mut self) -> usize {
        let mut applied = 0;
        while let Some(message) = self.endpoint.as_mut().and_then(HostEndpoint::try_recv) {
            self.on_visibility_directive(message.into());
            applied += 1;
        }
        applied
    }

    /// Poll the page and relay telemetry until `shutdown` resolves.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        let mut url_poll = interval(self.config.url_poll_interval);
        url_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut telemetry = interval(self.config.telemetry_interval);
        telemetry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = url_poll.tick() => {
                    let now = Instant::now();
                    self.observe_url(now);
                    self.try_inject(now);
                }
                _ = telemetry.tick() => self.relay_telemetry(),
                directive = next_directive(&mut self.endpoint) => match directive {
                    Some(directive) => self.on_visibility_directive(directive),
                    None => {
                        debug!("embedded quiz stopped listening");
                        self.endpoint = None;
                    }
                },
            }
        }
    }
}

async fn next_directive(endpoint: &mut Option<HostEndpoint>) -> Option<VisibilityDirective> {
    match endpoint {
        Some(endpoint) => endpoint.recv().await.map(VisibilityDirective::from),
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use retain_core::protocol::{HostMessage, QuizMessage};

    const WATCH: &str = "https://www.youtube.com/watch?v=abc";

    #[derive(Default)]
    struct FakePage {
        url: String,
        ad: bool,
        video: Option<VideoSnapshot>,
        embed: Option<EmbedEndpoint>,
        visible: Option<bool>,
        mounts: usize,
        unmounts: usize,
        plays: usize,
        pauses: usize,
    }

    impl HostPage for FakePage {
        fn url(&self) -> String {
            self.url.clone()
        }

        fn is_ad_playing(&self) -> bool {
            self.ad
        }

        fn video(&self) -> Option<VideoSnapshot> {
            self.video
        }

        fn play(&mut self) {
            self.plays += 1;
            if let Some(video) = &mut self.video {
                video.paused = false;
            }
        }

        fn pause(&mut self) {
            self.pauses += 1;
            if let Some(video) = &mut self.video {
                video.paused = true;
            }
        }

        fn mount_embed(&mut self, _origin: &str, endpoint: EmbedEndpoint) {
            self.mounts += 1;
            self.embed = Some(endpoint);
        }

        fn set_embed_visible(&mut self, visible: bool) {
            self.visible = Some(visible);
        }

        fn unmount_embed(&mut self) {
            self.unmounts += 1;
            self.embed = None;
        }
    }

    fn playing(current_time: f64) -> VideoSnapshot {
        VideoSnapshot {
            current_time,
            duration: 100.0,
            paused: false,
            ended: false,
        }
    }

    fn page() -> FakePage {
        FakePage {
            url: WATCH.into(),
            video: Some(playing(0.0)),
            ..FakePage::default()
        }
    }

    fn injected_bridge() -> HostBridge<FakePage> {
        let start = Instant::now();
        let mut bridge = HostBridge::new(page(), BridgeConfig::default(), start);
        assert!(bridge.try_inject(start + Duration::from_secs(1)));
        bridge
    }

    #[tokio::test]
    async fn injection_waits_for_debounce_video_and_no_ad() {
        let start = Instant::now();
        let mut bridge = HostBridge::new(
            FakePage {
                url: WATCH.into(),
                ad: true,
                ..FakePage::default()
            },
            BridgeConfig::default(),
            start,
        );

        assert!(!bridge.try_inject(start + Duration::from_millis(500)));
        assert!(!bridge.try_inject(start + Duration::from_secs(2)));

        bridge.page_mut().video = Some(playing(0.0));
        assert!(!bridge.try_inject(start + Duration::from_secs(2)));

        bridge.page_mut().ad = false;
        assert!(bridge.try_inject(start + Duration::from_secs(2)));
        assert!(!bridge.try_inject(start + Duration::from_secs(3)));
        assert_eq!(bridge.page().mounts, 1);
        assert!(bridge.is_injected());
    }

    #[tokio::test]
    async fn navigation_tears_down_and_rearms() {
        let mut bridge = injected_bridge();
        let later = Instant::now() + Duration::from_secs(10);

        assert!(!bridge.observe_url(later));
        bridge.page_mut().url = "https://www.youtube.com/watch?v=next".into();
        assert!(bridge.observe_url(later));
        assert_eq!(bridge.page().unmounts, 1);
        assert!(bridge.page().embed.is_none());
        assert!(!bridge.is_injected());

        // Debounce restarts from the navigation.
        assert!(!bridge.try_inject(later + Duration::from_millis(200)));
        assert!(bridge.try_inject(later + Duration::from_secs(1)));
        assert_eq!(bridge.page().mounts, 2);
    }

    #[tokio::test]
    async fn telemetry_reaches_the_embed() {
        let mut bridge = injected_bridge();
        bridge.page_mut().video = Some(playing(12.5));
        bridge.relay_telemetry();

        let embed = bridge.page_mut().embed.as_mut().unwrap();
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::VideoUrl {
                video_url: WATCH.into()
            })
        );
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::CurrentTime { current_time: 12.5 })
        );
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::VideoDuration {
                video_duration: 100.0
            })
        );
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::VideoEnded { video_ended: false })
        );
        assert_eq!(embed.try_recv(), None);
    }

    #[tokio::test]
    async fn unknown_duration_is_not_relayed() {
        let mut bridge = injected_bridge();
        bridge.page_mut().video = Some(VideoSnapshot {
            duration: f64::NAN,
            ..playing(1.0)
        });
        bridge.relay_telemetry();

        let embed = bridge.page_mut().embed.as_mut().unwrap();
        let mut received = Vec::new();
        while let Some(message) = embed.try_recv() {
            received.push(message);
        }
        assert_eq!(received.len(), 3);
        assert!(
            !received
                .iter()
                .any(|message| matches!(message, HostMessage::VideoDuration { .. }))
        );
    }

    #[tokio::test]
    async fn directives_toggle_playback_idempotently() {
        let mut bridge = injected_bridge();

        bridge.on_visibility_directive(VisibilityDirective::Active);
        bridge.on_visibility_directive(VisibilityDirective::Active);
        assert_eq!(bridge.page().pauses, 1);
        assert!(bridge.is_embed_visible());

        bridge.on_visibility_directive(VisibilityDirective::Inactive);
        bridge.on_visibility_directive(VisibilityDirective::Inactive);
        assert_eq!(bridge.page().plays, 1);
        assert_eq!(bridge.page().visible, Some(false));
        assert!(!bridge.is_embed_visible());
    }

    #[tokio::test]
    async fn inactive_does_not_restart_an_ended_video() {
        let mut bridge = injected_bridge();
        bridge.page_mut().video = Some(VideoSnapshot {
            paused: true,
            ended: true,
            ..playing(100.0)
        });

        bridge.on_visibility_directive(VisibilityDirective::Inactive);
        assert_eq!(bridge.page().plays, 0);
    }

    #[tokio::test]
    async fn missing_video_after_injection_is_ignored() {
        let mut bridge = injected_bridge();
        bridge.page_mut().video = None;

        bridge.relay_telemetry();
        bridge.on_visibility_directive(VisibilityDirective::Active);
        bridge.on_visibility_directive(VisibilityDirective::Inactive);
        assert_eq!(bridge.page_mut().embed.as_mut().unwrap().try_recv(), None);
        assert_eq!(bridge.page().pauses, 0);
        assert_eq!(bridge.page().plays, 0);

        bridge.page_mut().video = Some(playing(3.0));
        bridge.relay_telemetry();
        let embed = bridge.page_mut().embed.as_mut().unwrap();
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::VideoUrl {
                video_url: WATCH.into()
            })
        );
        assert_eq!(
            embed.try_recv(),
            Some(HostMessage::CurrentTime { current_time: 3.0 })
        );
    }

    #[tokio::test]
    async fn queued_directives_apply_in_order() {
        let mut bridge = injected_bridge();
        {
            let embed = bridge.page().embed.as_ref().unwrap();
            embed.post(&QuizMessage::AppIsNotNull).unwrap();
            embed.post(&QuizMessage::AppIsNull).unwrap();
            embed.post(&QuizMessage::AppIsNotNull).unwrap();
        }

        assert_eq!(bridge.drain_directives(), 3);
        assert_eq!(bridge.page().pauses, 2);
        assert_eq!(bridge.page().plays, 1);
        assert!(bridge.is_embed_visible());
        assert_eq!(bridge.drain_directives(), 0);
    }
}
