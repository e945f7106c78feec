use std::fmt;
use thiserror::Error;
use url::Url;

use crate::protocol::HostMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VideoUrlError {
    #[error("invalid video url {raw:?}: {reason}")]
    Invalid { raw: String, reason: String },
}

//
// ─── VIDEO URL ────────────────────────────────────────────────────────────────
//

/// Address of the host page the video plays on.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoUrl(Url);

impl VideoUrl {
    /// # Errors
    ///
    /// Returns `VideoUrlError::Invalid` if `raw` is not an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, VideoUrlError> {
        Url::parse(raw.trim())
            .map(Self)
            .map_err(|err| VideoUrlError::Invalid {
                raw: raw.to_owned(),
                reason: err.to_string(),
            })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VideoUrl({})", self.0)
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

//
// ─── DURATION ─────────────────────────────────────────────────────────────────
//

/// Total length of the video in seconds; `0.0` means "not known yet".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct VideoDuration(f64);

impl VideoDuration {
    pub const UNKNOWN: Self = Self(0.0);

    /// Anything that is not a finite positive length maps to `UNKNOWN`.
    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(secs)
        } else {
            Self::UNKNOWN
        }
    }

    #[must_use]
    pub fn secs(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self.0 > 0.0
    }
}

//
// ─── TELEMETRY ────────────────────────────────────────────────────────────────
//

/// One snapshot of the host page's playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTelemetry {
    pub url: String,
    pub current_time: f64,
    pub duration: VideoDuration,
    pub ended: bool,
}

impl PlaybackTelemetry {
    /// Split the snapshot into the individual messages relayed to the quiz.
    ///
    /// Duration is omitted while unknown, and a non-finite current time is
    /// never sent.
    #[must_use]
    pub fn messages(&self) -> Vec<HostMessage> {
        let mut out = Vec::with_capacity(4);
        out.push(HostMessage::VideoUrl {
            video_url: self.url.clone(),
        });
        if self.current_time.is_finite() {
            out.push(HostMessage::CurrentTime {
                current_time: self.current_time,
            });
        }
        if self.duration.is_known() {
            out.push(HostMessage::VideoDuration {
                video_duration: self.duration.secs(),
            });
        }
        out.push(HostMessage::VideoEnded {
            video_ended: self.ended,
        });
        out
    }
}
