//! Media attached to a guided answer.
//!
//! The panel owns the media it displays; playback is requested through
//! [`crate::navigator::NavEvent::PlayMedia`] and handled by [`MediaPanel::play`].

use anyhow::{anyhow, Result};
use std::process::{Command, Stdio};

use crate::backend::Media;
use crate::format::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPanel {
    media: Media,
    base_url: String,
}

impl MediaPanel {
    /// None when the reply carried no playable media.
    pub fn new(media: Media, base_url: &str) -> Option<Self> {
        if media.video.is_none() && media.audio.is_none() {
            return None;
        }
        Some(Self {
            media,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn kinds(&self) -> Vec<MediaKind> {
        let mut kinds = Vec::new();
        if self.media.video.is_some() {
            kinds.push(MediaKind::Video);
        }
        if self.media.audio.is_some() {
            kinds.push(MediaKind::Audio);
        }
        kinds
    }

    pub fn label(&self, kind: MediaKind) -> String {
        match kind {
            MediaKind::Video => match &self.media.video {
                Some(v) if !v.mime.is_empty() => format!("Play video ({})", v.mime),
                _ => "Play video".to_string(),
            },
            MediaKind::Audio => match &self.media.audio {
                Some(a) if !a.mime.is_empty() => format!("Play audio ({})", a.mime),
                _ => "Play audio".to_string(),
            },
        }
    }

    pub fn resolve(&self, kind: MediaKind) -> Option<String> {
        let url = match kind {
            MediaKind::Video => &self.media.video.as_ref()?.url,
            MediaKind::Audio => &self.media.audio.as_ref()?.url,
        };
        Some(self.absolute(url))
    }

    /// Hands the media URL to the desktop's default opener.
    pub fn play(&self, kind: MediaKind) -> Result<String> {
        let url = self
            .resolve(kind)
            .ok_or_else(|| anyhow!("no {kind:?} attached to this answer"))?;
        open_url(&url)?;
        log::info!("opened {kind:?} {url}");
        Ok(url)
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from(r#"<div class="media-container">"#);
        if let Some(video) = &self.media.video {
            html.push_str("<video controls preload=\"metadata\"");
            if let Some(poster) = &video.poster {
                html.push_str(&format!(" poster=\"{}\"", escape_html(&self.absolute(poster))));
            }
            html.push_str(&format!(
                "><source src=\"{}\" type=\"{}\"></video>",
                escape_html(&self.absolute(&video.url)),
                escape_html(&video.mime)
            ));
        }
        if let Some(audio) = &self.media.audio {
            html.push_str(&format!(
                "<audio controls preload=\"metadata\"><source src=\"{}\" type=\"{}\"></audio>",
                escape_html(&self.absolute(&audio.url)),
                escape_html(&audio.mime)
            ));
        }
        html.push_str("</div>");
        html
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

fn open_url(url: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("could not launch a media player: {e}"))?;
    Ok(())
}
