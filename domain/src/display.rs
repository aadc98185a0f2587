//! Display modes and the auto-mode decision procedure.

use serde::{Deserialize, Serialize};

use crate::mime::MimeGuesser;
use crate::UrlResource;

pub const DEFAULT_POPUP_WIDTH: u32 = 620;
pub const DEFAULT_POPUP_HEIGHT: u32 = 450;

/// MIME types known to cause trouble when embedded or framed from external
/// sites; force a download for these.
const DOWNLOAD_TYPES: &[&str] = &[
    "application/zip",
    "application/x-tar",
    "application/g-zip",
    "application/pdf",
    "text/html",
];

/// MIME types the page can embed inline. Must stay disjoint from
/// `DOWNLOAD_TYPES`.
const EMBED_TYPES: &[&str] = &[
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "application/x-shockwave-flash",
    "video/x-flv",
    "video/x-ms-wm",
    "video/quicktime",
    "video/mpeg",
    "video/mp4",
    "audio/mp3",
    "audio/x-realaudio-plugin",
    "x-realaudio-plugin",
];

/// Strategy for presenting the linked resource to the student.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Defer to MIME-based inference at view time.
    #[default]
    Auto,
    Embed,
    Frame,
    Open,
    Popup,
    New,
    Download,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Auto => "auto",
            DisplayMode::Embed => "embed",
            DisplayMode::Frame => "frame",
            DisplayMode::Open => "open",
            DisplayMode::Popup => "popup",
            DisplayMode::New => "new",
            DisplayMode::Download => "download",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(DisplayMode::Auto),
            "embed" => Some(DisplayMode::Embed),
            "frame" => Some(DisplayMode::Frame),
            "open" => Some(DisplayMode::Open),
            "popup" => Some(DisplayMode::Popup),
            "new" => Some(DisplayMode::New),
            "download" => Some(DisplayMode::Download),
            _ => None,
        }
    }
}

/// Per-resource display preferences. Keys are only meaningful for the modes
/// that use them; missing values fall back to fixed defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup_height: Option<u32>,
    #[serde(default)]
    pub print_heading: bool,
    #[serde(default)]
    pub print_intro: bool,
}

impl DisplayOptions {
    /// Popup window size with the 620x450 fallback for unset values.
    pub fn popup_geometry(&self) -> (u32, u32) {
        (
            self.popup_width.unwrap_or(DEFAULT_POPUP_WIDTH),
            self.popup_height.unwrap_or(DEFAULT_POPUP_HEIGHT),
        )
    }
}

/// Decide the best display format for a resource.
///
/// Explicit modes are returned unchanged. `Auto` first detects links to local
/// dynamic pages under `site_root` (anything with `.php` except `file.php`),
/// then classifies by guessed MIME type.
pub fn final_display_type<M: MimeGuesser + ?Sized>(
    resource: &UrlResource,
    site_root: &str,
    mime: &M,
) -> DisplayMode {
    if resource.display != DisplayMode::Auto {
        return resource.display;
    }

    // detect links to local pages with navigation of their own
    if !site_root.is_empty() && resource.external_url.starts_with(site_root) {
        let url = &resource.external_url;
        if !url.contains("file.php") && url.contains(".php") {
            return DisplayMode::Open;
        }
    }

    let mimetype = mime.guess(&resource.external_url);
    if DOWNLOAD_TYPES.contains(&mimetype.as_str()) {
        return DisplayMode::Download;
    }
    if EMBED_TYPES.contains(&mimetype.as_str()) {
        return DisplayMode::Embed;
    }

    // let the browser deal with it somehow
    DisplayMode::Open
}
