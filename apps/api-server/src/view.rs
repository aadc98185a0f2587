//! Student-facing HTML pages for the view endpoint.
//!
//! The full URL handed to these builders already has `&` encoded as `&amp;`,
//! so it can be dropped into attribute context as-is.

use domain::{DisplayMode, MimeGuesser, UrlResource};
use http_common::html_escape;

/// Page chrome shared by every view variant.
fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
        body = body,
    )
}

fn heading(resource: &UrlResource) -> String {
    format!(
        "<h2 class=\"resourceheading\">{}</h2>\n",
        html_escape(&resource.name)
    )
}

fn intro_box(resource: &UrlResource) -> String {
    if resource.intro.trim().is_empty() {
        return String::new();
    }
    // intro is stored as trusted teacher-authored HTML
    format!("<div class=\"resourceintro\">{}</div>\n", resource.intro)
}

/// Notice page for invalid or closed resources; render-time failures always
/// degrade to this instead of an error.
pub fn notice_page(resource: &UrlResource, message: &str) -> String {
    let mut body = heading(resource);
    body.push_str(&intro_box(resource));
    body.push_str(&format!("<p class=\"notice\">{}</p>\n", html_escape(message)));
    page(&resource.name, &body)
}

/// Escape a string for inclusion inside a single-quoted JS string literal.
fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Info page with a plain link to the resource; popup and new-window modes
/// get their `onclick` behavior attached to the link.
pub fn workaround_page(resource: &UrlResource, full: &str, mode: DisplayMode) -> String {
    let extra = match mode {
        DisplayMode::Popup => {
            let (width, height) = resource.display_options.popup_geometry();
            let wh = format!(
                "width={width},height={height},toolbar=no,location=no,menubar=no,copyhistory=no,status=no,directories=no,scrollbars=yes,resizable=yes"
            );
            format!(
                " onclick=\"window.open('{}', '', '{}'); return false;\"",
                js_escape(full),
                wh
            )
        }
        DisplayMode::New => " onclick=\"this.target='_blank';\"".to_string(),
        _ => String::new(),
    };

    let mut body = heading(resource);
    body.push_str(&intro_box(resource));
    body.push_str(&format!(
        "<div class=\"urlworkaround\">Click <a href=\"{full}\"{extra}>{full}</a> link to open resource.</div>\n"
    ));
    page(&resource.name, &body)
}

/// Embedded rendering: image, audio/video, or a generic object tag depending
/// on the guessed MIME type.
pub fn embed_page<M: MimeGuesser + ?Sized>(
    resource: &UrlResource,
    full: &str,
    mime: &M,
) -> String {
    let mimetype = mime.guess(&resource.external_url);
    let title = html_escape(&resource.name);

    let code = if mimetype.starts_with("image/") {
        format!("<img src=\"{full}\" alt=\"{title}\" class=\"resourceimage\"/>")
    } else if mimetype.starts_with("video/") {
        format!("<video controls src=\"{full}\" title=\"{title}\" class=\"resourcemedia\"></video>")
    } else if mimetype.starts_with("audio/") {
        format!("<audio controls src=\"{full}\" title=\"{title}\" class=\"resourcemedia\"></audio>")
    } else {
        // anything else - just try object tag enlarged as much as possible
        format!(
            "<object data=\"{full}\" type=\"{mimetype}\" width=\"100%\" height=\"600\">\
             <a href=\"{full}\">{full}</a></object>"
        )
    };

    let mut body = String::new();
    if resource.display_options.print_heading {
        body.push_str(&heading(resource));
    }
    body.push_str(code.as_str());
    body.push('\n');
    if resource.display_options.print_intro {
        body.push_str(&intro_box(resource));
    }
    page(&resource.name, &body)
}

/// Frameset page: heading frame on top, external content below.
pub fn frameset_page(
    resource: &UrlResource,
    full: &str,
    site_root: &str,
    frame_height: u32,
) -> String {
    let title = html_escape(&resource.name);
    let nav = format!("{site_root}/resources/{}/frame?frameset=top", resource.id);
    format!(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">
<html>
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8" />
    <title>{title}</title>
  </head>
  <frameset rows="{frame_height},*">
    <frame src="{nav}" title="Resource"/>
    <frame src="{full}" title="{title}"/>
  </frameset>
</html>"#
    )
}

/// Top frame of the frameset: heading and intro only.
pub fn frame_top_page(resource: &UrlResource) -> String {
    let mut body = String::new();
    if resource.display_options.print_heading {
        body.push_str(&heading(resource));
    }
    if resource.display_options.print_intro {
        body.push_str(&intro_box(resource));
    }
    if body.is_empty() {
        body = heading(resource);
    }
    page(&resource.name, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DisplayOptions, ExtensionMimeGuesser};
    use std::collections::BTreeMap;

    fn resource(url: &str) -> UrlResource {
        UrlResource {
            id: 3,
            course: 1,
            name: "My <Resource>".into(),
            intro: "<p>hello</p>".into(),
            external_url: url.into(),
            display: DisplayMode::Auto,
            display_options: DisplayOptions {
                print_heading: true,
                print_intro: true,
                ..Default::default()
            },
            parameters: BTreeMap::new(),
            time_open: 0,
            time_close: 0,
            time_modified: 0,
        }
    }

    #[test]
    fn notice_escapes_text() {
        let html = notice_page(&resource("http://e"), "closed < now");
        assert!(html.contains("closed &lt; now"));
        assert!(html.contains("My &lt;Resource&gt;"));
    }

    #[test]
    fn popup_workaround_has_window_open() {
        let mut r = resource("http://e/x");
        r.display_options.popup_width = Some(700);
        let html = workaround_page(&r, "http://e/x", DisplayMode::Popup);
        assert!(html.contains("window.open('http://e/x'"));
        assert!(html.contains("width=700,height=450"));
    }

    #[test]
    fn new_window_workaround_targets_blank() {
        let html = workaround_page(&resource("http://e/x"), "http://e/x", DisplayMode::New);
        assert!(html.contains("this.target='_blank'"));
    }

    #[test]
    fn download_workaround_is_a_plain_link() {
        let html = workaround_page(&resource("http://e/a.zip"), "http://e/a.zip", DisplayMode::Download);
        assert!(html.contains("<a href=\"http://e/a.zip\">"));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn embed_picks_markup_by_mime() {
        let g = ExtensionMimeGuesser;
        let html = embed_page(&resource("http://e/a.png"), "http://e/a.png", &g);
        assert!(html.contains("<img src=\"http://e/a.png\""));

        let html = embed_page(&resource("http://e/a.mp4"), "http://e/a.mp4", &g);
        assert!(html.contains("<video controls"));

        let html = embed_page(&resource("http://e/a.mp3"), "http://e/a.mp3", &g);
        assert!(html.contains("<audio controls"));

        let html = embed_page(&resource("http://e/a.swf"), "http://e/a.swf", &g);
        assert!(html.contains("<object data=\"http://e/a.swf\""));
    }

    #[test]
    fn frameset_wires_top_and_content_frames() {
        let html = frameset_page(&resource("http://e/x"), "http://e/x?a=1&amp;b=2", "http://root", 130);
        assert!(html.contains("rows=\"130,*\""));
        assert!(html.contains("http://root/resources/3/frame?frameset=top"));
        assert!(html.contains("<frame src=\"http://e/x?a=1&amp;b=2\""));
    }
}
