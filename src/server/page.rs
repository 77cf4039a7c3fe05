use crate::health::DiskUsageReport;
use crate::media::{AssetKind, Category, MediaAsset};
use crate::session::{SessionSnapshot, SessionStatus};
use std::fmt::Write;

pub struct CategoryListing {
    pub category: Category,
    pub assets: Vec<MediaAsset>,
}

pub struct DashboardView {
    pub listings: Vec<CategoryListing>,
    pub disk: Option<DiskUsageReport>,
    pub temperature: Option<f64>,
    pub session: SessionSnapshot,
    pub camera_available: bool,
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Percent-encode an asset key for use in a URL path, keeping `/`
fn encode_path(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => {
                let _ = write!(encoded, "%{:02X}", byte);
            }
        }
    }
    encoded
}

fn render_asset(html: &mut String, asset: &MediaAsset) {
    let key = asset.key();
    let url = encode_path(&key);
    let label = escape_html(&asset.name);

    let preview = match asset.kind {
        AssetKind::TimelapseFolder => "<span class=\"folder\">&#128193;</span>".to_string(),
        AssetKind::Photo | AssetKind::Video => format!(
            "<img src=\"/thumbnail/{url}\" alt=\"{label}\" loading=\"lazy\">"
        ),
    };

    let _ = write!(
        html,
        r#"<li>
  {preview}
  <a href="/download/{url}">{label}</a>
  <small>{created}</small>
  <form method="post" action="/delete">
    <input type="hidden" name="filepath" value="{value}">
    <button type="submit">Delete</button>
  </form>
</li>
"#,
        created = asset.created_at.format("%Y-%m-%d %H:%M:%S"),
        value = escape_html(&key),
    );
}

fn render_listing(html: &mut String, listing: &CategoryListing) {
    let dir = listing.category.dir_name();
    let _ = write!(
        html,
        r#"<section>
<h2>{title} ({count})</h2>
<p>
  <a href="/download_all/{dir}">Download all</a>
  <form method="post" action="/delete_all/{dir}" class="inline">
    <button type="submit">Delete all</button>
  </form>
</p>
<ul class="assets">
"#,
        title = listing.category.title(),
        count = listing.assets.len(),
    );

    if listing.assets.is_empty() {
        html.push_str("<li class=\"empty\">Nothing here yet</li>\n");
    }
    for asset in &listing.assets {
        render_asset(html, asset);
    }
    html.push_str("</ul>\n</section>\n");
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let disk = match view.disk {
        Some(d) => format!(
            "{:.1} GB used of {:.1} GB ({:.1} GB free)",
            d.used_gb, d.total_gb, d.free_gb
        ),
        None => "unavailable".to_string(),
    };
    let temperature = match view.temperature {
        Some(t) => format!("{:.1} &deg;C", t),
        None => "unavailable".to_string(),
    };

    let mut status = view.session.status.to_string();
    if view.session.cancel_requested {
        status.push_str(" (stopping)");
    }
    let preview = if !view.camera_available {
        "<p>No camera detected.</p>".to_string()
    } else if view.session.status == SessionStatus::Idle {
        // The preview holds the camera, so it is opened on demand
        "<p><a href=\"/stream\" target=\"_blank\">Open live preview</a></p>".to_string()
    } else {
        "<p>Preview paused while the camera is busy.</p>".to_string()
    };

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Lapsecam</title>
    <style>
        body {{ font-family: sans-serif; margin: 1rem; }}
        ul.assets {{ list-style: none; padding: 0; }}
        ul.assets li {{ display: flex; gap: 0.5rem; align-items: center; margin: 0.25rem 0; }}
        ul.assets img {{ max-width: 128px; max-height: 128px; }}
        form.inline, li form {{ display: inline; }}
    </style>
</head>
<body>
<h1>Lapsecam</h1>
<p>Session: <strong>{status}</strong> | Disk: {disk} | CPU: {temperature}</p>
{preview}
<section>
<h2>Capture</h2>
<p><a href="/start_photo_capture">Take photo</a></p>
<form action="/start_video_capture" method="get">
    <label>Video seconds <input type="number" name="duration" min="1" value="1"></label>
    <button type="submit">Record</button>
</form>
<form action="/start_timelapse" method="get">
    <label>Interval seconds <input type="number" name="interval" min="1" value="1"></label>
    <label>Duration minutes <input type="number" name="duration" min="1" value="1"></label>
    <button type="submit">Start timelapse</button>
</form>
<p><a href="/stop_timelapse">Stop</a></p>
</section>
"#,
        status = escape_html(&status),
    );

    for listing in &view.listings {
        render_listing(&mut html, listing);
    }

    html.push_str(
        r#"<form method="post" action="/shutdown">
    <button type="submit">Shut down</button>
</form>
</body>
</html>
"#,
    );
    html
}
