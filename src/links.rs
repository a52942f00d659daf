use lazy_regex::regex_captures;

pub const YOUTUBE_LINK_EXAMPLE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Turns any of the usual YouTube link shapes into `https://www.youtube.com/watch?v=<id>`.
pub fn normalize_youtube_link(link: &str) -> Option<String> {
    let link = link.trim();

    let id = if let Some((_whole, id)) = regex_captures!(
        r#"^https?://(?:www\.|m\.|music\.)?youtube\.com/watch\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})(?:[&#].*)?$"#,
        link
    ) {
        id
    } else if let Some((_whole, id)) = regex_captures!(
        r#"^https?://youtu\.be/([A-Za-z0-9_-]{11})/?(?:[?#].*)?$"#,
        link
    ) {
        id
    } else {
        let (_whole, id) = regex_captures!(
            r#"^https?://(?:www\.|m\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})/?(?:[?#].*)?$"#,
            link
        )?;
        id
    };

    Some(format!("https://www.youtube.com/watch?v={id}"))
}
