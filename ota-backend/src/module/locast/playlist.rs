//! HLS master playlist variant selection

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";

static RESOLUTION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"RESOLUTION=(\d+)x(\d+)").ok());

/// One `#EXT-X-STREAM-INF` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub uri: String,
    /// (width, height); (0, 0) when the tag carries none
    pub resolution: (u32, u32),
}

pub fn parse_variants(playlist: &str) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut pending: Option<(u32, u32)> = None;

    for line in playlist.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(attributes) = line.strip_prefix(STREAM_INF_TAG) {
            pending = Some(parse_resolution(attributes));
        } else if line.starts_with('#') {
            continue;
        } else if let Some(resolution) = pending.take() {
            variants.push(Variant {
                uri: line.to_string(),
                resolution,
            });
        }
    }

    variants
}

/// Absolute URI of the highest resolution variant, or None when the playlist
/// is a media playlist without variants. Ties go to the later entry.
pub fn best_variant(playlist_url: &str, playlist: &str) -> Option<String> {
    let best = parse_variants(playlist)
        .into_iter()
        .max_by_key(|variant| variant.resolution)?;

    match Url::parse(playlist_url).and_then(|base| base.join(&best.uri)) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(best.uri),
    }
}

fn parse_resolution(attributes: &str) -> (u32, u32) {
    RESOLUTION_PATTERN
        .as_ref()
        .and_then(|re| re.captures(attributes))
        .and_then(|c| Some((c.get(1)?.as_str().parse().ok()?, c.get(2)?.as_str().parse().ok()?)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=1200000,RESOLUTION=854x480,CODECS=\"avc1.4d401f,mp4a.40.2\"
480/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080,CODECS=\"avc1.640028,mp4a.40.2\"
1080/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
https://cdn.example.invalid/720/index.m3u8
";

    #[test]
    fn test_parse_variants() {
        let variants = parse_variants(MASTER);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].uri, "480/index.m3u8");
        assert_eq!(variants[0].resolution, (854, 480));
        assert_eq!(variants[2].resolution, (1280, 720));
    }

    #[test]
    fn test_best_variant_is_highest_resolution() {
        assert_eq!(
            best_variant("https://stream.example.invalid/live/wcbs/master.m3u8", MASTER),
            Some("https://stream.example.invalid/live/wcbs/1080/index.m3u8".to_string())
        );
    }

    #[test]
    fn test_absolute_variant_uri_kept() {
        let playlist = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000
low.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
https://cdn.example.invalid/720/index.m3u8
";
        assert_eq!(
            best_variant("https://stream.example.invalid/master.m3u8", playlist),
            Some("https://cdn.example.invalid/720/index.m3u8".to_string())
        );
    }

    #[test]
    fn test_media_playlist_has_no_variant() {
        let media = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
segment0.ts
#EXTINF:6.0,
segment1.ts
";
        assert!(parse_variants(media).is_empty());
        assert_eq!(best_variant("https://stream.example.invalid/live.m3u8", media), None);
    }
}
