use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

const VIDEO_PREFIX: &str = "video:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLink {
    /// Playable URL; carries a `t=<seconds>` parameter when the start time parsed.
    pub url: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub start_seconds: Option<u64>,
    pub end_seconds: Option<u64>,
}

/// Convert `h:m:s`, `m:s` or `s` to a number of seconds.
pub fn convert_time_to_seconds(time: &str) -> Option<u64> {
    let parts = time
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        [s] => (0, 0, *s),
        _ => return None,
    };
    h.checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl FromStr for VideoLink {
    type Err = LinkError;

    fn from_str(link: &str) -> Result<Self, Self::Err> {
        let rest = link
            .strip_prefix(VIDEO_PREFIX)
            .ok_or_else(|| LinkError::NotVideoLink(link.to_string()))?;

        let (url, fragment) = match rest.split_once('#') {
            Some((url, fragment)) => (url, Some(fragment)),
            None => (rest, None),
        };

        let (start, end) = match fragment {
            Some(fragment) => match fragment.split_once('-') {
                Some((start, end)) => (non_empty(start), non_empty(end)),
                None => (non_empty(fragment), None),
            },
            None => (None, None),
        };

        let start_seconds = start.as_deref().and_then(convert_time_to_seconds);
        let end_seconds = end.as_deref().and_then(convert_time_to_seconds);

        let mut url = url.to_string();
        if let Some(seconds) = start_seconds {
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{url}{separator}t={seconds}");
        }

        Ok(VideoLink {
            url,
            start,
            end,
            start_seconds,
            end_seconds,
        })
    }
}

pub fn parse_video_link(link: &str) -> Option<VideoLink> {
    link.parse().ok()
}
