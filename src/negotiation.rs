//! Accept / Content-Type selection from candidate lists.

pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Pick the `Accept` header value from the operation's candidate list.
///
/// `application/json` wins when present (compared case-insensitively);
/// otherwise the first candidate is used; an empty list yields
/// `application/json`.
pub fn select_accept<S: AsRef<str>>(candidates: &[S]) -> String {
    select(candidates)
}

/// Pick the request `Content-Type`, with the same precedence as [`select_accept`].
pub fn select_content_type<S: AsRef<str>>(candidates: &[S]) -> String {
    select(candidates)
}

fn select<S: AsRef<str>>(candidates: &[S]) -> String {
    if let Some(json) = candidates
        .iter()
        .find(|c| c.as_ref().trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
    {
        return json.as_ref().trim().to_string();
    }
    candidates
        .first()
        .map(|c| c.as_ref().trim().to_string())
        .unwrap_or_else(|| JSON_MEDIA_TYPE.to_string())
}

/// Media type without parameters, lowercased (`"Text/Plain; charset=utf-8"` -> `"text/plain"`).
pub(crate) fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
