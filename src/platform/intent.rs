//! Control-phrase classification
//!
//! Free-form messages in the control channel are classified into intents for
//! the controller. Anything unrecognized yields `None` and is ignored, never
//! an error. Stop targets accept a bare numeric artifact id or a full message
//! link (`https://…/channels/<scope-group>/<channel>/<artifact>`).

use crate::types::{ArtifactRef, IntentKind};

/// Classify a free-form control message. Returns `None` for anything that is
/// not a recognized control phrase.
pub fn classify(content: &str) -> Option<IntentKind> {
    let normalized = content.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if normalized.contains("start match lane assignments") || normalized.contains("start laning") {
        // An optional trailing number is an explicit duration in seconds
        let duration_seconds = normalized
            .split_whitespace()
            .last()
            .and_then(|token| token.parse::<u64>().ok());
        return Some(IntentKind::Start { duration_seconds });
    }

    if normalized.starts_with("stop match") {
        // Accept: "stop match", "stop match <id>", "stop match <link>"
        let target = content
            .trim()
            .splitn(3, char::is_whitespace)
            .nth(2)
            .and_then(parse_artifact_target);
        return Some(IntentKind::Stop { target });
    }

    if normalized.contains("pause match") {
        return Some(IntentKind::Pause);
    }

    if normalized.contains("resume match") {
        return Some(IntentKind::Resume);
    }

    if normalized.contains("time remaining") || normalized.contains("match status") {
        return Some(IntentKind::Status);
    }

    None
}

/// Parse a stop target: either a bare numeric artifact id or a full message
/// link whose last path segment is the artifact id.
pub fn parse_artifact_target(s: &str) -> Option<ArtifactRef> {
    let s = s.trim().trim_matches(|c| c == '<' || c == '>').trim();

    if let Some(rest) = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
    {
        let mut segments = rest.split('/');
        // host / "channels" / scope-group / channel / artifact
        segments.next()?;
        if segments.next()? != "channels" {
            return None;
        }
        segments.next()?;
        segments.next()?;
        return segments.next()?.parse().ok();
    }

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }

    None
}

/// Whether a text channel's name carries match controls
pub fn is_control_channel(channel_name: &str, control_channel: &str) -> bool {
    channel_name.eq_ignore_ascii_case(control_channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_start() {
        assert_eq!(
            classify("Start match lane assignments"),
            Some(IntentKind::Start {
                duration_seconds: None
            })
        );
        assert_eq!(
            classify("start laning 300"),
            Some(IntentKind::Start {
                duration_seconds: Some(300)
            })
        );
    }

    #[test]
    fn test_classify_stop_variants() {
        assert_eq!(classify("stop match"), Some(IntentKind::Stop { target: None }));
        assert_eq!(
            classify("stop match 123456"),
            Some(IntentKind::Stop {
                target: Some(123456)
            })
        );
        assert_eq!(
            classify("stop match https://example.com/channels/1/2/987"),
            Some(IntentKind::Stop { target: Some(987) })
        );
        // Unparseable target degrades to "stop the active match here"
        assert_eq!(
            classify("stop match nonsense"),
            Some(IntentKind::Stop { target: None })
        );
        // Prefix match: anything starting with "stop match" is a stop request
        assert_eq!(
            classify("stop matching me"),
            Some(IntentKind::Stop { target: None })
        );
    }

    #[test]
    fn test_classify_pause_resume_status() {
        assert_eq!(classify("please pause match now"), Some(IntentKind::Pause));
        assert_eq!(classify("resume match"), Some(IntentKind::Resume));
        assert_eq!(classify("time remaining?"), Some(IntentKind::Status));
        assert_eq!(classify("match status"), Some(IntentKind::Status));
    }

    #[test]
    fn test_classify_ignores_noise() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("hello everyone"), None);
        assert_eq!(classify("please stop"), None);
    }

    #[test]
    fn test_parse_artifact_target() {
        assert_eq!(parse_artifact_target("12345"), Some(12345));
        assert_eq!(parse_artifact_target("<12345>"), Some(12345));
        assert_eq!(
            parse_artifact_target("https://chat.example.com/channels/11/22/33"),
            Some(33)
        );
        assert_eq!(parse_artifact_target("https://chat.example.com/other/1/2/3"), None);
        assert_eq!(parse_artifact_target("12a45"), None);
        assert_eq!(parse_artifact_target(""), None);
    }

    #[test]
    fn test_is_control_channel() {
        assert!(is_control_channel("Lane-Assignment", "lane-assignment"));
        assert!(!is_control_channel("general", "lane-assignment"));
    }
}
