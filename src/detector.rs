//! Classifies intercepted write requests as "create a reply".
//!
//! The GraphQL path segments of the target API change between deployments, so
//! only a coarse URL allow-list is applied and the decision is made on the
//! payload shape.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;

pub const DEFAULT_URL_PATTERNS: [&str; 2] = [
    "*://x.com/i/api/graphql/*/CreateTweet*",
    "*://twitter.com/i/api/graphql/*/CreateTweet*",
];

#[derive(Deserialize)]
struct CreateBody {
    variables: Option<Variables>,
}

#[derive(Deserialize)]
struct Variables {
    reply: Option<ReplyTarget>,
}

#[derive(Deserialize)]
struct ReplyTarget {
    in_reply_to_tweet_id: Option<serde_json::Value>,
}

/// True iff the body names a non-empty `variables.reply.in_reply_to_tweet_id`.
/// Bodies that do not parse are simply not replies.
pub fn is_reply_request(raw_body: &[u8]) -> bool {
    let Ok(body) = serde_json::from_slice::<CreateBody>(raw_body) else {
        return false;
    };

    matches!(
        body.variables
            .and_then(|variables| variables.reply)
            .and_then(|reply| reply.in_reply_to_tweet_id),
        Some(serde_json::Value::String(id)) if !id.is_empty()
    )
}

/// Allow-list of request URLs worth inspecting. `*` matches any run of
/// characters, `/` included.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl UrlFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            builder.add(
                GlobBuilder::new(pattern)
                    .literal_separator(false)
                    .backslash_escape(false)
                    .build()?,
            );
        }
        Ok(Self {
            patterns,
            set: builder.build()?,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.set.is_match(url)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(DEFAULT_URL_PATTERNS).unwrap_or_else(|_| Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_body_is_detected() {
        assert!(is_reply_request(
            br#"{"variables":{"reply":{"in_reply_to_tweet_id":"42"}}}"#
        ));
        assert!(is_reply_request(
            br#"{"queryId":"q","variables":{"tweet_text":"hi","reply":{"in_reply_to_tweet_id":"1767","exclude_reply_user_ids":[]}},"features":{}}"#
        ));
    }

    #[test]
    fn missing_null_or_empty_target_is_not_a_reply() {
        assert!(!is_reply_request(br#"{"variables":{"reply":{}}}"#));
        assert!(!is_reply_request(
            br#"{"variables":{"reply":{"in_reply_to_tweet_id":null}}}"#
        ));
        assert!(!is_reply_request(
            br#"{"variables":{"reply":{"in_reply_to_tweet_id":""}}}"#
        ));
        assert!(!is_reply_request(br#"{"variables":{"reply":null}}"#));
        assert!(!is_reply_request(br#"{"variables":{"tweet_text":"a new post"}}"#));
        assert!(!is_reply_request(br#"{}"#));
    }

    #[test]
    fn non_string_target_is_not_a_reply() {
        assert!(!is_reply_request(
            br#"{"variables":{"reply":{"in_reply_to_tweet_id":42}}}"#
        ));
    }

    #[test]
    fn unparseable_bodies_are_not_replies() {
        let bodies: [&[u8]; 7] = [
            b"",
            b"not json",
            b"{\"variables\":",
            b"\xff\xfe\x00",
            b"[1,2,3]",
            b"\"in_reply_to_tweet_id\"",
            b"variables=reply&in_reply_to_tweet_id=42",
        ];
        for body in bodies {
            assert!(!is_reply_request(body));
        }
    }

    #[test]
    fn default_filter_matches_create_endpoints() {
        let filter = UrlFilter::default();
        assert!(filter.matches("https://x.com/i/api/graphql/abc123/CreateTweet"));
        assert!(filter.matches("https://twitter.com/i/api/graphql/a/b/CreateTweet?x=1"));
        assert!(!filter.matches("https://x.com/i/api/graphql/abc123/FavoriteTweet"));
        assert!(!filter.matches("https://example.com/i/api/graphql/abc/CreateTweet"));
    }

    #[test]
    fn custom_patterns_replace_the_defaults() {
        let filter = UrlFilter::new(["https://localhost/*/CreateReply"]).unwrap();
        assert!(filter.matches("https://localhost/v2/CreateReply"));
        assert!(!filter.matches("https://x.com/i/api/graphql/abc/CreateTweet"));
        assert_eq!(filter.patterns(), ["https://localhost/*/CreateReply".to_string()]);
    }
}
