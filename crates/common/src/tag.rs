//! Type-tag derivation.
//!
//! A tag is the upper-snake-case form of a type name: `LoginUserCommand`
//! becomes `LOGIN_USER_COMMAND`. Handlers derive their tag from their own
//! name, cut off right after the `COMMAND` or `EVENT` segment, so
//! `LoginUserCommandHandler` registers under the same key as the message it
//! handles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const COMMAND_SEGMENT: &str = "COMMAND";
const EVENT_SEGMENT: &str = "EVENT";

/// Errors raised while deriving a handler's tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// The handler name was empty.
    #[error("cannot derive a tag from an empty handler name")]
    Empty,

    /// A handler name did not contain a `Command` or `Event` segment.
    #[error("handler `{name}` has no Command or Event segment to derive a tag from")]
    MissingKindSegment { name: String },
}

/// Which family of messages a tag belongs to, read from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Command,
    Event,
}

impl TagKind {
    /// The suffix every tag of this kind ends with.
    pub fn suffix(&self) -> &'static str {
        match self {
            TagKind::Command => "_COMMAND",
            TagKind::Event => "_EVENT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Command => "command",
            TagKind::Event => "event",
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key for a message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Wraps an already-derived tag string (e.g. one read off the wire).
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the kind implied by the tag's suffix, if any.
    pub fn kind(&self) -> Option<TagKind> {
        [TagKind::Command, TagKind::Event]
            .into_iter()
            .find(|kind| self.0.ends_with(kind.suffix()))
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Derives the tag of a message type from its name.
///
/// An underscore goes in front of every upper-case letter that follows a
/// lower-case letter, then the whole name is upper-cased. Digits never start
/// a new segment.
pub fn message_tag(type_name: &str) -> Tag {
    Tag(snake_upper(type_name))
}

/// Derives the tag a handler registers under.
///
/// The handler's name is converted like a message name and then truncated
/// after the first `COMMAND` or `EVENT` segment.
pub fn handler_tag(type_name: &str) -> Result<Tag, TagError> {
    if type_name.is_empty() {
        return Err(TagError::Empty);
    }
    let full = message_tag(type_name);

    let mut kept = Vec::new();
    for segment in full.as_str().split('_') {
        kept.push(segment);
        if segment == COMMAND_SEGMENT || segment == EVENT_SEGMENT {
            return Ok(Tag(kept.join("_")));
        }
    }

    Err(TagError::MissingKindSegment {
        name: type_name.to_string(),
    })
}

fn snake_upper(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = prev
            && c.is_uppercase()
            && p.is_lowercase()
        {
            out.push('_');
        }
        out.extend(c.to_uppercase());
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> String {
        message_tag(name).to_string()
    }

    #[test]
    fn message_tag_is_upper_snake_case() {
        assert_eq!(tag("LoginUserCommand"), "LOGIN_USER_COMMAND");
        assert_eq!(tag("ItemUpdatedEvent"), "ITEM_UPDATED_EVENT");
        assert_eq!(tag("Item2Command"), "ITEM2COMMAND");
    }

    #[test]
    fn digits_do_not_split_segments() {
        assert_eq!(tag("Oauth2LoginCommand"), "OAUTH2LOGIN_COMMAND");
        assert_eq!(tag("V2ItemCreatedEvent"), "V2ITEM_CREATED_EVENT");
    }

    #[test]
    fn message_tag_is_deterministic() {
        assert_eq!(tag("CreateItemCommand"), tag("CreateItemCommand"));
    }

    #[test]
    fn distinct_names_give_distinct_tags() {
        let names = [
            "CreateItemCommand",
            "RenameItemCommand",
            "ItemCreatedEvent",
            "ItemUpdatedEvent",
            "LoginUserCommand",
        ];
        let mut tags: Vec<String> = names.iter().map(|n| tag(n)).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), names.len());
    }

    #[test]
    fn handler_tag_truncates_after_kind_segment() {
        assert_eq!(
            handler_tag("LoginUserCommandHandler").unwrap(),
            "LOGIN_USER_COMMAND"
        );
        assert_eq!(
            handler_tag("ItemUpdatedEventHandler").unwrap(),
            "ITEM_UPDATED_EVENT"
        );
    }

    #[test]
    fn handler_tag_matches_whole_segments_only() {
        // "PREVENT" contains EVENT but is not the EVENT segment
        assert_eq!(
            handler_tag("PreventAccessCommandHandler").unwrap(),
            "PREVENT_ACCESS_COMMAND"
        );
    }

    #[test]
    fn handler_tag_without_kind_segment_is_rejected() {
        let err = handler_tag("LoginUserHandler").unwrap_err();
        assert_eq!(
            err,
            TagError::MissingKindSegment {
                name: "LoginUserHandler".to_string()
            }
        );
    }

    #[test]
    fn empty_handler_name_is_rejected() {
        assert_eq!(handler_tag("").unwrap_err(), TagError::Empty);
    }

    #[test]
    fn tag_kind_follows_suffix() {
        assert_eq!(Tag::new("LOGIN_USER_COMMAND").kind(), Some(TagKind::Command));
        assert_eq!(Tag::new("ITEM_UPDATED_EVENT").kind(), Some(TagKind::Event));
        assert_eq!(Tag::new("SET_FILTER").kind(), None);
    }
}
