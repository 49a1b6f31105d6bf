//! Header directive model.

use std::fmt;

use serde::Serialize;

/// How a directive's value merges with a header's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergeTag {
    /// Overwrite unconditionally.
    #[default]
    Set,
    /// Overwrite only if the header is absent or empty.
    SetIfEmpty,
    /// Append another value.
    Add,
    /// Append only if the header already has a non-empty value.
    AddIfExist,
}

impl MergeTag {
    /// Parse a tag token, case-insensitively. Anything unrecognized is `Set`.
    pub fn parse(token: &str) -> Self {
        Self::recognize(token).unwrap_or_default()
    }

    /// Parse a tag token, `None` if unrecognized.
    pub fn recognize(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "SET" => Some(Self::Set),
            "SETIFEMPTY" => Some(Self::SetIfEmpty),
            "ADD" => Some(Self::Add),
            "ADDIFEXIST" => Some(Self::AddIfExist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::SetIfEmpty => "SETIFEMPTY",
            Self::Add => "ADD",
            Self::AddIfExist => "ADDIFEXIST",
        }
    }
}

impl fmt::Display for MergeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a directive is applied relative to the downstream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    /// Before the downstream handler runs.
    #[default]
    Early,
    /// After the downstream handler, on every exit path.
    Late,
}

impl Phase {
    /// Parse a phase token, case-insensitively. Anything unrecognized is `Early`.
    pub fn parse(token: &str) -> Self {
        Self::recognize(token).unwrap_or_default()
    }

    /// Parse a phase token, `None` if unrecognized.
    pub fn recognize(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "EARLY" => Some(Self::Early),
            "LATE" => Some(Self::Late),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Early => "EARLY",
            Self::Late => "LATE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured header rule, with its value already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    name: String,
    tag: MergeTag,
    phase: Phase,
    value: String,
}

impl Directive {
    pub fn new(
        name: impl Into<String>,
        tag: MergeTag,
        phase: Phase,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            phase,
            value: value.into(),
        }
    }

    /// Target header name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> MergeTag {
        self.tag
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Resolved value, possibly empty.
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_parsing() {
        assert_eq!(MergeTag::parse("set"), MergeTag::Set);
        assert_eq!(MergeTag::parse("SetIfEmpty"), MergeTag::SetIfEmpty);
        assert_eq!(MergeTag::parse(" add "), MergeTag::Add);
        assert_eq!(MergeTag::parse("ADDIFEXIST"), MergeTag::AddIfExist);
    }

    #[test]
    fn test_tag_defaults_to_set() {
        assert_eq!(MergeTag::parse(""), MergeTag::Set);
        assert_eq!(MergeTag::parse("append"), MergeTag::Set);
        assert_eq!(MergeTag::recognize("append"), None);
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!(Phase::parse("late"), Phase::Late);
        assert_eq!(Phase::parse("EARLY"), Phase::Early);
        assert_eq!(Phase::parse("afterwards"), Phase::Early);
        assert_eq!(Phase::parse(""), Phase::Early);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tag in [MergeTag::Set, MergeTag::SetIfEmpty, MergeTag::Add, MergeTag::AddIfExist] {
            assert_eq!(MergeTag::parse(&tag.to_string()), tag);
        }
        for phase in [Phase::Early, Phase::Late] {
            assert_eq!(Phase::parse(&phase.to_string()), phase);
        }
    }

    #[test]
    fn test_serializes_uppercase() {
        let directive = Directive::new("X-A", MergeTag::SetIfEmpty, Phase::Late, "1");
        let json = serde_json::to_value(&directive).unwrap();
        assert_eq!(json["tag"], "SETIFEMPTY");
        assert_eq!(json["phase"], "LATE");
        assert_eq!(json["name"], "X-A");
    }
}
