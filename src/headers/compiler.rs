//! Directive compilation.
//!
//! # Responsibilities
//! - Split `name[:tag[:phase]]` keys into their components
//! - Resolve each value's placeholders exactly once
//! - Partition directives into early and late lists
//!
//! # Design Decisions
//! - Unknown tag/phase tokens degrade to `SET`/`EARLY` with a warning
//! - Declaration order is kept within each list; nothing is deduplicated
//! - Components past the third are ignored

use serde::Serialize;

use crate::headers::directive::{Directive, MergeTag, Phase};
use crate::headers::expression::{self, Lookups};

/// Compiled directives, partitioned by phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectiveSet {
    early: Vec<Directive>,
    late: Vec<Directive>,
}

impl DirectiveSet {
    /// Build from already-resolved directives, routing each by its phase.
    pub fn from_directives(directives: impl IntoIterator<Item = Directive>) -> Self {
        let (late, early): (Vec<_>, Vec<_>) = directives
            .into_iter()
            .partition(|d| d.phase() == Phase::Late);
        Self { early, late }
    }

    pub fn early(&self) -> &[Directive] {
        &self.early
    }

    pub fn late(&self) -> &[Directive] {
        &self.late
    }

    pub fn len(&self) -> usize {
        self.early.len() + self.late.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a configuration key into header name, tag and phase.
pub fn parse_key(key: &str) -> (&str, MergeTag, Phase) {
    let mut parts = key.split(':');
    let name = parts.next().unwrap_or_default();
    let tag = parts.next().map(|t| parse_tag(key, t)).unwrap_or_default();
    let phase = parts.next().map(|p| parse_phase(key, p)).unwrap_or_default();
    (name, tag, phase)
}

fn parse_tag(key: &str, token: &str) -> MergeTag {
    MergeTag::recognize(token).unwrap_or_else(|| {
        if !token.trim().is_empty() {
            tracing::warn!(key = %key, tag = %token, "Unknown merge tag, using SET");
        }
        MergeTag::default()
    })
}

fn parse_phase(key: &str, token: &str) -> Phase {
    Phase::recognize(token).unwrap_or_else(|| {
        if !token.trim().is_empty() {
            tracing::warn!(key = %key, phase = %token, "Unknown phase, using EARLY");
        }
        Phase::default()
    })
}

/// Compile one `(key, raw value)` entry.
pub fn compile_entry<L: Lookups + ?Sized>(key: &str, raw_value: &str, lookups: &L) -> Directive {
    let (name, tag, phase) = parse_key(key);
    let value = expression::resolve(raw_value, lookups);
    tracing::debug!(
        header = %name,
        tag = %tag,
        phase = %phase,
        value = %value,
        "Compiled header directive"
    );
    Directive::new(name, tag, phase, value)
}

/// Compile configuration entries, in order, into a [`DirectiveSet`].
pub fn compile<I, K, V, L>(entries: I, lookups: &L) -> DirectiveSet
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
    L: Lookups + ?Sized,
{
    let set = DirectiveSet::from_directives(
        entries
            .into_iter()
            .map(|(k, v)| compile_entry(k.as_ref(), v.as_ref(), lookups)),
    );
    tracing::info!(
        early = set.early().len(),
        late = set.late().len(),
        "Header directives compiled"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::expression::ProcessLookups;
    use crate::headers::identity::RuntimeIdentity;
    use std::collections::HashMap;

    fn lookups() -> ProcessLookups {
        let mut props = HashMap::new();
        props.insert("build".to_string(), "abc123".to_string());
        let identity =
            RuntimeIdentity::from_sources(Some("web-3".into()), Some(12), "12@web-3".into());
        ProcessLookups::with_identity(props, identity)
    }

    #[test]
    fn test_missing_tag_and_phase_default() {
        let (name, tag, phase) = parse_key("X-Frame-Options");
        assert_eq!(name, "X-Frame-Options");
        assert_eq!(tag, MergeTag::Set);
        assert_eq!(phase, Phase::Early);

        let (_, tag, phase) = parse_key("X-A:add");
        assert_eq!(tag, MergeTag::Add);
        assert_eq!(phase, Phase::Early);
    }

    #[test]
    fn test_full_key() {
        let (name, tag, phase) = parse_key("Cache-Control:setifempty:late");
        assert_eq!(name, "Cache-Control");
        assert_eq!(tag, MergeTag::SetIfEmpty);
        assert_eq!(phase, Phase::Late);
    }

    #[test]
    fn test_malformed_components_degrade() {
        let (name, tag, phase) = parse_key("X-A:bogus:whenever");
        assert_eq!(name, "X-A");
        assert_eq!(tag, MergeTag::Set);
        assert_eq!(phase, Phase::Early);

        let (name, tag, phase) = parse_key("X-A::late:extra");
        assert_eq!(name, "X-A");
        assert_eq!(tag, MergeTag::Set);
        assert_eq!(phase, Phase::Late);
    }

    #[test]
    fn test_partition_preserves_order() {
        let entries = vec![
            ("X-1", "a"),
            ("X-2:add:late", "b"),
            ("X-1:add", "c"),
            ("X-3:set:late", "d"),
            ("X-1", "e"),
        ];
        let set = compile(entries, &lookups());

        let early: Vec<_> = set.early().iter().map(|d| (d.name(), d.value())).collect();
        let late: Vec<_> = set.late().iter().map(|d| (d.name(), d.value())).collect();
        assert_eq!(early, vec![("X-1", "a"), ("X-1", "c"), ("X-1", "e")]);
        assert_eq!(late, vec![("X-2", "b"), ("X-3", "d")]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_values_resolved_at_compile_time() {
        let set = compile(
            [("X-Build", "{{PROP:build}}"), ("X-Node:add:late", "{{SYS:HOSTNAME}}-{{SYS:PID}}")],
            &lookups(),
        );
        assert_eq!(set.early()[0].value(), "abc123");
        assert_eq!(set.late()[0].value(), "web-3-12");
    }

    #[test]
    fn test_empty_configuration() {
        let set = compile(Vec::<(String, String)>::new(), &lookups());
        assert!(set.is_empty());
        assert!(set.early().is_empty());
        assert!(set.late().is_empty());
    }
}
