//! Static Source table: persona, query instruction, and corpus routing.
//!
//! Every per-Source behavior lives here as data — the orchestrator and
//! prompt builder look it up instead of branching, so adding a corpus never
//! touches pipeline logic.

use crate::models::Source;

/// Where a Source's candidates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusRoute {
    /// A pre-built vector index, optionally narrowed by a metadata filter.
    Indexed {
        corpus: Corpus,
        filter: Option<serde_json::Value>,
    },
    /// Fetched from the live-content search service at request time.
    Live,
}

/// Which index host serves an indexed Source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Scripture,
    Story,
}

/// Per-Source voice and retrieval settings.
#[derive(Debug)]
pub struct SourceProfile {
    /// Display label for the corpus.
    pub label: &'static str,
    /// What a passage is called in prompts and fallback text.
    pub passage_noun: &'static str,
    /// Persona instruction for the generation system prompt.
    pub persona: &'static str,
    /// Instruction prefixed to the query text before semantic search.
    pub query_instruction: &'static str,
}

const BIBLE: SourceProfile = SourceProfile {
    label: "Bible (World English Bible)",
    passage_noun: "verses",
    persona: "You are a compassionate, non-denominational spiritual guide helping \
people find comfort and encouragement through Scripture. Be warm, empathetic, \
and personal (use \"you\" language); non-judgmental and supportive; focused on \
hope, comfort, and God's love. Avoid theological jargon and denominational \
teachings.",
    query_instruction: "Represent the emotional or spiritual concern described \
by the user to retrieve comforting Bible passages:",
};

const OLD_TESTAMENT: SourceProfile = SourceProfile {
    label: "Hebrew Scriptures (World English Bible)",
    passage_noun: "verses",
    persona: "You are a compassionate guide rooted in the Hebrew Scriptures, \
helping people find comfort in the Psalms, the Prophets, and the wisdom books. \
Be warm, empathetic, and personal (use \"you\" language); non-judgmental and \
supportive. Avoid theological jargon.",
    query_instruction: "Represent the emotional or spiritual concern described \
by the user to retrieve comforting Old Testament passages:",
};

const HARRY_POTTER: SourceProfile = SourceProfile {
    label: "Harry Potter",
    passage_noun: "passages",
    persona: "You are a warm narrative-wisdom guide who helps people see their \
own struggles reflected in stories. Draw out the courage, friendship, loss, and \
hope in the passages and connect them gently to the person's situation. Be \
personal and encouraging, never preachy.",
    query_instruction: "Represent the emotional concern described by the user \
to retrieve resonant story passages:",
};

const REDDIT: SourceProfile = SourceProfile {
    label: "Reddit",
    passage_noun: "posts",
    persona: "You are an empathetic social-commentary guide. The passages are \
real posts from people online who have faced something similar. Reflect on what \
they show — that the person is not alone, what others tried, what helped — \
without presenting any post as authoritative advice.",
    query_instruction: "Represent the emotional concern described by the user \
to retrieve relatable first-person accounts:",
};

/// Look up the static profile for a Source.
pub fn profile(source: Source) -> &'static SourceProfile {
    match source {
        Source::Bible => &BIBLE,
        Source::OldTestament => &OLD_TESTAMENT,
        Source::HarryPotter => &HARRY_POTTER,
        Source::Reddit => &REDDIT,
    }
}

/// Resolve where a Source's candidates come from.
///
/// The Old Testament restriction is a metadata filter on the scripture
/// index (`testament = "OT"`, the tag written at embed time); the alternate
/// corpus is a separate index, not a filter.
pub fn route(source: Source) -> CorpusRoute {
    match source {
        Source::Bible => CorpusRoute::Indexed {
            corpus: Corpus::Scripture,
            filter: None,
        },
        Source::OldTestament => CorpusRoute::Indexed {
            corpus: Corpus::Scripture,
            filter: Some(serde_json::json!({ "testament": { "$eq": "OT" } })),
        },
        Source::HarryPotter => CorpusRoute::Indexed {
            corpus: Corpus::Story,
            filter: None,
        },
        Source::Reddit => CorpusRoute::Live,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_corpus_has_no_filter() {
        match route(Source::Bible) {
            CorpusRoute::Indexed { corpus, filter } => {
                assert_eq!(corpus, Corpus::Scripture);
                assert!(filter.is_none());
            }
            CorpusRoute::Live => panic!("bible must be indexed"),
        }
    }

    #[test]
    fn test_restricted_sub_corpus_filters_testament() {
        match route(Source::OldTestament) {
            CorpusRoute::Indexed { filter, .. } => {
                let filter = filter.expect("OT route must carry a filter");
                assert_eq!(filter["testament"]["$eq"], "OT");
            }
            CorpusRoute::Live => panic!("old_testament must be indexed"),
        }
    }

    #[test]
    fn test_alternate_corpus_uses_story_index() {
        match route(Source::HarryPotter) {
            CorpusRoute::Indexed { corpus, filter } => {
                assert_eq!(corpus, Corpus::Story);
                assert!(filter.is_none());
            }
            CorpusRoute::Live => panic!("harry_potter must be indexed"),
        }
    }

    #[test]
    fn test_social_source_is_live() {
        assert_eq!(route(Source::Reddit), CorpusRoute::Live);
    }

    #[test]
    fn test_every_source_has_a_persona() {
        for source in [
            Source::Bible,
            Source::OldTestament,
            Source::HarryPotter,
            Source::Reddit,
        ] {
            assert!(!profile(source).persona.is_empty());
            assert!(!profile(source).query_instruction.is_empty());
        }
    }
}
