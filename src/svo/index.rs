//! In-memory SVO indices.
//!
//! `SvoIndex::build` ingests a triple stream into the two indices driving
//! the co-occurrence builders: pair -> context observations (in corpus
//! order) and context -> (pair, count) observations, plus the sorted table
//! of distinct contexts whose position is the canonical context id.

use crate::error::PipelineResult;
use crate::types::{ContextOccurrence, ContextPairs, Pair, PairContexts, Triple};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default)]
pub struct SvoIndex {
    pub pair_to_contexts: PairContexts,
    pub contexts_to_pairs: ContextPairs,
    pub unique_contexts: Vec<String>,
}

impl SvoIndex {
    /// Build the indices from a triple stream.
    pub fn build<I>(triples: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = PipelineResult<Triple>>,
    {
        let mut pair_to_contexts = PairContexts::default();
        let mut contexts_to_pairs = ContextPairs::default();
        let mut contexts = BTreeSet::new();

        for triple in triples {
            let triple = triple?;
            let (pair, is_forward) = Pair::canonical(&triple.subject, &triple.object);

            pair_to_contexts
                .entry(pair.clone())
                .or_default()
                .push(ContextOccurrence {
                    verb: triple.verb.clone(),
                    count: triple.count,
                    is_forward,
                });
            contexts_to_pairs
                .entry(triple.verb.clone())
                .or_default()
                .push((pair, triple.count));
            contexts.insert(triple.verb);
        }

        Ok(Self {
            pair_to_contexts,
            contexts_to_pairs,
            unique_contexts: contexts.into_iter().collect(),
        })
    }

    /// Canonical id of a context, by binary search over the sorted table.
    pub fn context_id(&self, verb: &str) -> Option<usize> {
        self.unique_contexts
            .binary_search_by(|v| v.as_str().cmp(verb))
            .ok()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_contexts.is_empty()
    }

    /// Serialize the pair index back to SVO lines.
    ///
    /// Produces the same multiset of lines the index was built from
    /// (order follows the pair index, not the source file).
    pub fn write_svo<W: Write>(&self, writer: &mut W, path: &Path) -> PipelineResult<()> {
        for (pair, contexts) in &self.pair_to_contexts {
            for occurrence in contexts {
                let (s, o) = if occurrence.is_forward {
                    (&pair.0, &pair.1)
                } else {
                    (&pair.1, &pair.0)
                };
                let line = format!("{s}\t{}\t{o}\t{}", occurrence.verb, occurrence.count);
                writeln!(writer, "{line}").map_err(|e| crate::error::PipelineError::FileWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svo::SvoReader;
    use std::io::Cursor;

    const CORPUS: &str = "alice\tlikes\trome\t3\n\
                          rome\tattracts\talice\t2\n\
                          bob\tlikes\tparis\t5\n";

    fn build(corpus: &str) -> SvoIndex {
        SvoIndex::build(SvoReader::new(
            Cursor::new(corpus.to_string()),
            Path::new("test.svo"),
        ))
        .unwrap()
    }

    #[test]
    fn groups_both_orientations_under_one_pair() {
        let index = build(CORPUS);
        let pair = Pair("alice".into(), "rome".into());
        let contexts = &index.pair_to_contexts[&pair];
        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].is_forward);
        assert!(!contexts[1].is_forward);
    }

    #[test]
    fn unique_contexts_are_sorted_and_deduplicated() {
        let index = build(CORPUS);
        assert_eq!(index.unique_contexts, vec!["attracts", "likes"]);
        assert_eq!(index.context_id("likes"), Some(1));
        assert_eq!(index.context_id("visits"), None);
    }

    #[test]
    fn empty_corpus_builds_empty_indices() {
        let index = build("");
        assert!(index.is_empty());
        assert!(index.pair_to_contexts.is_empty());
        assert!(index.contexts_to_pairs.is_empty());
    }

    #[test]
    fn svo_round_trips_through_the_index() {
        let index = build(CORPUS);
        let mut out = Vec::new();
        index.write_svo(&mut out, Path::new("out.svo")).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut expected: Vec<&str> = CORPUS.lines().collect();
        let mut produced: Vec<&str> = text.lines().collect();
        expected.sort_unstable();
        produced.sort_unstable();
        assert_eq!(expected, produced);
    }
}
