use crate::error::{ErrorPolicy, Result, StrictPolicy};
use crate::merge::options::{KeySelection, UpdateOptions};
use crate::merge::strategy::StrategyTable;
use crate::merge::{clear_shadowed, is_shadowed};
use crate::path::{flatten, flatten_keys, unflatten, unflatten_only};
use crate::types::Document;
use std::borrow::Cow;
use tracing::debug;

/// Combines documents key by key according to [`UpdateOptions`].
pub struct Merger {
    policy: Box<dyn ErrorPolicy>,
}

impl Default for Merger {
    fn default() -> Self {
        Merger::new()
    }
}

impl Merger {
    pub fn new() -> Self {
        Merger {
            policy: Box::new(StrictPolicy),
        }
    }

    pub fn with_policy(mut self, policy: impl ErrorPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Return a new document: `doc` updated with every key of `other`.
    pub fn update_with(&self, doc: &Document, other: &Document, options: &UpdateOptions) -> Result<Document> {
        self.update(doc, other, options)
            .map_err(|err| self.policy.raise(err))
    }

    /// Like [`update_with`](Self::update_with) but never overwrites keys
    /// already present in `doc`.
    pub fn merge_with(&self, doc: &Document, other: &Document) -> Result<Document> {
        self.update_with(doc, other, &UpdateOptions::new().overwrite(false))
    }

    fn update(&self, doc: &Document, other: &Document, options: &UpdateOptions) -> Result<Document> {
        let table = StrategyTable::from_options(options)?;
        let flattened = !options.flatten.is_nothing();

        let (mut target, incoming): (Document, Cow<'_, Document>) = match &options.flatten {
            _ if !flattened => (doc.clone(), Cow::Borrowed(other)),
            KeySelection::Keys(keys) => (
                flatten_keys(doc, keys, true),
                Cow::Owned(flatten_keys(other, keys, true)),
            ),
            _ => (flatten(doc, true), Cow::Owned(flatten(other, true))),
        };
        debug!(keys = incoming.len(), flattened, "updating document");

        for (key, value) in incoming.iter() {
            if let Some(strategy) = table.get(key) {
                let combined = strategy.apply(key, target.get(key), value)?;
                target.insert(key.clone(), combined);
                continue;
            }

            let present = target.contains_key(key) || (flattened && is_shadowed(&target, key));
            if present && !options.overwrite.covers(key) {
                continue;
            }
            if flattened {
                clear_shadowed(&mut target, key);
            }
            target.insert(key.clone(), value.clone());
        }

        match &options.flatten {
            _ if !flattened => Ok(target),
            KeySelection::Keys(keys) => unflatten_only(&target, keys),
            _ => unflatten(&target),
        }
    }
}
