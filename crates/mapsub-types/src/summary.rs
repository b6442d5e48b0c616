use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Mapper;

/// Outcome of a batch subscribe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeSummary {
    pub subscribed: Vec<Mapper>,
    pub already_subscribed: Vec<Mapper>,
    /// Names rejected before reaching the store.
    pub invalid: Vec<String>,
}

/// Outcome of a batch unsubscribe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeSummary {
    pub unsubscribed: Vec<Mapper>,
    pub not_subscribed: Vec<String>,
    pub invalid: Vec<String>,
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Writes "`label` a, b." sentences, skipping empty groups.
fn write_sentences(f: &mut fmt::Formatter<'_>, groups: &[(&str, String)]) -> fmt::Result {
    let mut first = true;
    for (label, names) in groups {
        if names.is_empty() {
            continue;
        }
        if !first {
            f.write_str(" ")?;
        }
        write!(f, "{} {}.", label, names)?;
        first = false;
    }
    if first {
        f.write_str("No mappers given.")?;
    }
    Ok(())
}

impl fmt::Display for SubscribeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sentences(
            f,
            &[
                ("Subscribed to:", join(&self.subscribed)),
                ("Already subscribed to:", join(&self.already_subscribed)),
                ("Invalid mapper names:", join(&self.invalid)),
            ],
        )
    }
}

impl fmt::Display for UnsubscribeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sentences(
            f,
            &[
                ("Unsubscribed from:", join(&self.unsubscribed)),
                ("Not subscribed to:", join(&self.not_subscribed)),
                ("Invalid mapper names:", join(&self.invalid)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(id: i64, name: &str) -> Mapper {
        Mapper {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn subscribe_summary_lists_each_group() {
        let summary = SubscribeSummary {
            subscribed: vec![mapper(1, "Sotarks"), mapper(2, "Monstrata")],
            already_subscribed: vec![mapper(3, "pishifat")],
            invalid: vec!["bad!name".to_string()],
        };
        assert_eq!(
            summary.to_string(),
            "Subscribed to: Sotarks, Monstrata. Already subscribed to: pishifat. Invalid mapper names: bad!name."
        );
    }

    #[test]
    fn empty_groups_are_skipped() {
        let summary = UnsubscribeSummary {
            unsubscribed: vec![],
            not_subscribed: vec!["Sotarks".to_string()],
            invalid: vec![],
        };
        assert_eq!(summary.to_string(), "Not subscribed to: Sotarks.");
        assert_eq!(SubscribeSummary::default().to_string(), "No mappers given.");
    }
}
