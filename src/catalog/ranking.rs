//! Model preference tables and ranking.
//!
//! Each provider has a static preference table (rank 1 = best) that doubles
//! as its known-good list when discovery is unavailable. Discovered models
//! in the table take its rank; the rest are dropped unless needed to fill a
//! top-five listing, in which case undated ids are preferred over dated
//! snapshots.

use crate::types::{ModelCapability, NormalizedModel, Provider};

/// Minimum listing size that unranked models are used to fill.
pub const TOP_N: usize = 5;

const OPENAI_PREFERENCE: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];

const CLAUDE_PREFERENCE: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

const GEMINI_PREFERENCE: &[&str] = &[
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.0-pro",
];

/// Preferred model ids for `provider`, best first.
pub fn preference_table(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::OpenAi => OPENAI_PREFERENCE,
        Provider::Claude => CLAUDE_PREFERENCE,
        Provider::Gemini => GEMINI_PREFERENCE,
    }
}

/// Rank of `id` in the preference table, if listed.
pub fn rank_of(provider: Provider, id: &str) -> Option<u32> {
    preference_table(provider)
        .iter()
        .position(|known| *known == id)
        .map(|pos| pos as u32 + 1)
}

/// The known-good list served when discovery is unavailable.
pub fn static_models(provider: Provider) -> Vec<NormalizedModel> {
    preference_table(provider)
        .iter()
        .enumerate()
        .map(|(pos, id)| {
            let model = NormalizedModel::new(provider, *id, pos as u32 + 1);
            match provider {
                Provider::OpenAi if !id.starts_with("gpt-4o") => model,
                _ => model.with_capability(ModelCapability::Vision),
            }
        })
        .collect()
}

/// Whether the id ends in a snapshot date or numeric version
/// (`-20240229`, `-2024-08-06`, `-0613`, `-001`).
pub(crate) fn is_dated(id: &str) -> bool {
    let parts: Vec<&str> = id.split('-').collect();
    let digits = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match parts.as_slice() {
        [.., y, m, d] if digits(y, 4) && digits(m, 2) && digits(d, 2) => true,
        [_, .., last] => numeric(last) && last.len() >= 3,
        _ => false,
    }
}

/// Assign ranks, drop surplus unranked models, and sort best first.
pub fn rank(provider: Provider, discovered: Vec<NormalizedModel>) -> Vec<NormalizedModel> {
    let (mut ranked, mut unranked): (Vec<_>, Vec<_>) = discovered
        .into_iter()
        .map(|mut model| {
            model.rank = rank_of(provider, &model.id).unwrap_or(u32::MAX);
            model
        })
        .partition(|model| model.rank != u32::MAX);

    ranked.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id.cmp(&b.id)));
    ranked.dedup_by(|a, b| a.id == b.id);

    if ranked.len() < TOP_N {
        unranked.sort_by(|a, b| {
            is_dated(&a.id)
                .cmp(&is_dated(&b.id))
                .then_with(|| a.id.cmp(&b.id))
        });
        unranked.dedup_by(|a, b| a.id == b.id);
        let base = preference_table(provider).len() as u32;
        let fill = TOP_N - ranked.len();
        ranked.extend(unranked.into_iter().take(fill).enumerate().map(|(i, mut model)| {
            model.rank = base + i as u32 + 1;
            model
        }));
    }

    ranked
}
