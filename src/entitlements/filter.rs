//! Strips sticker tokens a message author is not entitled to use.
//!
//! Message text is treated as chunks separated by single spaces. A chunk of
//! the exact shape `sticker::<set id>::<sticker id>` is a sticker token;
//! anything else (including near-misses like `sticker::42` or
//! `sticker::a::b`) is plain text and passes through untouched. Unowned
//! tokens are replaced with the empty string, which leaves the surrounding
//! spaces in place, so filtering never disturbs the spacing of the rest of
//! the message.

use crate::data::StoreResult;
use crate::data::ids::{StickerId, StickerSetId, UserId};
use crate::entitlements::{Snapshot, Synchronizer};

/// Replace sticker tokens the author does not own with empty chunks.
///
/// Text without any sticker token is returned as-is without consulting the
/// author's entitlements. Otherwise one snapshot covers every token in the
/// message.
pub async fn sanitize(sync: &Synchronizer, author: UserId, text: &str) -> StoreResult<String> {
    if !text
        .split(' ')
        .any(|chunk| parse_sticker_token(chunk).is_some())
    {
        return Ok(text.to_owned());
    }

    let snapshot = sync.snapshot(author).await?;
    let filtered = text
        .split(' ')
        .map(|chunk| match parse_sticker_token(chunk) {
            Some((set, sticker)) if !owns(&snapshot, set, sticker) => "",
            _ => chunk,
        })
        .collect::<Vec<_>>()
        .join(" ");
    Ok(filtered)
}

/// Parse `sticker::<set id>::<sticker id>`. Anything but exactly that shape
/// is `None`.
fn parse_sticker_token(chunk: &str) -> Option<(StickerSetId, StickerId)> {
    let mut parts = chunk.split("::");
    if parts.next()? != "sticker" {
        return None;
    }
    let set = parse_id(parts.next()?)?;
    let sticker = parse_id(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((StickerSetId::new(set), StickerId::new(sticker)))
}

/// An id part is digits only. `u64::from_str` tolerates a leading `+`, which
/// is not an id.
fn parse_id(part: &str) -> Option<u64> {
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// The author owns the sticker iff the set is in their snapshot and lists
/// the sticker. A token naming a real set with a foreign sticker id does
/// not count.
fn owns(snapshot: &Snapshot, set: StickerSetId, sticker: StickerId) -> bool {
    snapshot
        .get(&set)
        .is_some_and(|owned| owned.stickers.iter().any(|s| s.id == sticker))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::MemoryKv;
    use crate::entitlements::sync::testing::{StaticSource, make_set};
    use crate::entitlements::{EntitlementCache, StickerSet};

    const AUTHOR: UserId = UserId::new(1);

    fn synchronizer(sets: Vec<StickerSet>) -> (Synchronizer, Arc<StaticSource>) {
        let cache = Arc::new(EntitlementCache::new(
            Arc::new(MemoryKv::new()),
            Duration::from_secs(3600),
        ));
        let source = Arc::new(StaticSource::with_sets(sets));
        (Synchronizer::new(cache, source.clone()), source)
    }

    // -- token parsing --

    #[test]
    fn well_formed_token_parses() {
        assert_eq!(
            parse_sticker_token("sticker::42::7"),
            Some((StickerSetId::new(42), StickerId::new(7)))
        );
    }

    #[test]
    fn near_miss_chunks_are_not_tokens() {
        for chunk in [
            "sticker",
            "sticker::42",
            "sticker::42::7::9",
            "sticker::a::7",
            "sticker::42::b",
            "sticker::-1::7",
            "sticker::+42::7",
            "sticker::42::+7",
            "sticker::+42::+7",
            "Sticker::42::7",
            "sticker42::7",
            "::42::7",
            "",
        ] {
            assert_eq!(parse_sticker_token(chunk), None, "chunk {chunk:?}");
        }
    }

    // -- sanitize --

    #[tokio::test]
    async fn plain_text_skips_the_entitlement_lookup() {
        let (sync, source) = synchronizer(vec![]);

        let out = sanitize(&sync, AUTHOR, "hello world, no stickers here")
            .await
            .unwrap();

        assert_eq!(out, "hello world, no stickers here");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn owned_token_passes_through_with_spacing_intact() {
        let (sync, _) = synchronizer(vec![make_set(42, &[7])]);

        let out = sanitize(&sync, AUTHOR, "hello sticker::42::7  world")
            .await
            .unwrap();

        assert_eq!(out, "hello sticker::42::7  world");
    }

    #[tokio::test]
    async fn unowned_token_becomes_an_empty_chunk() {
        let (sync, _) = synchronizer(vec![]);

        let out = sanitize(&sync, AUTHOR, "hi sticker::42::7 bye").await.unwrap();

        assert_eq!(out, "hi  bye");
    }

    #[tokio::test]
    async fn owned_set_does_not_cover_a_foreign_sticker_id() {
        let (sync, _) = synchronizer(vec![make_set(42, &[7])]);

        let out = sanitize(&sync, AUTHOR, "sticker::42::8").await.unwrap();

        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn tokens_are_filtered_independently() {
        let (sync, _) = synchronizer(vec![make_set(42, &[7])]);

        let out = sanitize(&sync, AUTHOR, "sticker::42::7 sticker::43::9")
            .await
            .unwrap();

        assert_eq!(out, "sticker::42::7 ");
    }

    #[tokio::test]
    async fn malformed_tokens_survive_even_with_nothing_owned() {
        let (sync, source) = synchronizer(vec![]);

        let out = sanitize(&sync, AUTHOR, "sticker::42 sticker::a::b sticker::+99::1")
            .await
            .unwrap();

        assert_eq!(out, "sticker::42 sticker::a::b sticker::+99::1");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn one_snapshot_covers_every_token() {
        let (sync, source) = synchronizer(vec![make_set(42, &[7])]);

        sanitize(
            &sync,
            AUTHOR,
            "sticker::42::7 sticker::43::9 sticker::44::1",
        )
        .await
        .unwrap();

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_identity() {
        let (sync, _) = synchronizer(vec![]);

        assert_eq!(sanitize(&sync, AUTHOR, "").await.unwrap(), "");
    }
}
