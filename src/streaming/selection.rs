/*!
 * Variant Selection
 * =================
 *
 * Purpose:
 *   Pick the single best HLS variant out of the candidate formats the
 *   extraction service reports for one item.
 *
 * Strategy:
 *   1. Discard variants without a usable URL.
 *   2. Keep variants tagged as HLS: protocol containing `m3u8` or `hls`,
 *      container `m3u8`, or a format note mentioning `hls`.
 *   3. Highest height wins (missing height counts as 0), ties broken by the
 *      highest total bitrate (missing bitrate counts as 0).
 *
 * The function is pure and total. Remaining ties (same height and bitrate)
 * are settled by the lexicographically smallest URL, then by the remaining
 * fields, so the choice does not depend on the order the service listed its
 * formats in.
 */

use std::cmp::Ordering;

use crate::models::StreamVariant;

/// Whether a variant is an adaptive HTTP (HLS) stream with a usable URL
pub fn is_hls_variant(variant: &StreamVariant) -> bool {
    if variant.usable_url().is_none() {
        return false;
    }

    let protocol = variant.protocol_tag.to_ascii_lowercase();
    let ext = variant.container_ext.to_ascii_lowercase();
    let note = variant.format_note.to_ascii_lowercase();

    protocol.contains("m3u8") || protocol.contains("hls") || ext == "m3u8" || note.contains("hls")
}

/// Select the best HLS variant, or `None` when no candidate qualifies
pub fn select_variant(variants: &[StreamVariant]) -> Option<&StreamVariant> {
    variants
        .iter()
        .filter(|v| is_hls_variant(v))
        .max_by(|a, b| rank(a, b))
}

fn rank(a: &StreamVariant, b: &StreamVariant) -> Ordering {
    let height = a.height.unwrap_or(0).cmp(&b.height.unwrap_or(0));
    let bitrate = a
        .total_bitrate
        .unwrap_or(0.0)
        .total_cmp(&b.total_bitrate.unwrap_or(0.0));
    // Reversed so the smaller URL ranks higher
    let url = b.usable_url().cmp(&a.usable_url());

    height.then(bitrate).then(url).then_with(|| {
        b.url
            .cmp(&a.url)
            .then_with(|| b.protocol_tag.cmp(&a.protocol_tag))
            .then_with(|| b.container_ext.cmp(&a.container_ext))
            .then_with(|| b.format_note.cmp(&a.format_note))
            .then_with(|| a.height.cmp(&b.height))
            .then_with(|| {
                let bits = |v: &StreamVariant| v.total_bitrate.map(f64::to_bits);
                bits(a).cmp(&bits(b))
            })
    })
}
