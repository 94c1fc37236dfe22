/*!
 * streaming/mod.rs
 * =================
 * Stream variant handling.
 *
 * Currently exposes:
 *   - selection: deciding which of an item's reported variants is the
 *     adaptive HTTP (HLS) stream to hand to the player.
 */
pub mod selection;

pub use selection::{is_hls_variant, select_variant};
