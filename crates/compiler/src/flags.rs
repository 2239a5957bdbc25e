//! Flags attached to tokens by the lexer.
//! Whitespace control markers are not tokens on their own: `{%-` or `-}}`
//! are recorded on the delimiter token they touch.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::Serialize;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize))]
    pub struct TokenFlags: u8 {
        /// `{%-`, `{{-` or `{#-`: strip trailing whitespace of the text before
        const TRIM_BEFORE = 1 << 0;
        /// `-%}`, `-}}` or `-#}`: strip leading whitespace of the text after
        const TRIM_AFTER  = 1 << 1;
    }
}
