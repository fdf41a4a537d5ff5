//! SMS length budgeting and truncation.
//!
//! Carriers give a single message 160 characters while the body stays inside
//! the GSM 7-bit alphabet, and only 70 once anything pushes the message into
//! UCS-2. A few symbols from the GSM extension table additionally cost a
//! second septet each. [`truncate_for_sms`] folds all of that into one call:
//! it computes the budget for the given text and shortens it to fit, marking
//! shortened output with a trailing `...`.
//!
//! Everything here is pure and allocation happens only when a message actually
//! needs shortening. The functions never log; callers that want to surface a
//! truncation should compare input and output (a returned [`Cow::Owned`] means
//! the text was cut).

use std::borrow::Cow;

/// Characters billed as two septets by the GSM 03.38 extension table.
///
/// This set comes from provider documentation and is carried verbatim; it is
/// not derivable from the encoding rules alone.
const ESCAPED_CHARACTERS: [char; 9] = ['|', '^', '{', '}', '€', '[', '~', ']', '\\'];

/// Per-segment character limit for GSM 7-bit encoded messages.
const GSM_MAX_LENGTH: i64 = 160;

/// Per-segment character limit once a message falls back to UCS-2.
const UCS2_MAX_LENGTH: i64 = 70;

const ELLIPSIS: &str = "...";

/// Returns true if `text` contains any character that would flip the carrier
/// into the reduced 70-character UCS-2 encoding.
///
/// This is a raw scan for anything outside U+0000..=U+007E. It is an imperfect
/// stand-in for the real GSM 7-bit alphabet (which admits a handful of
/// characters above that range), but it errs on the safe side: we may budget
/// 70 for a message that would have fit 160, never the reverse.
pub fn contains_unicode(text: &str) -> bool {
    text.chars().any(|c| c > '\u{7E}')
}

/// Number of characters in `text` that consume an extra unit of the outbound
/// encoding budget. Every occurrence counts, repeats included.
pub fn escape_character_count(text: &str) -> usize {
    text.chars().filter(|c| ESCAPED_CHARACTERS.contains(c)).count()
}

/// Maximum number of characters `text` may occupy in a single segment.
///
/// Starts from 160 (or 70 when [`contains_unicode`] trips), then subtracts
/// `buffer` characters the caller wants to reserve for content appended after
/// truncation (a signature, a link), then subtracts one unit per escaped
/// character. The result can be zero or negative when the reservations exceed
/// the base; [`truncate_to`] copes with that.
pub fn max_length(text: &str, buffer: usize) -> i64 {
    let mut max = if contains_unicode(text) {
        UCS2_MAX_LENGTH
    } else {
        GSM_MAX_LENGTH
    };

    max -= buffer as i64;
    max -= escape_character_count(text) as i64;

    max
}

/// Returns `text` cut down to at most `limit` characters.
///
/// Text that already fits is returned borrowed and untouched, even at exactly
/// `limit` characters. Longer text keeps its first `limit - 3` characters and
/// ends with `...`, so a truncated result is exactly `limit` characters long.
/// Limits below 3 clamp the kept prefix to zero characters and the result
/// collapses to the bare marker; the function is total either way.
pub fn truncate_to(text: &str, limit: i64) -> Cow<'_, str> {
    let length = text.chars().count() as i64;
    if length <= limit {
        return Cow::Borrowed(text);
    }

    let keep = (limit - ELLIPSIS.len() as i64).max(0) as usize;
    let mut result: String = text.chars().take(keep).collect();
    result.push_str(ELLIPSIS);
    Cow::Owned(result)
}

/// Shortens `text` to fit the carrier budget computed by [`max_length`].
///
/// This is the one entry point senders call before handing a body to the
/// outbound transport. `buffer` reserves room for text the caller will append
/// afterwards; pass 0 when sending the body as-is.
pub fn truncate_for_sms(text: &str, buffer: usize) -> Cow<'_, str> {
    truncate_to(text, max_length(text, buffer))
}
