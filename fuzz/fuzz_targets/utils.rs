use std::str;

pub const MAX_INPUT_SIZE: usize = 16 * 1024;

/// Returns a UTF-8 view of `data` capped at `MAX_INPUT_SIZE`, or `None` when it is not UTF-8.
///
/// Up to 3 trailing bytes are dropped to recover from cutting a multibyte codepoint.
pub fn truncate_utf8(data: &[u8]) -> Option<&str> {
    let cap = data.len().min(MAX_INPUT_SIZE);
    (0..=3.min(cap)).find_map(|trim| str::from_utf8(&data[..cap - trim]).ok())
}
