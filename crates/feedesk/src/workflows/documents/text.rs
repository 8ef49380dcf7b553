/// Makes text printable with the standard PDF Latin-1 fonts: the rupee sign becomes `Rs.`
/// and anything outside Latin-1 becomes `?`.
pub fn pdf_safe(text: &str) -> String {
    let mut safe = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '₹' => safe.push_str("Rs."),
            ch if u32::from(ch) <= 0xFF => safe.push(ch),
            _ => safe.push('?'),
        }
    }
    safe
}

/// Single-byte encoding of text already passed through [`pdf_safe`].
pub(crate) fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}
