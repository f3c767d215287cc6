/// Short document code for the `index`-th input: A..Z, AA..ZZ, AAA, ...
///
/// Bijective base-26, so every index maps to exactly one code.
pub fn doc_id(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(doc_id(0), "A");
        assert_eq!(doc_id(25), "Z");
        assert_eq!(doc_id(26), "AA");
        assert_eq!(doc_id(27), "AB");
        assert_eq!(doc_id(701), "ZZ");
        assert_eq!(doc_id(702), "AAA");
    }

    #[test]
    fn codes_are_injective() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..20_000 {
            let id = doc_id(i);
            assert!(id.bytes().all(|b| b.is_ascii_uppercase()));
            assert!(seen.insert(id));
        }
    }
}
