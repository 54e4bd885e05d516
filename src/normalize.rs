//! Label normalization: lower-case, trim, collapse internal whitespace.
//!
//! Applied identically to element labels and transcripts (spec: "the same
//! function is applied to element labels and to transcripts; no other
//! normalization is performed in v1").

/// Normalize a string for matching: lower-case, trim, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for c in lowered.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_trims_and_collapses() {
        assert_eq!(normalize("  Submit   Now  "), "submit now");
        assert_eq!(normalize("Delete Account"), "delete account");
    }

    #[test]
    fn idempotent() {
        let cases = ["  Hello   World  ", "already lower", "", "   ", "A\tB\nC"];
        for c in cases {
            let once = normalize(c);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize should be idempotent for {c:?}");
        }
    }

    #[test]
    fn no_op_on_clean_lowercase_input() {
        let clean = "already clean input";
        assert_eq!(normalize(clean), clean);
    }
}
