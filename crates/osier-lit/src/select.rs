use crate::error::LitError;
use crate::Lit;

/// Selects a nested element by a dotted path. A numeric segment indexes
/// (negative counts from the end), any other segment is a key lookup. A
/// segment that starts like an index but is not one is a malformed path.
pub fn select(l: &Lit, path: &str) -> Result<Lit, LitError> {
    let mut cur = l.clone();
    for seg in path.split('.') {
        if seg.is_empty() {
            continue;
        }
        cur = if seg.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            let idx: i64 = seg
                .parse()
                .map_err(|_| LitError::BadPath(seg.into()))?;
            cur.idx(idx)?.clone()
        } else {
            cur.key(seg)?.clone()
        };
    }
    Ok(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dict, Keyed, List};

    fn sample() -> Lit {
        Lit::Dict(Dict::any(vec![
            Keyed::new(
                "a",
                Lit::List(List::any(vec![Lit::Num(1.0), Lit::Num(2.0)])),
            ),
            Keyed::new("b", Lit::Str("hi".into())),
        ]))
    }

    #[test]
    fn key_and_index_paths() {
        assert_eq!(select(&sample(), "b").unwrap(), Lit::Str("hi".into()));
        assert_eq!(select(&sample(), "a.0").unwrap(), Lit::Num(1.0));
        assert_eq!(select(&sample(), "a.-1").unwrap(), Lit::Num(2.0));
    }

    #[test]
    fn empty_segments_are_skipped() {
        assert_eq!(select(&sample(), "").unwrap(), sample());
        assert_eq!(select(&sample(), ".b").unwrap(), Lit::Str("hi".into()));
    }

    #[test]
    fn missing_paths_error() {
        assert!(select(&sample(), "c").is_err());
        assert!(select(&sample(), "a.5").is_err());
        assert!(select(&sample(), "b.x").is_err());
    }

    #[test]
    fn malformed_segments_error() {
        assert!(matches!(
            select(&sample(), "a.1x"),
            Err(LitError::BadPath(_))
        ));
        assert!(matches!(select(&sample(), "a.-"), Err(LitError::BadPath(_))));
    }
}
