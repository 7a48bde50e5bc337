//! Keyset pagination mode detection.
//!
//! Only the mode arithmetic lives here: given where the previous page
//! started and where the caller now wants to be, decide whether the
//! stored keyset reference can be used and in which direction. Emitting
//! keyset predicates into the query is the host layer's business.

/// How a page request relates to the previously fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysetMode {
    /// The same page is requested again; the keyset bounds both ends.
    Same,
    /// The page immediately after the reference page.
    Next,
    /// The page immediately before the reference page.
    Previous,
    /// The keyset is unusable; fall back to offset pagination.
    None,
}

/// A stored keyset reference: the page it belongs to and its validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeysetReference {
    /// First row index of the page the keyset was extracted from.
    pub first_result: usize,
    /// Page size the keyset was extracted with.
    pub page_size: usize,
}

impl KeysetMode {
    /// Determine the keyset mode for a new page request.
    ///
    /// A reference extracted with a different page size never applies;
    /// any non-adjacent jump falls back to [`KeysetMode::None`].
    pub fn determine(
        reference: Option<KeysetReference>,
        first_result: usize,
        page_size: usize,
    ) -> Self {
        let Some(reference) = reference else {
            return Self::None;
        };
        if reference.page_size != page_size {
            return Self::None;
        }
        if first_result == reference.first_result {
            Self::Same
        } else if first_result == reference.first_result + page_size {
            Self::Next
        } else if reference.first_result >= page_size
            && first_result == reference.first_result - page_size
        {
            Self::Previous
        } else {
            Self::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(first_result: usize, page_size: usize) -> Option<KeysetReference> {
        Some(KeysetReference {
            first_result,
            page_size,
        })
    }

    #[test]
    fn test_same_page() {
        assert_eq!(
            KeysetMode::determine(reference(20, 10), 20, 10),
            KeysetMode::Same
        );
    }

    #[test]
    fn test_next_page() {
        assert_eq!(
            KeysetMode::determine(reference(20, 10), 30, 10),
            KeysetMode::Next
        );
    }

    #[test]
    fn test_previous_page() {
        assert_eq!(
            KeysetMode::determine(reference(20, 10), 10, 10),
            KeysetMode::Previous
        );
    }

    #[test]
    fn test_jump_falls_back() {
        assert_eq!(
            KeysetMode::determine(reference(20, 10), 50, 10),
            KeysetMode::None
        );
    }

    #[test]
    fn test_page_size_change_falls_back() {
        assert_eq!(
            KeysetMode::determine(reference(20, 10), 30, 20),
            KeysetMode::None
        );
    }

    #[test]
    fn test_missing_reference_falls_back() {
        assert_eq!(KeysetMode::determine(None, 0, 10), KeysetMode::None);
    }

    #[test]
    fn test_previous_from_first_page() {
        // There is no page before the first; must not underflow.
        assert_eq!(
            KeysetMode::determine(reference(0, 10), 0, 10),
            KeysetMode::Same
        );
    }
}
