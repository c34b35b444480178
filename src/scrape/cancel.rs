//! Advisory stop signal shared between the caller and a running scrape.
//!
//! The orchestrator only checks it between categories, so a category that is
//! already underway always finishes.

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_signal() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }
}
