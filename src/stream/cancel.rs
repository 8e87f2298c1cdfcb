use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};


/// shared flag handed to every queued group; a seek cancels the whole generation
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let token = CancellationToken::new();
        let unit = token.clone();

        assert!(!unit.is_cancelled());
        token.cancel();
        assert!(unit.is_cancelled());
        assert!(!CancellationToken::new().is_cancelled());
    }
}
