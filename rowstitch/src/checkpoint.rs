//! Buffer that only releases fragments confirmed by a checkpoint.
use std::{collections::VecDeque, mem};

use crate::fragment::Fragment;

/// Queue of fragments received since the last checkpoint.
///
/// Fragments are released in arrival order once a fragment carrying a resume
/// token arrives. If more than `max_queued` fragments pile up without one, they
/// are released anyway to bound memory, and the stream is no longer safe to
/// retry until the next checkpoint.
#[derive(Debug)]
pub struct CheckpointBuffer {
    queue: VecDeque<Fragment>,
    max_queued: usize,
    without_checkpoint: usize,
}

impl CheckpointBuffer {
    pub fn new(max_queued: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_queued.min(16)),
            max_queued,
            without_checkpoint: 0,
        }
    }

    /// Queue a fragment, returns fragments that are now released, in order.
    pub fn push(&mut self, fragment: Fragment) -> Vec<Fragment> {
        if fragment.is_checkpoint() {
            self.without_checkpoint = 0;
            let mut released = self.take();
            released.push(fragment);
            return released;
        }

        self.without_checkpoint += 1;
        self.queue.push_back(fragment);

        match self.queue.len() > self.max_queued {
            true => self.take(),
            false => vec![],
        }
    }

    /// Release every queued fragment regardless of checkpoint.
    pub fn flush(&mut self) -> Vec<Fragment> {
        self.take()
    }

    /// Discard every queued fragment.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.without_checkpoint = 0;
    }

    /// Number of fragments seen since the last checkpoint.
    pub fn without_checkpoint(&self) -> usize {
        self.without_checkpoint
    }

    /// Returns `true` if no unconfirmed fragment has been released since the
    /// last checkpoint.
    pub fn is_safe_to_retry(&self) -> bool {
        self.without_checkpoint <= self.max_queued
    }

    /// Number of fragments waiting for a checkpoint.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn take(&mut self) -> Vec<Fragment> {
        Vec::from(mem::take(&mut self.queue))
    }
}

#[cfg(test)]
mod test {
    use super::CheckpointBuffer;
    use crate::fragment::Fragment;

    fn frag(n: f64) -> Fragment {
        Fragment::new(vec![n.into()])
    }

    fn ids(fragments: &[Fragment]) -> Vec<f64> {
        fragments
            .iter()
            .map(|f| match f.values[0] {
                crate::Value::Number(n) => n,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn release_on_checkpoint() {
        let mut buf = CheckpointBuffer::new(10);
        assert!(buf.push(frag(1.0)).is_empty());
        assert!(buf.push(frag(2.0)).is_empty());
        assert_eq!(buf.without_checkpoint(), 2);

        let released = buf.push(frag(3.0).resume_token("t3"));
        assert_eq!(ids(&released), [1.0, 2.0, 3.0]);
        assert_eq!(buf.without_checkpoint(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn reset_discards_unconfirmed() {
        let mut buf = CheckpointBuffer::new(10);
        buf.push(frag(1.0).resume_token("t1"));
        buf.push(frag(2.0));
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.without_checkpoint(), 0);
        assert!(buf.flush().is_empty());
    }

    #[test]
    fn flush_releases_all() {
        let mut buf = CheckpointBuffer::new(10);
        buf.push(frag(1.0));
        buf.push(frag(2.0));
        assert_eq!(ids(&buf.flush()), [1.0, 2.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_releases_and_marks_unsafe() {
        let mut buf = CheckpointBuffer::new(2);
        assert!(buf.push(frag(1.0)).is_empty());
        assert!(buf.push(frag(2.0)).is_empty());
        assert!(buf.is_safe_to_retry());

        assert_eq!(ids(&buf.push(frag(3.0))), [1.0, 2.0, 3.0]);
        assert!(!buf.is_safe_to_retry());

        buf.push(frag(4.0).resume_token("t4"));
        assert!(buf.is_safe_to_retry());
    }
}
