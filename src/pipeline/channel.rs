//! Single-slot frame hand-off between capture and decode
//!
//! The slot holds at most one [`Frame`]. Depositing into an occupied slot fails
//! immediately and hands the frame back, so the producer always drops the newest
//! frame instead of blocking or evicting the one the consumer is about to take.

use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::types::Frame;

/// Result of offering a frame to the slot
#[derive(Debug)]
#[must_use = "rejected frames must be released by the caller"]
pub enum SendOutcome {
    /// Frame moved into the slot
    Delivered,

    /// Slot occupied; the frame comes back untouched
    RejectedFull(Frame),

    /// Consumer has shut down; no frames are accepted any more
    RejectedClosed(Frame),
}

/// Result of waiting on the slot
#[derive(Debug)]
pub enum RecvOutcome {
    Frame(Frame),

    /// Timeout elapsed with the slot empty
    TimedOut,

    /// Producer gone and slot empty
    Closed,
}

/// Create a connected sender/receiver pair sharing one slot
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (FrameSender { tx }, FrameReceiver { rx })
}

/// Producer half. Not `Clone`: there is exactly one depositor.
#[derive(Debug)]
pub struct FrameSender {
    tx: mpsc::Sender<Frame>,
}

impl FrameSender {
    /// Offer a frame without blocking
    pub fn try_send(&self, frame: Frame) -> SendOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => SendOutcome::Delivered,
            Err(TrySendError::Full(frame)) => SendOutcome::RejectedFull(frame),
            Err(TrySendError::Closed(frame)) => SendOutcome::RejectedClosed(frame),
        }
    }

    /// Whether the consumer has closed the slot
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<Frame>,
}

impl FrameReceiver {
    /// Wait for the next frame, up to `timeout` (`None` waits indefinitely).
    ///
    /// Cancel safe: dropping the future never loses a deposited frame.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> RecvOutcome {
        let next = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx.recv()).await {
                Ok(next) => next,
                Err(_) => return RecvOutcome::TimedOut,
            },
            None => self.rx.recv().await,
        };

        match next {
            Some(frame) => RecvOutcome::Frame(frame),
            None => RecvOutcome::Closed,
        }
    }

    /// Close the slot to further deposits and return anything still buffered
    pub fn close_and_drain(&mut self) -> Vec<Frame> {
        self.rx.close();
        let mut drained = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            drained.push(frame);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameFormat, PixelFormat};

    fn frame(seq: u64) -> Frame {
        Frame::new(vec![0u8; 4], FrameFormat::new(2, 2, PixelFormat::Grayscale), seq)
    }

    #[tokio::test]
    async fn deposit_into_occupied_slot_is_rejected() {
        let (tx, mut rx) = frame_channel();

        assert!(matches!(tx.try_send(frame(1)), SendOutcome::Delivered));
        match tx.try_send(frame(2)) {
            SendOutcome::RejectedFull(rejected) => assert_eq!(rejected.seq, 2),
            other => panic!("expected RejectedFull, got {other:?}"),
        }

        match rx.receive(None).await {
            RecvOutcome::Frame(received) => assert_eq!(received.seq, 1, "slot was overwritten"),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slot_frees_after_receive() {
        let (tx, mut rx) = frame_channel();

        for seq in 0..3 {
            assert!(matches!(tx.try_send(frame(seq)), SendOutcome::Delivered));
            assert!(matches!(rx.receive(None).await, RecvOutcome::Frame(f) if f.seq == seq));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn receive_times_out_on_empty_slot() {
        let (_tx, mut rx) = frame_channel();

        let start = tokio::time::Instant::now();
        assert!(matches!(rx.receive(Some(Duration::from_millis(50))).await, RecvOutcome::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn receive_reports_closed_when_producer_drops() {
        let (tx, mut rx) = frame_channel();
        drop(tx);
        assert!(matches!(rx.receive(None).await, RecvOutcome::Closed));
    }

    #[tokio::test]
    async fn close_and_drain_returns_buffered_frame_and_rejects_new_ones() {
        let (tx, mut rx) = frame_channel();
        assert!(matches!(tx.try_send(frame(7)), SendOutcome::Delivered));

        let drained = rx.close_and_drain();
        assert_eq!(drained.iter().map(|f| f.seq).collect::<Vec<_>>(), vec![7]);

        assert!(tx.is_closed());
        assert!(matches!(tx.try_send(frame(8)), SendOutcome::RejectedClosed(f) if f.seq == 8));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_deposits_never_exceed_one_in_flight() {
        let (tx, mut rx) = frame_channel();

        let producer = tokio::spawn(async move {
            let mut delivered = 0u64;
            let mut rejected = 0u64;
            for seq in 0..500 {
                match tx.try_send(frame(seq)) {
                    SendOutcome::Delivered => delivered += 1,
                    SendOutcome::RejectedFull(_) => rejected += 1,
                    SendOutcome::RejectedClosed(_) => unreachable!("receiver is alive"),
                }
                tokio::task::yield_now().await;
            }
            (delivered, rejected)
        });

        let mut received = Vec::new();
        while let RecvOutcome::Frame(f) = rx.receive(None).await {
            received.push(f.seq);
        }

        let (delivered, rejected) = producer.await.unwrap();
        assert_eq!(delivered + rejected, 500);
        assert_eq!(received.len() as u64, delivered);
        assert!(received.windows(2).all(|w| w[0] < w[1]), "frames arrived out of order");
    }

    mod ownership {
        use super::*;
        use crate::source::FrameSource;
        use crate::test_utils::MockSource;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Op {
            Acquire,
            Deposit,
            Receive,
            ReleaseReceived,
            CloseAndDrain,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Acquire),
                Just(Op::Deposit),
                Just(Op::Receive),
                Just(Op::ReleaseReceived),
                Just(Op::CloseAndDrain),
            ]
        }

        /// Drive one producer and one consumer through `ops`, releasing every frame
        /// the way the capture and decode loops do.
        async fn replay(ops: &[Op]) -> std::result::Result<(), TestCaseError> {
            let source = MockSource::new(FrameFormat::new(2, 2, PixelFormat::Grayscale));
            let (tx, mut rx) = frame_channel();
            let mut produced: Option<Frame> = None;
            let mut received: Option<Frame> = None;
            let mut slot: Option<u64> = None;

            for op in ops {
                match op {
                    Op::Acquire => {
                        if produced.is_none() {
                            let frame = source.acquire().await.map_err(|e| TestCaseError::fail(e.to_string()))?;
                            produced = Some(frame);
                        }
                    }
                    Op::Deposit => {
                        let Some(frame) = produced.take() else { continue };
                        let seq = frame.seq;
                        match tx.try_send(frame) {
                            SendOutcome::Delivered => {
                                prop_assert_eq!(slot, None, "deposit accepted into an occupied slot");
                                slot = Some(seq);
                            }
                            SendOutcome::RejectedFull(frame) => {
                                prop_assert!(slot.is_some_and(|held| held != seq));
                                source.release(frame);
                            }
                            SendOutcome::RejectedClosed(frame) => source.release(frame),
                        }
                    }
                    Op::Receive => match rx.receive(Some(Duration::ZERO)).await {
                        RecvOutcome::Frame(frame) => {
                            prop_assert_eq!(Some(frame.seq), slot.take(), "slot content changed");
                            if let Some(previous) = received.replace(frame) {
                                source.release(previous);
                            }
                        }
                        RecvOutcome::TimedOut | RecvOutcome::Closed => {
                            prop_assert_eq!(slot, None);
                        }
                    },
                    Op::ReleaseReceived => {
                        if let Some(frame) = received.take() {
                            source.release(frame);
                        }
                    }
                    Op::CloseAndDrain => {
                        let drained = rx.close_and_drain();
                        let seqs: Vec<u64> = drained.iter().map(|f| f.seq).collect();
                        prop_assert_eq!(seqs, slot.take().into_iter().collect::<Vec<_>>());
                        for frame in drained {
                            source.release(frame);
                        }
                    }
                }
            }

            for frame in produced.into_iter().chain(received).chain(rx.close_and_drain()) {
                source.release(frame);
            }

            let stats = source.stats();
            prop_assert_eq!(stats.invalid_releases, 0);
            prop_assert!(stats.is_balanced(), "unbalanced: {:?}", stats);
            Ok(())
        }

        proptest! {
            #[test]
            fn every_acquired_frame_is_released_once(ops in prop::collection::vec(op(), 0..64)) {
                let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
                runtime.block_on(replay(&ops))?;
            }
        }
    }
}
