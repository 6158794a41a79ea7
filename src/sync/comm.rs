//! Point-to-point exchange and global reductions between partitions.

use crate::errors::{PlicError, Result};
use crate::float_types::Real;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Barrier, Mutex};

/// One buffer sent to a neighbouring partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Local positions within a processor patch
    pub labels: Vec<usize>,
    pub values: Vec<Real>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    fn apply(self, a: Real, b: Real) -> Real {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }
}

/// Blocking exchange primitive shared by all partitions of a run.
///
/// `exchange` sends every `(destination, message)` pair and returns one
/// message from each destination, in the same order: partitions only talk to
/// neighbours that talk back. Messages between a pair of partitions arrive in
/// the order they were sent.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn exchange(&self, outgoing: Vec<(usize, Message)>) -> Result<Vec<(usize, Message)>>;

    /// Reduction over all partitions. Every partition gets the same result.
    fn all_reduce(&self, value: Real, op: ReduceOp) -> Result<Real>;
}

/// Single-partition communicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(&self, outgoing: Vec<(usize, Message)>) -> Result<Vec<(usize, Message)>> {
        if let Some((dest, _)) = outgoing.iter().find(|(dest, _)| *dest != 0) {
            return Err(PlicError::Communication(format!(
                "serial run has no partition {dest}"
            )));
        }
        Ok(outgoing)
    }

    fn all_reduce(&self, value: Real, _op: ReduceOp) -> Result<Real> {
        Ok(value)
    }
}

/// In-process communicator: one instance per thread, connected by channels.
///
/// Reductions gather one slot per rank behind a barrier and combine them in
/// rank order, so every rank sees bit-identical results.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    senders: Vec<Sender<(usize, Message)>>,
    receiver: Receiver<(usize, Message)>,
    /// Messages that arrived from a source we were not waiting on yet
    pending: RefCell<Vec<VecDeque<Message>>>,
    barrier: Arc<Barrier>,
    slots: Arc<Mutex<Vec<Real>>>,
}

impl ThreadComm {
    /// Communicators for `size` ranks; hand element `r` to the thread
    /// running rank `r`.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        let barrier = Arc::new(Barrier::new(size.max(1)));
        let slots = Arc::new(Mutex::new(vec![0.0; size]));

        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ThreadComm {
                rank,
                size,
                senders: senders.clone(),
                receiver,
                pending: RefCell::new(vec![VecDeque::new(); size]),
                barrier: Arc::clone(&barrier),
                slots: Arc::clone(&slots),
            })
            .collect()
    }

    fn receive_from(&self, source: usize) -> Result<Message> {
        if let Some(msg) = self.pending.borrow_mut()[source].pop_front() {
            return Ok(msg);
        }
        loop {
            let (from, msg) = self.receiver.recv().map_err(|_| {
                PlicError::Communication(format!(
                    "rank {}: channel closed while waiting for rank {source}",
                    self.rank
                ))
            })?;
            if from == source {
                return Ok(msg);
            }
            self.pending.borrow_mut()[from].push_back(msg);
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&self, outgoing: Vec<(usize, Message)>) -> Result<Vec<(usize, Message)>> {
        let mut order = Vec::with_capacity(outgoing.len());
        for (dest, msg) in outgoing {
            let sender = self.senders.get(dest).ok_or_else(|| {
                PlicError::Communication(format!("no partition {dest} in a run of {}", self.size))
            })?;
            sender.send((self.rank, msg)).map_err(|_| {
                PlicError::Communication(format!("rank {}: rank {dest} hung up", self.rank))
            })?;
            order.push(dest);
        }
        order
            .into_iter()
            .map(|source| self.receive_from(source).map(|msg| (source, msg)))
            .collect()
    }

    fn all_reduce(&self, value: Real, op: ReduceOp) -> Result<Real> {
        {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots[self.rank] = value;
        }
        self.barrier.wait();
        let result = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .iter()
                .copied()
                .reduce(|a, b| op.apply(a, b))
                .unwrap_or(value)
        };
        // nobody may overwrite a slot before everyone has read
        self.barrier.wait();
        Ok(result)
    }
}
