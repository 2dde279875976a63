// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Bounded channel
//!
//! The `channel` module provides [`BoundedChannel`], the fixed-capacity FIFO buffer behind
//! every in port. It never overwrites: enqueueing into a full channel and dequeueing from an
//! empty one are errors.
//!

use crate::Error;

use std::collections::VecDeque;

/// Fixed-capacity FIFO ring buffer.
///
/// The capacity is chosen at construction and never changes. Occupancy is tracked exactly, so
/// `available() == capacity()` means full and `available() == 0` means empty without any
/// ambiguity between the two states.
///
/// # Examples
///
/// ```
/// use actor::BoundedChannel;
///
/// let mut channel = BoundedChannel::new(2);
/// channel.enqueue(1).unwrap();
/// channel.enqueue(2).unwrap();
/// assert!(channel.enqueue(3).is_err());
/// assert_eq!(channel.dequeue().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct BoundedChannel<T> {
    capacity: usize,
    buffer: VecDeque<T>,
}

impl<T> BoundedChannel<T> {
    /// Creates an empty channel holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `value` at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelFull`] when the channel already holds `capacity` elements.
    /// The buffered elements are left untouched.
    pub fn enqueue(&mut self, value: T) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::ChannelFull);
        }
        self.buffer.push_back(value);
        Ok(())
    }

    /// Removes and returns the head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelEmpty`] when there is nothing to dequeue.
    pub fn dequeue(&mut self) -> Result<T, Error> {
        self.buffer.pop_front().ok_or(Error::ChannelEmpty)
    }

    /// Returns the head without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelEmpty`] when there is nothing to peek at.
    pub fn peek(&self) -> Result<&T, Error> {
        self.buffer.front().ok_or(Error::ChannelEmpty)
    }

    /// Number of buffered elements.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Number of free slots.
    pub fn free(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Maximum number of buffered elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut channel = BoundedChannel::new(4);
        for value in [7, 3, 9, 1] {
            channel.enqueue(value).unwrap();
        }
        let drained: Vec<i32> =
            (0..4).map(|_| channel.dequeue().unwrap()).collect();
        assert_eq!(drained, vec![7, 3, 9, 1]);
    }

    #[test]
    fn test_full_channel_rejects_and_keeps_contents() {
        let mut channel = BoundedChannel::new(3);
        for value in 0..3 {
            channel.enqueue(value).unwrap();
        }
        assert!(channel.is_full());
        assert_eq!(channel.enqueue(99), Err(Error::ChannelFull));
        assert_eq!(channel.available(), 3);
        assert_eq!(channel.dequeue(), Ok(0));
        assert_eq!(channel.dequeue(), Ok(1));
        assert_eq!(channel.dequeue(), Ok(2));
    }

    #[test]
    fn test_empty_channel() {
        let mut channel = BoundedChannel::<u8>::new(1);
        assert_eq!(channel.peek(), Err(Error::ChannelEmpty));
        assert_eq!(channel.dequeue(), Err(Error::ChannelEmpty));
        channel.enqueue(5).unwrap();
        assert_eq!(channel.peek(), Ok(&5));
        assert_eq!(channel.available(), 1);
        channel.dequeue().unwrap();
        assert_eq!(channel.dequeue(), Err(Error::ChannelEmpty));
    }

    #[test]
    fn test_wrap_around_keeps_order() {
        let mut channel = BoundedChannel::new(2);
        let mut read = Vec::new();
        for value in 0..10 {
            channel.enqueue(value).unwrap();
            if channel.is_full() {
                read.push(channel.dequeue().unwrap());
            }
        }
        while let Ok(value) = channel.dequeue() {
            read.push(value);
        }
        assert_eq!(read, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_capacity_is_always_full() {
        let mut channel = BoundedChannel::new(0);
        assert!(channel.is_full());
        assert_eq!(channel.enqueue(1), Err(Error::ChannelFull));
        assert_eq!(channel.free(), 0);
    }
}
