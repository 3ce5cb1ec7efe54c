//! Apply and Split — one-in/one-out and one-in/two-out combinators.

use log::debug;

use super::channel::Stream;
use super::slice::Slice;
use super::spawn_task;

/// Transform every slice of `source` in place and forward it.
///
/// Order and slice lengths are preserved. The output closes when the
/// source closes; a fault from upstream is forwarded and ends the task.
pub fn apply<F>(source: Stream, mut transform: F) -> Stream
where
    F: FnMut(&mut Slice) + Send + 'static,
{
    let (tx, out) = Stream::channel();
    spawn_task("apply", move || {
        for packet in source {
            let packet = packet.map(|mut slice| {
                transform(&mut slice);
                slice
            });
            let fault = packet.is_err();
            if tx.forward(packet).is_err() {
                debug!("apply stopped: consumer dropped");
                return;
            }
            if fault {
                return;
            }
        }
    });
    out
}

/// Fork `source` into two streams.
///
/// Each slice goes to `a` first, then a duplicate goes to `b`; the task
/// blocks on each handoff in turn, so neither branch skips or reorders
/// data. When one branch's consumer is dropped the other keeps being fed.
pub fn split(source: Stream) -> (Stream, Stream) {
    let (tx_a, a) = Stream::channel();
    let (tx_b, b) = Stream::channel();
    spawn_task("split", move || {
        let mut a_open = true;
        let mut b_open = true;
        for packet in source {
            let copy = match &packet {
                Ok(slice) => Ok(slice.duplicate()),
                Err(err) => Err(err.clone()),
            };
            let fault = packet.is_err();
            if a_open && tx_a.forward(packet).is_err() {
                a_open = false;
            }
            if b_open && tx_b.forward(copy).is_err() {
                b_open = false;
            }
            if fault || (!a_open && !b_open) {
                break;
            }
        }
        debug!("split finished (a open: {a_open}, b open: {b_open})");
    });
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use std::thread;

    fn ramp(count: usize, len: usize) -> Vec<Slice> {
        (0..count)
            .map(|i| Slice::from_vec((0..len).map(|j| (i * len + j) as f64).collect()))
            .collect()
    }

    #[test]
    fn apply_preserves_shape_and_order() {
        let input = vec![
            Slice::from_vec(vec![1.0, 2.0]),
            Slice::from_vec(vec![3.0, 4.0, 5.0, 6.0]),
            Slice::from_vec(vec![]),
            Slice::from_vec(vec![7.0; 6]),
        ];
        let out = apply(Stream::from_slices(input.clone()), |s| {
            for v in s.iter_mut() {
                *v *= 10.0;
            }
        })
        .collect_slices()
        .unwrap();

        assert_eq!(out.len(), input.len());
        for (o, i) in out.iter().zip(&input) {
            assert_eq!(o.len(), i.len());
            for (a, b) in o.iter().zip(i.iter()) {
                assert_eq!(*a, *b * 10.0);
            }
        }
    }

    #[test]
    fn apply_forwards_faults() {
        let (tx, source) = Stream::channel();
        thread::spawn(move || {
            tx.send(Slice::new(2)).unwrap();
            tx.fail(StreamError::Task("upstream".into())).unwrap();
        });
        let mut out = apply(source, |_| {});
        assert!(out.next_slice().unwrap().is_some());
        assert_eq!(out.next_slice(), Err(StreamError::Task("upstream".into())));
    }

    #[test]
    fn split_delivers_everything_to_both_branches() {
        let input = ramp(6, 4);
        let (a, b) = split(Stream::from_slices(input.clone()));
        let reader = thread::spawn(move || b.collect_slices().unwrap());
        let from_a = a.collect_slices().unwrap();
        let from_b = reader.join().unwrap();
        assert_eq!(from_a, input);
        assert_eq!(from_b, input);
    }

    #[test]
    fn split_branches_are_independent() {
        let input = ramp(5, 8);
        let (a, b) = split(Stream::from_slices(input.clone()));
        // Mutate everything that arrives on `b`.
        let b = apply(b, |s| {
            for v in s.iter_mut() {
                *v = -999.0;
            }
        });
        let reader = thread::spawn(move || b.collect_slices().unwrap());
        let from_a = a.collect_slices().unwrap();
        let from_b = reader.join().unwrap();
        assert_eq!(from_a, input);
        assert!(from_b.iter().all(|s| s.iter().all(|&v| v == -999.0)));
    }

    #[test]
    fn split_keeps_feeding_when_one_branch_is_dropped() {
        let input = ramp(4, 2);
        let (a, b) = split(Stream::from_slices(input.clone()));
        drop(a);
        assert_eq!(b.collect_slices().unwrap(), input);
    }

    #[test]
    fn closing_propagates_through_chains() {
        let (tx, source) = Stream::channel();
        let (a, b) = split(apply(source, |_| {}));
        let a = apply(a, |_| {});
        let reader = thread::spawn(move || b.count());
        drop(tx);
        assert_eq!(a.count(), 0);
        assert_eq!(reader.join().unwrap(), 0);
    }
}
