//! Flat storage for the dual variables of a seminorm
//!
//! Every atom owns one contiguous segment of a single `Array1`. Per-atom
//! operations borrow their segment as a view, and the solvers only ever see
//! the flat buffer.

use std::ops::Range;

use ndarray::prelude::*;

use crate::shape::Shape;

/// Position of one atom's dual variable inside the flat buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub len: usize,
    pub shape: Shape,
}

impl Segment {
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Ordered segments, one per atom
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DualLayout {
    segments: Vec<Segment>,
    total_len: usize,
}

impl DualLayout {
    /// Lay out `shapes` back to back, in order.
    pub fn from_shapes<I>(shapes: I) -> DualLayout
    where
        I: IntoIterator<Item = Shape>,
    {
        let mut offset = 0;
        let segments: Vec<Segment> = shapes
            .into_iter()
            .map(|shape| {
                let len = shape.size();
                let seg = Segment { offset, len, shape };
                offset += len;
                seg
            })
            .collect();
        DualLayout {
            segments,
            total_len: offset,
        }
    }

    /// Length of the flat buffer
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// View of segment `i` of `buf`
    pub fn segment<'a>(&self, buf: ArrayView1<'a, f64>, i: usize) -> ArrayView1<'a, f64> {
        debug_assert_eq!(buf.len(), self.total_len);
        buf.slice_move(s![self.segments[i].range()])
    }

    /// Mutable view of segment `i` of `buf`
    pub fn segment_mut<'a>(&self, buf: ArrayViewMut1<'a, f64>, i: usize) -> ArrayViewMut1<'a, f64> {
        debug_assert_eq!(buf.len(), self.total_len);
        buf.slice_move(s![self.segments[i].range()])
    }

    /// All segments of `buf`, in order
    pub fn split<'a>(&self, buf: ArrayView1<'a, f64>) -> Vec<ArrayView1<'a, f64>> {
        (0..self.segments.len())
            .map(|i| self.segment(buf, i))
            .collect()
    }

    /// Concatenate one piece per segment into a flat buffer.
    ///
    /// # Panics
    /// if the number of pieces or any piece length disagrees with the layout
    pub fn pack(&self, pieces: &[Array1<f64>]) -> Array1<f64> {
        assert_eq!(pieces.len(), self.segments.len(), "one piece per segment");
        let mut buf = Array1::zeros(self.total_len);
        for (i, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.len(), self.segments[i].len, "piece {} has wrong length", i);
            self.segment_mut(buf.view_mut(), i).assign(piece);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> DualLayout {
        DualLayout::from_shapes(vec![Shape::from(2), Shape::from((2, 3)), Shape::from(1)])
    }

    #[test]
    fn offsets_are_cumulative() {
        let l = layout();
        assert_eq!(l.len(), 3);
        assert_eq!(l.total_len(), 9);
        let offsets: Vec<_> = l.segments().iter().map(|s| (s.offset, s.len)).collect();
        assert_eq!(offsets, vec![(0, 2), (2, 6), (8, 1)]);
        assert_eq!(l.segments()[1].shape, Shape::from((2, 3)));
    }

    #[test]
    fn pack_then_segment() {
        let l = layout();
        let pieces = vec![array![1., 2.], Array1::from(vec![3.; 6]), array![4.]];
        let buf = l.pack(&pieces);
        assert_eq!(buf.len(), 9);
        for (i, piece) in pieces.iter().enumerate() {
            assert_eq!(l.segment(buf.view(), i), piece.view());
        }
        assert_eq!(l.split(buf.view()).len(), 3);
    }

    #[test]
    fn segment_mut_writes_in_place() {
        let l = layout();
        let mut buf = Array1::zeros(l.total_len());
        l.segment_mut(buf.view_mut(), 2).fill(7.);
        assert_eq!(buf[8], 7.);
        assert_eq!(buf.sum(), 7.);
    }

    #[test]
    fn empty_layout() {
        let l = DualLayout::from_shapes(Vec::new());
        assert!(l.is_empty());
        assert_eq!(l.total_len(), 0);
        assert_eq!(l.pack(&[]).len(), 0);
    }

    #[test]
    #[should_panic]
    fn pack_rejects_wrong_piece() {
        layout().pack(&[array![1.], array![2.], array![3.]]);
    }
}
