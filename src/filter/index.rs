//! Index generation for the triangle family of geometry nodes.
//!
//! All functions produce `IndexedFaceSet` style index lists, where every face is terminated by a
//! single `-1`. A `-1` in an input list always separates runs (strips or fans) and is never
//! taken as a vertex.

/// Splits an index list at its `-1` separators, skipping empty runs.
pub fn runs(index: &[i32]) -> impl Iterator<Item = &[i32]> {
    index.split(|&i| i == -1).filter(|r| !r.is_empty())
}

/// Every three consecutive indices become one face. A trailing partial triangle is ignored.
pub fn triangles_to_faces(index: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(index.len() / 3 * 4);
    for tri in index.chunks_exact(3) {
        out.extend_from_slice(tri);
        out.push(-1);
    }
    out
}

/// An `IndexedTriangleFanSet` index list is already a list of polygons, each fan being one
/// convex face. The list is passed through, with every fan terminated by exactly one `-1`.
pub fn indexed_fans_to_faces(index: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(index.len() + 1);
    for fan in runs(index) {
        out.extend_from_slice(fan);
        out.push(-1);
    }
    out
}

/// Triangulates every fan: a fan `c v1 v2 .. vn` gives the triangles `c v(i) v(i+1)`.
pub fn fans_to_faces(index: &[i32]) -> Vec<i32> {
    let mut out = vec![];
    for fan in runs(index) {
        for w in fan[1..].windows(2) {
            out.extend_from_slice(&[fan[0], w[0], w[1], -1]);
        }
    }
    out
}

/// Triangulates every strip. A strip of length `L` gives `L - 2` triangles; every odd triangle
/// has its second and third vertex swapped to keep the winding consistent.
pub fn strips_to_faces(index: &[i32]) -> Vec<i32> {
    let mut out = vec![];
    for strip in runs(index) {
        for (i, w) in strip.windows(3).enumerate() {
            if i % 2 == 0 {
                out.extend_from_slice(&[w[0], w[1], w[2], -1]);
            } else {
                out.extend_from_slice(&[w[0], w[2], w[1], -1]);
            }
        }
    }
    out
}

/// The implicit index list of a non-indexed node whose vertices are split into runs of the
/// given lengths (`fanCount`, `stripCount`): `[3, 4]` gives `0 1 2 -1 3 4 5 6 -1`.
/// Non-positive counts are skipped.
pub fn implicit_runs(counts: &[i32]) -> Vec<i32> {
    let mut out = vec![];
    let mut next = 0;
    for &n in counts.iter().filter(|&&n| n > 0) {
        out.extend(next..next + n);
        out.push(-1);
        next += n;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strip_winding_alternates() {
        assert_eq!(strips_to_faces(&[0, 1, 2, 3]), [0, 1, 2, -1, 1, 3, 2, -1]);
        assert_eq!(
            strips_to_faces(&[0, 1, 2, 3, 4, -1, 5, 6, 7]),
            [0, 1, 2, -1, 1, 3, 2, -1, 2, 3, 4, -1, 5, 6, 7, -1]
        );
        assert!(strips_to_faces(&[0, 1, -1]).is_empty());
    }

    #[test]
    fn triangles_and_fans() {
        assert_eq!(triangles_to_faces(&[0, 1, 2, 3, 4, 5, 6]), [0, 1, 2, -1, 3, 4, 5, -1]);
        assert_eq!(indexed_fans_to_faces(&[0, 1, 2, 3, -1, 4, 5, 6]), [0, 1, 2, 3, -1, 4, 5, 6, -1]);
        assert_eq!(indexed_fans_to_faces(&[-1, 0, 1, 2, -1, -1]), [0, 1, 2, -1]);
        assert_eq!(fans_to_faces(&[0, 1, 2, 3]), [0, 1, 2, -1, 0, 2, 3, -1]);
        assert_eq!(implicit_runs(&[3, 0, 4]), [0, 1, 2, -1, 3, 4, 5, 6, -1]);
    }

    fn run_lengths() -> impl Strategy<Value = Vec<i32>> {
        prop::collection::vec(3..12i32, 1..8)
    }

    proptest! {
        #[test]
        fn strip_triangle_count(counts in run_lengths()) {
            let faces = strips_to_faces(&implicit_runs(&counts));
            let expected: i32 = counts.iter().map(|n| n - 2).sum();
            prop_assert_eq!(faces.len() as i32, 4 * expected);
        }

        #[test]
        fn fan_index_count(counts in run_lengths()) {
            let n: i32 = counts.iter().sum();
            let f = counts.len() as i32;
            let faces = fans_to_faces(&implicit_runs(&counts));
            prop_assert_eq!(faces.len() as i32, 4 * (n - 2 * f));
        }

        #[test]
        fn every_face_is_terminated_once(counts in run_lengths()) {
            let index = implicit_runs(&counts);
            let flat: Vec<i32> = (0..counts.iter().sum()).collect();
            for out in [strips_to_faces(&index), fans_to_faces(&index), triangles_to_faces(&flat)] {
                for quad in out.chunks(4) {
                    prop_assert_eq!(quad.len(), 4);
                    prop_assert_eq!(quad[3], -1);
                    prop_assert!(quad[..3].iter().all(|&i| i >= 0));
                }
            }
        }
    }
}
