//! Exact k-nearest-neighbor primitives shared by every index strategy.

use rayon::prelude::*;

/// Squared L2 distance. The square root is never taken: every caller only
/// compares or ranks distances, and squaring is monotonic.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Positions of the `k` rows of `matrix` closest to `query`, in ascending
/// distance order. Ties break toward the lower position. `k` is clamped to
/// the number of rows; an empty matrix yields an empty result.
pub fn k_nearest(query: &[f32], matrix: &[Vec<f32>], k: usize) -> Vec<usize> {
    if matrix.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(f32, usize)> = matrix
        .par_iter()
        .enumerate()
        .map(|(i, row)| (squared_l2(query, row), i))
        .collect();

    let k = k.min(ranked.len());
    // NaN distances (possible only from NaN inputs) sort last via total_cmp.
    ranked.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    ranked.truncate(k);
    ranked.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn squared_l2_basic() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn nearest_orders_by_distance() {
        let matrix = vec![
            vec![10.0, 0.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
        ];
        assert_eq!(k_nearest(&[0.0, 0.0], &matrix, 3), vec![1, 2, 0]);
    }

    #[test]
    fn nearest_breaks_ties_by_position() {
        let matrix = vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
        ];
        // All three rows are equidistant from the origin.
        assert_eq!(k_nearest(&[0.0, 0.0], &matrix, 3), vec![0, 1, 2]);
    }

    #[test]
    fn k_is_clamped_to_matrix_size() {
        let matrix = vec![vec![1.0], vec![2.0]];
        assert_eq!(k_nearest(&[0.0], &matrix, 10), vec![0, 1]);
    }

    #[test]
    fn empty_matrix_yields_empty_result() {
        assert_eq!(k_nearest(&[0.0], &[], 5), Vec::<usize>::new());
    }

    #[test]
    fn results_are_deterministic_across_runs() {
        let matrix: Vec<Vec<f32>> = (0..50)
            .map(|i| vec![(i as f32 * 0.37).sin(), (i as f32 * 0.91).cos()])
            .collect();
        let first = k_nearest(&[0.2, -0.4], &matrix, 10);
        for _ in 0..5 {
            assert_eq!(k_nearest(&[0.2, -0.4], &matrix, 10), first);
        }
    }
}
